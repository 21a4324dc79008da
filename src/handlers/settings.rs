use axum::{extract::State, response::Json};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    auth::ActorContext,
    services::settings::SignatureBlock,
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct SaveSignaturesBody {
    pub signatures: Vec<SignatureBlock>,
}

/// The signature blocks rendered on request exports (admin).
#[utoipa::path(
    get,
    path = "/api/v1/settings/signatures",
    responses((status = 200, description = "Signature blocks", body = [SignatureBlock])),
    tag = "settings"
)]
pub async fn get_signatures(
    State(state): State<AppState>,
    actor: ActorContext,
) -> ApiResult<Vec<SignatureBlock>> {
    actor.require_admin()?;
    let blocks = state.services.settings.signature_blocks().await?;
    Ok(Json(ApiResponse::success(blocks)))
}

/// Replace all four signature blocks (admin).
#[utoipa::path(
    put,
    path = "/api/v1/settings/signatures",
    request_body = SaveSignaturesBody,
    responses((status = 200, description = "Settings saved")),
    tag = "settings"
)]
pub async fn save_signatures(
    State(state): State<AppState>,
    actor: ActorContext,
    Json(body): Json<SaveSignaturesBody>,
) -> ApiResult<&'static str> {
    actor.require_admin()?;
    state.services.settings.save_signatures(&body.signatures).await?;
    Ok(Json(ApiResponse::success("Settings saved successfully!")))
}
