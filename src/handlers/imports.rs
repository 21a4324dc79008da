use axum::{
    extract::{Multipart, State},
    response::Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    auth::ActorContext,
    errors::ServiceError,
    services::imports::{self, CsvItem, ImportOutcome, ParseOutcome},
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct RunImportBody {
    pub items: Vec<CsvItem>,
}

/// Parse an uploaded CSV into a preview without persisting anything (admin).
///
/// File-level validation failures abort before any row is read; row-level
/// problems come back beside the successfully parsed rows.
#[utoipa::path(
    post,
    path = "/api/v1/items/import/preview",
    request_body(content = String, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Parsed preview with per-row errors", body = ParseOutcome),
        (status = 400, description = "Upload rejected before parsing"),
    ),
    tag = "import"
)]
pub async fn preview_import(
    State(_state): State<AppState>,
    actor: ActorContext,
    mut multipart: Multipart,
) -> ApiResult<ParseOutcome> {
    actor.require_admin()?;

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::ValidationError(format!("Invalid upload: {e}")))?
    {
        if field.name() == Some("file") {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ServiceError::ValidationError(format!("Invalid upload: {e}")))?;
            upload = Some((file_name, bytes.to_vec()));
        }
    }

    let (file_name, bytes) =
        upload.ok_or_else(|| ServiceError::ValidationError("No file uploaded".into()))?;

    let validation_errors = imports::validate_upload(&file_name, bytes.len() as u64);
    if !validation_errors.is_empty() {
        return Err(ServiceError::ValidationError(validation_errors.join("; ")));
    }

    Ok(Json(ApiResponse::success(imports::parse_items(&bytes))))
}

/// Persist previously previewed rows into the catalog (admin).
#[utoipa::path(
    post,
    path = "/api/v1/items/import",
    request_body = RunImportBody,
    responses((status = 200, description = "Import counts", body = ImportOutcome)),
    tag = "import"
)]
pub async fn run_import(
    State(state): State<AppState>,
    actor: ActorContext,
    Json(body): Json<RunImportBody>,
) -> ApiResult<ImportOutcome> {
    actor.require_admin()?;
    let outcome = state.services.imports.import(body.items).await?;
    Ok(Json(ApiResponse::success(outcome)))
}
