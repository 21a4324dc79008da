use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::{
    auth::ActorContext,
    errors::ServiceError,
    services::exports::{ExportFilter, ExportService},
    AppState,
};

/// Download the aggregated approved-items report as CSV (admin).
///
/// The body is BOM-prefixed UTF-8 so spreadsheet tools detect the encoding.
#[utoipa::path(
    get,
    path = "/api/v1/exports/approved-items",
    responses((status = 200, description = "CSV report", body = String, content_type = "text/csv")),
    tag = "exports"
)]
pub async fn export_approved_items(
    State(state): State<AppState>,
    actor: ActorContext,
    Query(filter): Query<ExportFilter>,
) -> Result<Response, ServiceError> {
    actor.require_admin()?;

    let rows = state.services.exports.approved_items_report(&filter).await?;
    let body = ExportService::to_csv(&rows)?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"approved_items.csv\"",
            ),
        ],
        body,
    )
        .into_response())
}
