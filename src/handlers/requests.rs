use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::ActorContext,
    entities::RequestStatus,
    errors::ServiceError,
    services::exports::RequestSummaryReport,
    services::requests::{
        LineItemDraft, RequestDetails, RequestFilter, RequestLineItem, RequestListResponse,
    },
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
#[schema(example = json!({
    "items": [
        {"item_id": "550e8400-e29b-41d4-a716-446655440000", "unit_type": "reams", "quantity": 5, "price_per_unit": "250.00"},
        {"custom_name": "Desk nameplate", "unit_type": "pcs", "quantity": 2, "price_per_unit": "150.00"}
    ]
}))]
pub struct CreateRequestBody {
    pub items: Vec<LineItemDraft>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedRequest {
    pub id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusBody {
    pub status: RequestStatus,
    /// The acting admin's own password, re-confirmed for this mutation.
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PasswordConfirmBody {
    /// The acting user's own password, re-confirmed for this mutation.
    pub password: String,
}

/// Submit a new bulk request for the actor's office.
#[utoipa::path(
    post,
    path = "/api/v1/requests",
    request_body = CreateRequestBody,
    responses(
        (status = 201, description = "Request created"),
        (status = 400, description = "No valid line items supplied"),
    ),
    tag = "requests"
)]
pub async fn create_request(
    State(state): State<AppState>,
    actor: ActorContext,
    Json(body): Json<CreateRequestBody>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedRequest>>), ServiceError> {
    let id = state.services.requests.create_request(&actor, body.items).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreatedRequest { id })),
    ))
}

/// List requests with filters plus summary counts under the same filter.
#[utoipa::path(
    get,
    path = "/api/v1/requests",
    responses((status = 200, description = "Filtered requests with summary", body = RequestListResponse)),
    tag = "requests"
)]
pub async fn list_requests(
    State(state): State<AppState>,
    actor: ActorContext,
    Query(filter): Query<RequestFilter>,
) -> ApiResult<RequestListResponse> {
    let response = state.services.requests.list_requests(&actor, filter).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Fetch one request with requester and office context.
#[utoipa::path(
    get,
    path = "/api/v1/requests/{id}",
    responses(
        (status = 200, description = "Request details", body = RequestDetails),
        (status = 404, description = "Unknown or out-of-scope request"),
    ),
    tag = "requests"
)]
pub async fn get_request(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(id): Path<Uuid>,
) -> ApiResult<RequestDetails> {
    let details = state.services.requests.get_request(&actor, id).await?;
    Ok(Json(ApiResponse::success(details)))
}

/// List a request's line items with resolved display names.
#[utoipa::path(
    get,
    path = "/api/v1/requests/{id}/items",
    responses((status = 200, description = "Line items", body = [RequestLineItem])),
    tag = "requests"
)]
pub async fn get_request_items(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<RequestLineItem>> {
    let items = state.services.requests.list_request_items(&actor, id).await?;
    Ok(Json(ApiResponse::success(items)))
}

/// Move a request to a new status (admin, password-confirmed).
#[utoipa::path(
    put,
    path = "/api/v1/requests/{id}/status",
    request_body = UpdateStatusBody,
    responses(
        (status = 200, description = "Status updated"),
        (status = 401, description = "Password confirmation failed"),
    ),
    tag = "requests"
)]
pub async fn update_request_status(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateStatusBody>,
) -> ApiResult<&'static str> {
    state
        .services
        .requests
        .update_status(&actor, id, body.status, &body.password)
        .await?;
    Ok(Json(ApiResponse::success("Request status updated successfully")))
}

/// Delete a request and its line items (password-confirmed).
#[utoipa::path(
    delete,
    path = "/api/v1/requests/{id}",
    request_body = PasswordConfirmBody,
    responses(
        (status = 200, description = "Request deleted"),
        (status = 401, description = "Password confirmation failed"),
        (status = 404, description = "Unknown or out-of-scope request"),
    ),
    tag = "requests"
)]
pub async fn delete_request(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(id): Path<Uuid>,
    Json(body): Json<PasswordConfirmBody>,
) -> ApiResult<&'static str> {
    state
        .services
        .requests
        .delete_request(&actor, id, &body.password)
        .await?;
    Ok(Json(ApiResponse::success("Request deleted successfully")))
}

/// Printable request breakdown with signature footer.
#[utoipa::path(
    get,
    path = "/api/v1/requests/{id}/summary",
    responses((status = 200, description = "Request summary", body = RequestSummaryReport)),
    tag = "requests"
)]
pub async fn get_request_summary(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(id): Path<Uuid>,
) -> ApiResult<RequestSummaryReport> {
    let report = state.services.exports.request_summary(&actor, id).await?;
    Ok(Json(ApiResponse::success(report)))
}
