use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::ActorContext,
    errors::ServiceError,
    handlers::common::validate_input,
    services::catalog::{
        CategoryResponse, ItemInput, ItemListResponse, ItemResponse, DEFAULT_UNIT_TYPES,
    },
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ItemListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    pub search: Option<String>,
}

fn default_page() -> u64 {
    1
}

/// Paginated catalog listing with usage aggregates (admin).
#[utoipa::path(
    get,
    path = "/api/v1/items",
    responses((status = 200, description = "Catalog page", body = ItemListResponse)),
    tag = "items"
)]
pub async fn list_items(
    State(state): State<AppState>,
    actor: ActorContext,
    Query(query): Query<ItemListQuery>,
) -> ApiResult<ItemListResponse> {
    actor.require_admin()?;
    let page = state.services.catalog.list_items(query.page, query.search).await?;
    Ok(Json(ApiResponse::success(page)))
}

/// Add a catalog item (admin).
#[utoipa::path(
    post,
    path = "/api/v1/items",
    request_body = ItemInput,
    responses(
        (status = 201, description = "Item created", body = ItemResponse),
        (status = 409, description = "Item name already exists"),
    ),
    tag = "items"
)]
pub async fn create_item(
    State(state): State<AppState>,
    actor: ActorContext,
    Json(input): Json<ItemInput>,
) -> Result<(StatusCode, Json<ApiResponse<ItemResponse>>), ServiceError> {
    actor.require_admin()?;
    validate_input(&input)?;
    let item = state.services.catalog.create_item(input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(item))))
}

/// Update a catalog item (admin).
#[utoipa::path(
    put,
    path = "/api/v1/items/{id}",
    request_body = ItemInput,
    responses((status = 200, description = "Item updated", body = ItemResponse)),
    tag = "items"
)]
pub async fn update_item(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(id): Path<Uuid>,
    Json(input): Json<ItemInput>,
) -> ApiResult<ItemResponse> {
    actor.require_admin()?;
    validate_input(&input)?;
    let item = state.services.catalog.update_item(id, input).await?;
    Ok(Json(ApiResponse::success(item)))
}

/// Delete a catalog item unless requests still reference it (admin).
#[utoipa::path(
    delete,
    path = "/api/v1/items/{id}",
    responses(
        (status = 200, description = "Item deleted"),
        (status = 409, description = "Item referenced by requests"),
    ),
    tag = "items"
)]
pub async fn delete_item(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(id): Path<Uuid>,
) -> ApiResult<&'static str> {
    actor.require_admin()?;
    state.services.catalog.delete_item(id).await?;
    Ok(Json(ApiResponse::success("Item deleted successfully")))
}

/// Active catalog items for the request composer.
#[utoipa::path(
    get,
    path = "/api/v1/items/active",
    responses((status = 200, description = "Active items", body = [ItemResponse])),
    tag = "items"
)]
pub async fn list_active_items(
    State(state): State<AppState>,
    _actor: ActorContext,
) -> ApiResult<Vec<ItemResponse>> {
    let items = state.services.catalog.list_active_items().await?;
    Ok(Json(ApiResponse::success(items)))
}

/// Unit types configured for one item, plus the suggested vocabulary.
#[utoipa::path(
    get,
    path = "/api/v1/items/{id}/unit-types",
    responses((status = 200, description = "Unit types", body = [String])),
    tag = "items"
)]
pub async fn get_unit_types(
    State(state): State<AppState>,
    _actor: ActorContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<String>> {
    let unit_types = state.services.catalog.get_unit_types(id).await?;
    Ok(Json(ApiResponse::success(unit_types)))
}

/// The default unit-type vocabulary offered by the composer UI.
#[utoipa::path(
    get,
    path = "/api/v1/items/unit-types/defaults",
    responses((status = 200, description = "Suggested unit types", body = [String])),
    tag = "items"
)]
pub async fn default_unit_types(_actor: ActorContext) -> ApiResult<Vec<String>> {
    Ok(Json(ApiResponse::success(
        DEFAULT_UNIT_TYPES.iter().map(|u| u.to_string()).collect(),
    )))
}

/// Active item categories.
#[utoipa::path(
    get,
    path = "/api/v1/categories",
    responses((status = 200, description = "Categories", body = [CategoryResponse])),
    tag = "items"
)]
pub async fn list_categories(
    State(state): State<AppState>,
    _actor: ActorContext,
) -> ApiResult<Vec<CategoryResponse>> {
    let categories = state.services.catalog.list_categories().await?;
    Ok(Json(ApiResponse::success(categories)))
}
