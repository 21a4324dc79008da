use axum::{
    extract::{Path, State},
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
    services::directory::{CreateUserInput, OfficeResponse, UserResponse},
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOfficeBody {
    pub name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DeleteUserBody {
    /// The acting admin's own password, re-confirmed for this mutation.
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangePasswordBody {
    pub new_password: String,
    pub confirm_password: String,
    /// The acting admin's own password, re-confirmed for this mutation.
    pub password: String,
}

/// All offices (admin).
#[utoipa::path(
    get,
    path = "/api/v1/offices",
    responses((status = 200, description = "Offices", body = [OfficeResponse])),
    tag = "accounts"
)]
pub async fn list_offices(
    State(state): State<AppState>,
    actor: ActorContext,
) -> ApiResult<Vec<OfficeResponse>> {
    actor.require_admin()?;
    let offices = state.services.directory.list_offices().await?;
    Ok(Json(ApiResponse::success(offices)))
}

/// Create an office (admin).
#[utoipa::path(
    post,
    path = "/api/v1/offices",
    request_body = CreateOfficeBody,
    responses(
        (status = 201, description = "Office created", body = OfficeResponse),
        (status = 409, description = "Office already exists"),
    ),
    tag = "accounts"
)]
pub async fn create_office(
    State(state): State<AppState>,
    actor: ActorContext,
    Json(body): Json<CreateOfficeBody>,
) -> Result<(StatusCode, Json<ApiResponse<OfficeResponse>>), ServiceError> {
    actor.require_admin()?;
    let office = state.services.directory.create_office(&body.name).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(office))))
}

/// All user accounts with office names and request counts (admin).
#[utoipa::path(
    get,
    path = "/api/v1/users",
    responses((status = 200, description = "Users", body = [UserResponse])),
    tag = "accounts"
)]
pub async fn list_users(
    State(state): State<AppState>,
    actor: ActorContext,
) -> ApiResult<Vec<UserResponse>> {
    actor.require_admin()?;
    let users = state.services.directory.list_users().await?;
    Ok(Json(ApiResponse::success(users)))
}

/// Create an office-head account (admin).
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserInput,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 409, description = "Username or email already exists"),
    ),
    tag = "accounts"
)]
pub async fn create_user(
    State(state): State<AppState>,
    actor: ActorContext,
    Json(input): Json<CreateUserInput>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ServiceError> {
    actor.require_admin()?;
    validate_input(&input)?;
    let user = state.services.directory.create_user(input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

/// Delete a user account (admin, password-confirmed).
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    request_body = DeleteUserBody,
    responses(
        (status = 200, description = "User deleted"),
        (status = 401, description = "Password confirmation failed"),
        (status = 409, description = "User still owns requests"),
    ),
    tag = "accounts"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(id): Path<Uuid>,
    Json(body): Json<DeleteUserBody>,
) -> ApiResult<&'static str> {
    actor.require_admin()?;
    state
        .services
        .directory
        .delete_user(&actor, id, &body.password)
        .await?;
    Ok(Json(ApiResponse::success("User account deleted successfully")))
}

/// Change a user's password (admin, password-confirmed).
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}/password",
    request_body = ChangePasswordBody,
    responses(
        (status = 200, description = "Password changed"),
        (status = 401, description = "Password confirmation failed"),
    ),
    tag = "accounts"
)]
pub async fn change_password(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(id): Path<Uuid>,
    Json(body): Json<ChangePasswordBody>,
) -> ApiResult<&'static str> {
    actor.require_admin()?;
    state
        .services
        .directory
        .change_password(
            &actor,
            id,
            &body.new_password,
            &body.confirm_password,
            &body.password,
        )
        .await?;
    Ok(Json(ApiResponse::success("Password changed successfully")))
}
