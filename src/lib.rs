//! Requisition API Library
//!
//! Core functionality for the office purchase-requisition service: the bulk
//! request lifecycle, item catalog with CSV import, account/office directory,
//! and approved-spend reporting.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod services;

use axum::{extract::State, response::Json, routing::get, Router};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

// Common response wrapper
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
        }
    }

    pub fn validation_errors(errors: Vec<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some("Validation failed".to_string()),
            errors: Some(errors),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// All v1 routes. Role enforcement happens inside handlers against the
/// extracted actor context.
pub fn api_v1_routes() -> Router<AppState> {
    let requests = Router::new()
        .route(
            "/requests",
            get(handlers::requests::list_requests).post(handlers::requests::create_request),
        )
        .route(
            "/requests/:id",
            get(handlers::requests::get_request).delete(handlers::requests::delete_request),
        )
        .route("/requests/:id/items", get(handlers::requests::get_request_items))
        .route(
            "/requests/:id/status",
            axum::routing::put(handlers::requests::update_request_status),
        )
        .route(
            "/requests/:id/summary",
            get(handlers::requests::get_request_summary),
        );

    let catalog = Router::new()
        .route(
            "/items",
            get(handlers::items::list_items).post(handlers::items::create_item),
        )
        .route("/items/active", get(handlers::items::list_active_items))
        .route(
            "/items/unit-types/defaults",
            get(handlers::items::default_unit_types),
        )
        .route(
            "/items/:id",
            axum::routing::put(handlers::items::update_item).delete(handlers::items::delete_item),
        )
        .route("/items/:id/unit-types", get(handlers::items::get_unit_types))
        .route("/categories", get(handlers::items::list_categories));

    let import = Router::new()
        .route(
            "/items/import/preview",
            axum::routing::post(handlers::imports::preview_import),
        )
        .route("/items/import", axum::routing::post(handlers::imports::run_import));

    let accounts = Router::new()
        .route(
            "/offices",
            get(handlers::accounts::list_offices).post(handlers::accounts::create_office),
        )
        .route(
            "/users",
            get(handlers::accounts::list_users).post(handlers::accounts::create_user),
        )
        .route(
            "/users/:id",
            axum::routing::delete(handlers::accounts::delete_user),
        )
        .route(
            "/users/:id/password",
            axum::routing::put(handlers::accounts::change_password),
        );

    let exports = Router::new().route(
        "/exports/approved-items",
        get(handlers::exports::export_approved_items),
    );

    let settings = Router::new().route(
        "/settings/signatures",
        get(handlers::settings::get_signatures).put(handlers::settings::save_signatures),
    );

    Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .merge(requests)
        .merge(catalog)
        .merge(import)
        .merge(accounts)
        .merge(exports)
        .merge(settings)
}

async fn api_status() -> Json<ApiResponse<Value>> {
    let status_data = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "requisition-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Json(ApiResponse::success(status_data))
}

async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<Value>> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Json(ApiResponse::success(health_data))
}
