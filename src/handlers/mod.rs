pub mod accounts;
pub mod common;
pub mod exports;
pub mod imports;
pub mod items;
pub mod requests;
pub mod settings;

use std::sync::Arc;

use crate::auth::PasswordGate;
use crate::db::DbPool;
use crate::services::{
    catalog::CatalogService, directory::DirectoryService, exports::ExportService,
    imports::ImportService, requests::RequestService, settings::SettingsService,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub requests: Arc<RequestService>,
    pub catalog: Arc<CatalogService>,
    pub directory: Arc<DirectoryService>,
    pub imports: Arc<ImportService>,
    pub exports: Arc<ExportService>,
    pub settings: Arc<SettingsService>,
}

impl AppServices {
    /// Wires every service against the shared pool, with one password gate
    /// instance backing all re-authenticated operations.
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        let gate = PasswordGate::new(db_pool.clone());
        let settings = SettingsService::new(db_pool.clone());

        Self {
            requests: Arc::new(RequestService::new(db_pool.clone(), gate.clone())),
            catalog: Arc::new(CatalogService::new(db_pool.clone())),
            directory: Arc::new(DirectoryService::new(db_pool.clone(), gate)),
            imports: Arc::new(ImportService::new(db_pool.clone())),
            exports: Arc::new(ExportService::new(db_pool, settings.clone())),
            settings: Arc::new(settings),
        }
    }
}
