//! Shared harness for integration tests: a fresh SQLite database migrated by
//! the embedded migrator, with the full service stack wired against it.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use uuid::Uuid;

use requisition_api::{
    auth::{password, ActorContext},
    db::{self, DbConfig, DbPool},
    entities::{item, office, user, Role},
    handlers::AppServices,
};

pub struct TestCtx {
    pub db: Arc<DbPool>,
    pub services: AppServices,
    _tmp: tempfile::TempDir,
}

impl TestCtx {
    /// Builds an isolated application stack on a throwaway database file.
    pub async fn new() -> Self {
        let tmp = tempfile::tempdir().expect("temp dir");
        let db_path = tmp.path().join("requisition_test.db");

        let cfg = DbConfig {
            url: format!("sqlite://{}?mode=rwc", db_path.display()),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            acquire_timeout: Duration::from_secs(5),
        };

        let pool = db::establish_connection_with_config(&cfg)
            .await
            .expect("test database connection");
        db::run_migrations(&pool).await.expect("migrations");

        let db = Arc::new(pool);
        Self {
            services: AppServices::new(db.clone()),
            db,
            _tmp: tmp,
        }
    }

    pub async fn seed_office(&self, name: &str) -> Uuid {
        let model = office::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await
        .expect("seed office");
        model.id
    }

    pub async fn seed_admin(&self, username: &str, plaintext: &str) -> ActorContext {
        let model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(username.to_string()),
            email: Set(format!("{username}@example.test")),
            password_hash: Set(password::hash_password(plaintext).expect("hash")),
            full_name: Set("System Administrator".to_string()),
            office_id: Set(None),
            role_id: Set(Role::Admin),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await
        .expect("seed admin");
        ActorContext::admin(model.id)
    }

    pub async fn seed_office_head(
        &self,
        office_id: Uuid,
        username: &str,
        plaintext: &str,
    ) -> ActorContext {
        let model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(username.to_string()),
            email: Set(format!("{username}@example.test")),
            password_hash: Set(password::hash_password(plaintext).expect("hash")),
            full_name: Set(format!("Head {username}")),
            office_id: Set(Some(office_id)),
            role_id: Set(Role::OfficeHead),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await
        .expect("seed office head");
        ActorContext::office_head(model.id, office_id)
    }

    pub async fn seed_item(&self, name: &str, price: Decimal) -> Uuid {
        let now = Utc::now();
        let model = item::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            description: Set(None),
            category_id: Set(None),
            unit_types: Set(item::encode_unit_types(&["pcs".into(), "boxes".into()])),
            price: Set(price),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .expect("seed item");
        model.id
    }
}
