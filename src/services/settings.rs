use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::{
    db::DbPool,
    entities::system_setting::{ActiveModel as SettingActiveModel, Entity as SettingEntity},
    errors::ServiceError,
};

/// Number of signature slots on exported request summaries.
pub const SIGNATURE_SLOTS: usize = 4;

/// Default signature labels, used until an admin configures their own.
pub const SIGNATURE_LABEL_DEFAULTS: [&str; SIGNATURE_SLOTS] =
    ["Requested by", "Approved by", "Verified by", "Received by"];

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignatureBlock {
    pub label: String,
    pub name: String,
}

/// Key/value settings store with upsert-by-key semantics.
#[derive(Clone)]
pub struct SettingsService {
    db: Arc<DbPool>,
}

impl SettingsService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, ServiceError> {
        Ok(SettingEntity::find_by_id(key)
            .one(&*self.db)
            .await?
            .map(|s| s.setting_value))
    }

    /// Like [`Self::get`] but falls back to `default` for missing or empty
    /// values.
    pub async fn get_or(&self, key: &str, default: &str) -> Result<String, ServiceError> {
        Ok(self
            .get(key)
            .await?
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| default.to_string()))
    }

    /// Inserts the key or overwrites its current value.
    #[instrument(skip(self, value), fields(key = %key))]
    pub async fn upsert(&self, key: &str, value: &str) -> Result<(), ServiceError> {
        match SettingEntity::find_by_id(key).one(&*self.db).await? {
            Some(existing) => {
                let mut active: SettingActiveModel = existing.into();
                active.setting_value = Set(value.to_string());
                active.update(&*self.db).await?;
            }
            None => {
                SettingActiveModel {
                    setting_key: Set(key.to_string()),
                    setting_value: Set(value.to_string()),
                }
                .insert(&*self.db)
                .await?;
            }
        }
        Ok(())
    }

    /// The four signature blocks rendered on request exports, with defaults
    /// applied for unconfigured labels.
    pub async fn signature_blocks(&self) -> Result<Vec<SignatureBlock>, ServiceError> {
        let mut blocks = Vec::with_capacity(SIGNATURE_SLOTS);
        for (slot, default_label) in SIGNATURE_LABEL_DEFAULTS.iter().enumerate() {
            let n = slot + 1;
            blocks.push(SignatureBlock {
                label: self
                    .get_or(&format!("signature_{n}_label"), default_label)
                    .await?,
                name: self.get_or(&format!("signature_{n}_name"), "").await?,
            });
        }
        Ok(blocks)
    }

    /// Persists all four signature blocks.
    #[instrument(skip(self, blocks))]
    pub async fn save_signatures(&self, blocks: &[SignatureBlock]) -> Result<(), ServiceError> {
        if blocks.len() != SIGNATURE_SLOTS {
            return Err(ServiceError::ValidationError(format!(
                "Exactly {SIGNATURE_SLOTS} signature blocks are required"
            )));
        }

        for (slot, block) in blocks.iter().enumerate() {
            let n = slot + 1;
            self.upsert(&format!("signature_{n}_label"), block.label.trim())
                .await?;
            self.upsert(&format!("signature_{n}_name"), block.name.trim())
                .await?;
        }

        info!("signature settings saved");

        Ok(())
    }
}
