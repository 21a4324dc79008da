use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{
        item::{self, ActiveModel as ItemActiveModel, Entity as ItemEntity},
        item_category::{self, ActiveModel as CategoryActiveModel, Entity as CategoryEntity},
    },
    errors::ServiceError,
};

/// Maximum accepted upload size.
pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

/// Accepted upload extensions.
pub const ALLOWED_EXTENSIONS: &[&str] = &["csv", "txt"];

/// Required header row, compared case-insensitively after trimming.
pub const EXPECTED_HEADERS: [&str; 5] = ["item_name", "description", "category", "unit_types", "price"];

/// One parsed, not-yet-persisted catalog row from an uploaded CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CsvItem {
    pub item_name: String,
    pub description: String,
    pub category: String,
    pub unit_types: Vec<String>,
    pub price: Decimal,
}

/// Preview result: parsed rows plus per-row errors. Both can be non-empty at
/// once — a bad row never aborts the rest of the file.
#[derive(Debug, Serialize, ToSchema)]
pub struct ParseOutcome {
    pub items: Vec<CsvItem>,
    pub errors: Vec<String>,
}

/// Batch import result. Success is reported as counts, not a single flag.
#[derive(Debug, Serialize, ToSchema)]
pub struct ImportOutcome {
    pub imported: u32,
    pub skipped: u32,
    pub errors: Vec<String>,
}

/// Checks the upload itself before any row is looked at. Returns
/// human-readable problems; an empty list means the file is acceptable.
pub fn validate_upload(file_name: &str, size: u64) -> Vec<String> {
    let mut errors = Vec::new();

    if file_name.trim().is_empty() {
        errors.push("No file uploaded".to_string());
        return errors;
    }

    if size > MAX_UPLOAD_BYTES {
        errors.push("File size exceeds 5MB limit".to_string());
    }

    let extension = file_name
        .rsplit('.')
        .next()
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        errors.push("Invalid file type. Only CSV files are allowed".to_string());
    }

    errors
}

/// Parses CSV bytes into preview rows.
///
/// A header mismatch aborts with a single error and zero items. Data rows are
/// numbered from 1; blank rows consume a row number but are skipped silently.
/// A row missing its name or unit types gets a row-numbered error and is
/// skipped while parsing continues.
pub fn parse_items(bytes: &[u8]) -> ParseOutcome {
    let mut items = Vec::new();
    let mut errors = Vec::new();

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut records = reader.records();

    let header_ok = match records.next() {
        Some(Ok(header)) => {
            header.len() == EXPECTED_HEADERS.len()
                && header
                    .iter()
                    .zip(EXPECTED_HEADERS.iter())
                    .all(|(got, want)| got.trim().eq_ignore_ascii_case(want))
        }
        _ => false,
    };
    if !header_ok {
        errors.push(format!(
            "Invalid CSV format. Expected headers: {}",
            EXPECTED_HEADERS.join(", ")
        ));
        return ParseOutcome { items, errors };
    }

    let mut row = 0u32;
    for record in records {
        row += 1;

        let record = match record {
            Ok(record) => record,
            Err(e) => {
                errors.push(format!("Row {row}: {e}"));
                continue;
            }
        };

        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }

        let field = |idx: usize| record.get(idx).unwrap_or("").trim().to_string();

        let item_name = field(0);
        if item_name.is_empty() {
            errors.push(format!("Row {row}: Item name is required"));
            continue;
        }

        let unit_types_raw = field(3);
        if unit_types_raw.is_empty() {
            errors.push(format!("Row {row}: Unit types are required"));
            continue;
        }
        let unit_types: Vec<String> = unit_types_raw
            .split(',')
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .collect();
        if unit_types.is_empty() {
            errors.push(format!("Row {row}: At least one unit type is required"));
            continue;
        }

        // Lenient price handling: absent or unparseable values become zero;
        // only an explicit negative rejects the row.
        let price = Decimal::from_str(&field(4)).unwrap_or(Decimal::ZERO);
        if price < Decimal::ZERO {
            errors.push(format!("Row {row}: Price cannot be negative"));
            continue;
        }

        items.push(CsvItem {
            item_name,
            description: field(1),
            category: field(2),
            unit_types,
            price,
        });
    }

    ParseOutcome { items, errors }
}

/// Merges parsed CSV rows into the catalog.
#[derive(Clone)]
pub struct ImportService {
    db: Arc<DbPool>,
}

impl ImportService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Best-effort batch import. Categories are resolved by exact name and
    /// created on first sight; rows whose name already exists in the catalog
    /// are counted as skipped without touching the stored item. One row's
    /// failure is recorded and never stops the rest of the batch.
    #[instrument(skip(self, items), fields(batch = items.len()))]
    pub async fn import(&self, items: Vec<CsvItem>) -> Result<ImportOutcome, ServiceError> {
        let mut imported = 0u32;
        let mut skipped = 0u32;
        let mut errors = Vec::new();

        for entry in items {
            match self.import_one(&entry).await {
                Ok(true) => imported += 1,
                Ok(false) => skipped += 1,
                Err(e) => errors.push(format!("Error importing {}: {e}", entry.item_name)),
            }
        }

        info!(imported, skipped, error_count = errors.len(), "CSV import finished");

        Ok(ImportOutcome {
            imported,
            skipped,
            errors,
        })
    }

    /// Returns Ok(true) when inserted, Ok(false) when skipped as a duplicate.
    async fn import_one(&self, entry: &CsvItem) -> Result<bool, ServiceError> {
        let category_id = if entry.category.is_empty() {
            None
        } else {
            Some(self.resolve_category(&entry.category).await?)
        };

        let existing = ItemEntity::find()
            .filter(item::Column::Name.eq(entry.item_name.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Ok(false);
        }

        let now = Utc::now();
        ItemActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(entry.item_name.clone()),
            description: Set(Some(entry.description.clone()).filter(|d| !d.is_empty())),
            category_id: Set(category_id),
            unit_types: Set(item::encode_unit_types(&entry.unit_types)),
            price: Set(entry.price),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        Ok(true)
    }

    async fn resolve_category(&self, name: &str) -> Result<Uuid, ServiceError> {
        let existing = CategoryEntity::find()
            .filter(item_category::Column::Name.eq(name))
            .one(&*self.db)
            .await?;
        if let Some(category) = existing {
            return Ok(category.id);
        }

        let created = CategoryActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            is_active: Set(true),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?;

        info!(category_id = %created.id, name = %name, "category auto-created during import");

        Ok(created.id)
    }
}
