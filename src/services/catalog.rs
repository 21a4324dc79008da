use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::{
        item::{self, ActiveModel as ItemActiveModel, Entity as ItemEntity},
        item_category::{self, Entity as CategoryEntity},
        request,
        request_item::{self, Entity as RequestItemEntity},
        RequestStatus,
    },
    errors::ServiceError,
};

/// Suggested unit-type vocabulary offered by the composer UI. Purely a
/// convenience — any free-text unit type is accepted alongside these.
pub const DEFAULT_UNIT_TYPES: &[&str] = &[
    "units", "reams", "pcs", "boxes", "packs", "sets", "dozens", "kg", "liters", "meters", "rolls",
    "bottles", "can", "gallons",
];

/// Fixed page size for the catalog listing.
pub const ITEMS_PER_PAGE: u64 = 15;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ItemInput {
    #[validate(length(min = 1, max = 100, message = "Item name is required"))]
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    #[validate(length(min = 1, message = "At least one unit type is required"))]
    pub unit_types: Vec<String>,
    pub price: Decimal,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ItemResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub unit_types: Vec<String>,
    pub price: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Catalog row enriched with usage aggregates. The aggregates are derived
/// from current request state on every read; nothing here is stored.
#[derive(Debug, Serialize, ToSchema)]
pub struct ItemWithUsage {
    #[serde(flatten)]
    pub item: ItemResponse,
    pub request_count: u64,
    pub offices_used: u64,
    pub approved_quantity: i64,
    pub pending_quantity: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ItemListResponse {
    pub items: Vec<ItemWithUsage>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
}

/// Item catalog: categories, unit types and pricing, plus usage aggregates.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DbPool>,
}

impl CatalogService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    fn validate_input(input: &ItemInput) -> Result<Vec<String>, ServiceError> {
        if input.name.trim().is_empty() {
            return Err(ServiceError::ValidationError("Item name is required".into()));
        }
        let unit_types: Vec<String> = input
            .unit_types
            .iter()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .collect();
        if unit_types.is_empty() {
            return Err(ServiceError::ValidationError(
                "At least one unit type is required".into(),
            ));
        }
        if input.price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Price cannot be negative".into(),
            ));
        }
        Ok(unit_types)
    }

    /// Adds a catalog item. Exact-match duplicate names are rejected.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_item(&self, input: ItemInput) -> Result<ItemResponse, ServiceError> {
        let unit_types = Self::validate_input(&input)?;
        let name = input.name.trim().to_string();

        let existing = ItemEntity::find()
            .filter(item::Column::Name.eq(name.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Duplicate("Item with this name".into()));
        }

        let now = Utc::now();
        let model = ItemActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            description: Set(input.description.filter(|d| !d.trim().is_empty())),
            category_id: Set(input.category_id),
            unit_types: Set(item::encode_unit_types(&unit_types)),
            price: Set(input.price),
            is_active: Set(input.is_active),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        info!(item_id = %model.id, "catalog item created");

        self.to_response(model).await
    }

    /// Updates an existing item; `updated_at` is bumped on every edit.
    #[instrument(skip(self, input), fields(item_id = %item_id))]
    pub async fn update_item(
        &self,
        item_id: Uuid,
        input: ItemInput,
    ) -> Result<ItemResponse, ServiceError> {
        let unit_types = Self::validate_input(&input)?;

        let existing = ItemEntity::find_by_id(item_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Item not found".into()))?;

        let mut active: ItemActiveModel = existing.into();
        active.name = Set(input.name.trim().to_string());
        active.description = Set(input.description.filter(|d| !d.trim().is_empty()));
        active.category_id = Set(input.category_id);
        active.unit_types = Set(item::encode_unit_types(&unit_types));
        active.price = Set(input.price);
        active.is_active = Set(input.is_active);
        active.updated_at = Set(Utc::now());

        let model = active.update(&*self.db).await?;

        info!(item_id = %item_id, "catalog item updated");

        self.to_response(model).await
    }

    /// Hard-deletes an item unless any request line still references it, in
    /// which case the blocking count is reported. The count check is the
    /// friendly fast path; the RESTRICT foreign key is the actual guard.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn delete_item(&self, item_id: Uuid) -> Result<(), ServiceError> {
        ItemEntity::find_by_id(item_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Item not found".into()))?;

        let references = RequestItemEntity::find()
            .filter(request_item::Column::ItemId.eq(item_id))
            .count(&*self.db)
            .await?;

        if references > 0 {
            return Err(ServiceError::ReferencedByOthers {
                entity: "item".into(),
                referrer: "request(s)".into(),
                count: references,
            });
        }

        ItemEntity::delete_by_id(item_id).exec(&*self.db).await?;

        info!(item_id = %item_id, "catalog item deleted");

        Ok(())
    }

    /// Paginated catalog listing with an optional case-insensitive name
    /// search. Every row carries freshly computed usage aggregates.
    #[instrument(skip(self))]
    pub async fn list_items(
        &self,
        page: u64,
        search: Option<String>,
    ) -> Result<ItemListResponse, ServiceError> {
        let mut cond = Condition::all();
        if let Some(term) = search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            cond = cond.add(
                Expr::expr(Func::lower(Expr::col((item::Entity, item::Column::Name))))
                    .like(format!("%{}%", term.to_lowercase())),
            );
        }

        let paginator = ItemEntity::find()
            .filter(cond)
            .order_by_asc(item::Column::Name)
            .paginate(&*self.db, ITEMS_PER_PAGE);

        let total = paginator.num_items().await?;
        let total_pages = paginator.num_pages().await?.max(1);
        let page = page.clamp(1, total_pages);
        let models = paginator.fetch_page(page - 1).await?;

        let category_names = self.category_names(&models).await?;
        let usage = self.usage_for(&models).await?;

        let items = models
            .into_iter()
            .map(|m| {
                let stats = usage.get(&m.id).cloned().unwrap_or_default();
                ItemWithUsage {
                    item: response_from(m, &category_names),
                    request_count: stats.request_ids.len() as u64,
                    offices_used: stats.office_ids.len() as u64,
                    approved_quantity: stats.approved_quantity,
                    pending_quantity: stats.pending_quantity,
                }
            })
            .collect();

        Ok(ItemListResponse {
            items,
            total,
            page,
            per_page: ITEMS_PER_PAGE,
            total_pages,
        })
    }

    /// Active items for the request composer, ordered by category then name.
    #[instrument(skip(self))]
    pub async fn list_active_items(&self) -> Result<Vec<ItemResponse>, ServiceError> {
        let models = ItemEntity::find()
            .filter(item::Column::IsActive.eq(true))
            .all(&*self.db)
            .await?;

        let category_names = self.category_names(&models).await?;

        let mut items: Vec<ItemResponse> = models
            .into_iter()
            .map(|m| response_from(m, &category_names))
            .collect();
        items.sort_by(|a, b| {
            (a.category_name.as_deref().unwrap_or(""), &a.name)
                .cmp(&(b.category_name.as_deref().unwrap_or(""), &b.name))
        });

        Ok(items)
    }

    /// The unit-type list configured for one item.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn get_unit_types(&self, item_id: Uuid) -> Result<Vec<String>, ServiceError> {
        let item = ItemEntity::find_by_id(item_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Item not found".into()))?;
        Ok(item.unit_type_list())
    }

    /// Active categories ordered by name.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<CategoryResponse>, ServiceError> {
        let categories = CategoryEntity::find()
            .filter(item_category::Column::IsActive.eq(true))
            .order_by_asc(item_category::Column::Name)
            .all(&*self.db)
            .await?;

        Ok(categories
            .into_iter()
            .map(|c| CategoryResponse {
                id: c.id,
                name: c.name,
            })
            .collect())
    }

    async fn to_response(&self, model: item::Model) -> Result<ItemResponse, ServiceError> {
        let category_names = self.category_names(std::slice::from_ref(&model)).await?;
        Ok(response_from(model, &category_names))
    }

    async fn category_names(
        &self,
        models: &[item::Model],
    ) -> Result<HashMap<Uuid, String>, ServiceError> {
        let ids: Vec<Uuid> = models.iter().filter_map(|m| m.category_id).collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        Ok(CategoryEntity::find()
            .filter(item_category::Column::Id.is_in(ids))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect())
    }

    async fn usage_for(
        &self,
        models: &[item::Model],
    ) -> Result<HashMap<Uuid, ItemUsage>, ServiceError> {
        let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let lines = RequestItemEntity::find()
            .filter(request_item::Column::ItemId.is_in(ids))
            .find_also_related(request::Entity)
            .all(&*self.db)
            .await?;

        let mut usage: HashMap<Uuid, ItemUsage> = HashMap::new();
        for (line, parent) in lines {
            let Some(item_id) = line.item_id else {
                continue;
            };
            let Some(parent) = parent else {
                continue;
            };
            let stats = usage.entry(item_id).or_default();
            stats.request_ids.insert(parent.id);
            stats.office_ids.insert(parent.office_id);
            match parent.status {
                RequestStatus::Approved => stats.approved_quantity += i64::from(line.quantity),
                RequestStatus::Pending => stats.pending_quantity += i64::from(line.quantity),
                RequestStatus::Rejected => {}
            }
        }

        Ok(usage)
    }
}

#[derive(Debug, Clone, Default)]
struct ItemUsage {
    request_ids: HashSet<Uuid>,
    office_ids: HashSet<Uuid>,
    approved_quantity: i64,
    pending_quantity: i64,
}

fn response_from(model: item::Model, category_names: &HashMap<Uuid, String>) -> ItemResponse {
    let unit_types = model.unit_type_list();
    ItemResponse {
        category_name: model
            .category_id
            .and_then(|id| category_names.get(&id).cloned()),
        id: model.id,
        name: model.name,
        description: model.description,
        category_id: model.category_id,
        unit_types,
        price: model.price,
        is_active: model.is_active,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}
