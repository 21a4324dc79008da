use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    /// JSON-encoded ordered list of unit-type strings. Decode with
    /// [`Model::unit_type_list`]; business logic only ever sees `Vec<String>`.
    pub unit_types: String,
    pub price: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// Decodes the stored unit-type list. Corrupt or legacy values decode to
    /// an empty list rather than failing the read.
    pub fn unit_type_list(&self) -> Vec<String> {
        serde_json::from_str(&self.unit_types).unwrap_or_default()
    }
}

/// Encodes a unit-type list for storage.
pub fn encode_unit_types(unit_types: &[String]) -> String {
    serde_json::to_string(unit_types).unwrap_or_else(|_| "[]".to_string())
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::item_category::Entity",
        from = "Column::CategoryId",
        to = "super::item_category::Column::Id"
    )]
    Category,
    #[sea_orm(has_many = "super::request_item::Entity")]
    RequestItems,
}

impl Related<super::item_category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::request_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RequestItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
