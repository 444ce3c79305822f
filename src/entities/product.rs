use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[validate(length(min = 1, max = 30, message = "Product name must be between 1 and 30 characters"))]
    pub name: String,

    pub photo_url: String,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::price_tier::Entity")]
    PriceTiers,
    #[sea_orm(has_one = "super::stock_record::Entity")]
    StockRecord,
}

impl Related<super::price_tier::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PriceTiers.def()
    }
}

impl Related<super::stock_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockRecord.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
