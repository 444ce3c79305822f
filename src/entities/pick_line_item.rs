use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One product line of a pick transaction.
///
/// `unit_price` is snapshotted when the line is created or edited; later
/// catalog changes never touch existing lines.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pick_line_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub transaction_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::pick_transaction::Entity",
        from = "Column::TransactionId",
        to = "super::pick_transaction::Column::Id"
    )]
    PickTransaction,
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    #[sea_orm(has_many = "super::payment_line_item::Entity")]
    PaymentLineItems,
}

impl Related<super::pick_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PickTransaction.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::payment_line_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentLineItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
