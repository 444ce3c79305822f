use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Mirror of one pick line inside the payment ledger; fully regenerated
/// whenever the source pick transaction is edited.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_line_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub payment_id: Uuid,
    pub pick_line_item_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::payment_transaction::Entity",
        from = "Column::PaymentId",
        to = "super::payment_transaction::Column::Id"
    )]
    PaymentTransaction,
    #[sea_orm(
        belongs_to = "super::pick_line_item::Entity",
        from = "Column::PickLineItemId",
        to = "super::pick_line_item::Column::Id"
    )]
    PickLineItem,
}

impl Related<super::payment_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentTransaction.def()
    }
}

impl Related<super::pick_line_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PickLineItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
