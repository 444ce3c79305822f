use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter as StrumEnumIter, EnumString};
use uuid::Uuid;

/// The fixed set of named price tiers a product may carry.
///
/// The canonical strings are the ones the back office has always used, so
/// they are kept verbatim in storage and API payloads.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumString, StrumEnumIter, Serialize, Deserialize,
)]
pub enum TierName {
    #[strum(serialize = "Harga pabrik")]
    #[serde(rename = "Harga pabrik")]
    Factory,
    #[strum(serialize = "Harga ke pasar")]
    #[serde(rename = "Harga ke pasar")]
    ToMarket,
    #[strum(serialize = "Harga di pasar")]
    #[serde(rename = "Harga di pasar")]
    AtMarket,
    #[strum(serialize = "Harga ke toko")]
    #[serde(rename = "Harga ke toko")]
    ToStore,
    #[strum(serialize = "Harga di toko")]
    #[serde(rename = "Harga di toko")]
    AtStore,
    #[strum(serialize = "Harga BS pasar")]
    #[serde(rename = "Harga BS pasar")]
    BelowStandardMarket,
    #[strum(serialize = "Harga BS toko")]
    #[serde(rename = "Harga BS toko")]
    BelowStandardStore,
    #[strum(serialize = "Harga Ecer")]
    #[serde(rename = "Harga Ecer")]
    Retail,
}

/// Upper bound on price tiers per product, one per `TierName`.
pub const MAX_TIERS_PER_PRODUCT: usize = 8;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "price_tiers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub product_id: Uuid,

    /// Canonical tier name string; see [`TierName`].
    pub tier: String,

    pub value: Decimal,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn tier_names_round_trip_their_canonical_strings() {
        for tier in TierName::iter() {
            let parsed = TierName::from_str(tier.as_ref()).unwrap();
            assert_eq!(parsed, tier);
        }
        assert_eq!(TierName::Retail.to_string(), "Harga Ecer");
    }

    #[test]
    fn tier_set_matches_the_per_product_cap() {
        assert_eq!(TierName::iter().count(), MAX_TIERS_PER_PRODUCT);
    }
}
