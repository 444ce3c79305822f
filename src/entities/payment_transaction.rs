use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// Ledger status, stored as the canonical Indonesian strings the back office
/// reports with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, EnumString, Serialize, Deserialize)]
pub enum PaymentStatus {
    #[strum(serialize = "belum dibayar")]
    #[serde(rename = "belum dibayar")]
    Unpaid,
    #[strum(serialize = "belum lunas")]
    #[serde(rename = "belum lunas")]
    PartiallyPaid,
    #[strum(serialize = "lunas")]
    #[serde(rename = "lunas")]
    Paid,
}

impl PaymentStatus {
    /// Pure derivation from the (amount_paid, total_due) pair.
    ///
    /// Paid iff amount_paid >= total_due; partially paid iff strictly between
    /// zero and the total; unpaid iff nothing (or a negative amount) is paid.
    pub fn derive(amount_paid: Decimal, total_due: Decimal) -> Self {
        if amount_paid <= Decimal::ZERO {
            PaymentStatus::Unpaid
        } else if amount_paid < total_due {
            PaymentStatus::PartiallyPaid
        } else {
            PaymentStatus::Paid
        }
    }
}

/// Payment/installment ledger entry (pembayaran) mirroring a pick transaction.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,
    pub route_id: Uuid,
    pub paid_on: NaiveDate,
    pub total_due: Decimal,
    pub amount_paid: Decimal,
    /// Always recomputed as total_due - amount_paid, forced to zero when paid.
    pub shortfall: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn status(&self) -> PaymentStatus {
        PaymentStatus::from_str(&self.status).unwrap_or(PaymentStatus::Unpaid)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::route::Entity",
        from = "Column::RouteId",
        to = "super::route::Column::Id"
    )]
    Route,
    #[sea_orm(has_many = "super::payment_line_item::Entity")]
    LineItems,
}

impl Related<super::route::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Route.def()
    }
}

impl Related<super::payment_line_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LineItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use test_case::test_case;

    #[test_case(dec!(0), dec!(400), PaymentStatus::Unpaid; "nothing paid")]
    #[test_case(dec!(-10), dec!(400), PaymentStatus::Unpaid; "negative balance")]
    #[test_case(dec!(150), dec!(400), PaymentStatus::PartiallyPaid; "partial")]
    #[test_case(dec!(400), dec!(400), PaymentStatus::Paid; "exact")]
    #[test_case(dec!(450), dec!(400), PaymentStatus::Paid; "overpaid")]
    #[test_case(dec!(0), dec!(0), PaymentStatus::Unpaid; "zero total unpaid")]
    fn status_is_a_pure_function_of_the_pair(paid: Decimal, due: Decimal, expected: PaymentStatus) {
        assert_eq!(PaymentStatus::derive(paid, due), expected);
    }

    #[test]
    fn status_strings_round_trip() {
        for status in [
            PaymentStatus::Unpaid,
            PaymentStatus::PartiallyPaid,
            PaymentStatus::Paid,
        ] {
            assert_eq!(PaymentStatus::from_str(status.as_ref()).unwrap(), status);
        }
        assert_eq!(PaymentStatus::PartiallyPaid.to_string(), "belum lunas");
    }
}
