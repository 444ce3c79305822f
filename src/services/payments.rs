use crate::{
    db::DbPool,
    entities::{
        payment_line_item::Entity as PaymentLineItem,
        payment_transaction::{self, Entity as PaymentTransaction, PaymentStatus},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, EntityTrait, ModelTrait, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::stock::unwrap_transaction_error;

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentLineItemResponse {
    pub id: Uuid,
    pub pick_line_item_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub route_id: Uuid,
    pub paid_on: chrono::NaiveDate,
    pub total_due: Decimal,
    pub amount_paid: Decimal,
    pub shortfall: Decimal,
    pub status: String,
    pub items: Vec<PaymentLineItemResponse>,
}

/// Payment ledger service (pembayaran): settles the balances opened by pick
/// transactions.
#[derive(Clone)]
pub struct PaymentService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl PaymentService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Applies a signed adjustment to the amount paid and re-derives the
    /// status. Corrections (negative amounts) are allowed here; installments
    /// go through [`add_installment`](Self::add_installment).
    #[instrument(skip(self), fields(payment_id = %payment_id, amount = %amount))]
    pub async fn record_payment(
        &self,
        payment_id: Uuid,
        amount: Decimal,
    ) -> Result<PaymentResponse, ServiceError> {
        let db = &*self.db_pool;

        let response = db
            .transaction::<_, PaymentResponse, ServiceError>(move |txn| {
                Box::pin(async move {
                    let payment = find_payment(txn, payment_id).await?;
                    let amount_paid = payment.amount_paid + amount;
                    apply_balance(txn, payment, amount_paid).await
                })
            })
            .await
            .map_err(unwrap_transaction_error)?;

        info!(
            payment_id = %payment_id,
            amount_paid = %response.amount_paid,
            status = %response.status,
            "Payment recorded"
        );

        self.emit(Event::PaymentRecorded {
            payment_id,
            amount_paid: response.amount_paid,
            status: response.status.clone(),
        })
        .await;

        Ok(response)
    }

    /// Adds a positive installment (cicil). Overpayment is clamped to the
    /// total due, so the balance settles at exactly lunas.
    #[instrument(skip(self), fields(payment_id = %payment_id, amount = %amount))]
    pub async fn add_installment(
        &self,
        payment_id: Uuid,
        amount: Decimal,
    ) -> Result<PaymentResponse, ServiceError> {
        if amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "installment amount must be positive".to_string(),
            ));
        }

        let db = &*self.db_pool;

        let response = db
            .transaction::<_, PaymentResponse, ServiceError>(move |txn| {
                Box::pin(async move {
                    let payment = find_payment(txn, payment_id).await?;
                    let amount_paid = (payment.amount_paid + amount).min(payment.total_due);
                    apply_balance(txn, payment, amount_paid).await
                })
            })
            .await
            .map_err(unwrap_transaction_error)?;

        info!(
            payment_id = %payment_id,
            amount_paid = %response.amount_paid,
            status = %response.status,
            "Installment added"
        );

        self.emit(Event::PaymentRecorded {
            payment_id,
            amount_paid: response.amount_paid,
            status: response.status.clone(),
        })
        .await;

        Ok(response)
    }

    /// Settles the outstanding balance in one step (pelunasan). A payment
    /// with nothing left to pay is rejected.
    #[instrument(skip(self), fields(payment_id = %payment_id))]
    pub async fn pay_in_full(&self, payment_id: Uuid) -> Result<PaymentResponse, ServiceError> {
        let db = &*self.db_pool;

        let response = db
            .transaction::<_, PaymentResponse, ServiceError>(move |txn| {
                Box::pin(async move {
                    let payment = find_payment(txn, payment_id).await?;

                    let remaining = payment.total_due - payment.amount_paid;
                    if remaining <= Decimal::ZERO {
                        return Err(ServiceError::AlreadyPaid(payment_id));
                    }

                    let total_due = payment.total_due;
                    apply_balance(txn, payment, total_due).await
                })
            })
            .await
            .map_err(unwrap_transaction_error)?;

        info!(payment_id = %payment_id, "Payment settled in full");

        self.emit(Event::PaymentSettled {
            payment_id,
            paid_on: response.paid_on,
        })
        .await;

        Ok(response)
    }

    /// Loads a payment with its mirrored line items.
    #[instrument(skip(self), fields(payment_id = %payment_id))]
    pub async fn get(&self, payment_id: Uuid) -> Result<PaymentResponse, ServiceError> {
        let db = &*self.db_pool;
        let payment = find_payment(db, payment_id).await?;
        to_response(db, payment).await
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "Failed to send payment event");
            }
        }
    }
}

async fn find_payment<C: ConnectionTrait>(
    conn: &C,
    payment_id: Uuid,
) -> Result<payment_transaction::Model, ServiceError> {
    PaymentTransaction::find_by_id(payment_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Payment {} not found", payment_id)))
}

/// Persists a new amount-paid balance, re-deriving status and shortfall.
///
/// Shortfall is total_due minus amount_paid, forced to zero once paid so an
/// overpaid ledger entry never reports a negative gap.
async fn apply_balance<C: ConnectionTrait>(
    conn: &C,
    payment: payment_transaction::Model,
    amount_paid: Decimal,
) -> Result<PaymentResponse, ServiceError> {
    let status = PaymentStatus::derive(amount_paid, payment.total_due);
    let shortfall = match status {
        PaymentStatus::Paid => Decimal::ZERO,
        _ => payment.total_due - amount_paid,
    };

    let mut active: payment_transaction::ActiveModel = payment.into();
    active.amount_paid = Set(amount_paid);
    active.shortfall = Set(shortfall);
    active.status = Set(status.as_ref().to_string());
    active.updated_at = Set(Some(Utc::now()));
    let payment = active.update(conn).await.map_err(ServiceError::db_error)?;

    to_response(conn, payment).await
}

async fn to_response<C: ConnectionTrait>(
    conn: &C,
    payment: payment_transaction::Model,
) -> Result<PaymentResponse, ServiceError> {
    let items = payment
        .find_related(PaymentLineItem)
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;

    Ok(PaymentResponse {
        id: payment.id,
        user_id: payment.user_id,
        route_id: payment.route_id,
        paid_on: payment.paid_on,
        total_due: payment.total_due,
        amount_paid: payment.amount_paid,
        shortfall: payment.shortfall,
        status: payment.status,
        items: items
            .into_iter()
            .map(|i| PaymentLineItemResponse {
                id: i.id,
                pick_line_item_id: i.pick_line_item_id,
                quantity: i.quantity,
                unit_price: i.unit_price,
                subtotal: i.subtotal,
            })
            .collect(),
    })
}
