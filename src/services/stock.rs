use crate::{
    db::{lock_for_update, DbPool},
    entities::stock_record::{self, Entity as StockRecord},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, EntityTrait, Set, TransactionError, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Loads the stock record for a product under an exclusive row lock,
/// materializing a zero record on first access.
///
/// Must run inside the caller's transaction so the lock spans the whole
/// read-check-write sequence.
pub(crate) async fn get_or_create_record<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
) -> Result<stock_record::Model, ServiceError> {
    let select = lock_for_update(
        StockRecord::find_by_id(product_id),
        conn.get_database_backend(),
    );

    if let Some(record) = select.one(conn).await.map_err(ServiceError::db_error)? {
        return Ok(record);
    }

    let now = Utc::now();
    let record = stock_record::ActiveModel {
        product_id: Set(product_id),
        quantity: Set(0),
        created_at: Set(now),
        updated_at: Set(Some(now)),
    };

    record.insert(conn).await.map_err(ServiceError::db_error)
}

/// Sorted, deduplicated set of product ids an operation will touch.
pub(crate) fn sorted_product_ids<I: IntoIterator<Item = Uuid>>(ids: I) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = ids.into_iter().collect();
    ids.sort();
    ids.dedup();
    ids
}

/// Takes the exclusive stock row lock for every given product, materializing
/// missing records.
///
/// Multi-product operations pass the full set of products they will touch so
/// every transaction acquires its row locks in the same ascending order,
/// regardless of the order it later mutates them in.
pub(crate) async fn lock_products<C: ConnectionTrait>(
    conn: &C,
    product_ids: &[Uuid],
) -> Result<(), ServiceError> {
    for product_id in product_ids {
        get_or_create_record(conn, *product_id).await?;
    }
    Ok(())
}

/// Increments a product's quantity on hand. Always succeeds for amount >= 0.
pub(crate) async fn apply_increase<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    amount: i32,
) -> Result<i32, ServiceError> {
    if amount < 0 {
        return Err(ServiceError::ValidationError(
            "stock increase amount must not be negative".to_string(),
        ));
    }

    let record = get_or_create_record(conn, product_id).await?;
    let new_quantity = record.quantity + amount;

    let mut active: stock_record::ActiveModel = record.into();
    active.quantity = Set(new_quantity);
    active.updated_at = Set(Some(Utc::now()));
    active.update(conn).await.map_err(ServiceError::db_error)?;

    Ok(new_quantity)
}

/// Decrements a product's quantity on hand, rejecting the mutation when it
/// would drop below zero. The remaining quantity is reported in the error.
pub(crate) async fn apply_decrease<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    amount: i32,
) -> Result<i32, ServiceError> {
    if amount < 0 {
        return Err(ServiceError::ValidationError(
            "stock decrease amount must not be negative".to_string(),
        ));
    }

    let record = get_or_create_record(conn, product_id).await?;
    if record.quantity < amount {
        return Err(ServiceError::InsufficientStock(format!(
            "product {}: requested {}, remaining {}",
            product_id, amount, record.quantity
        )));
    }

    let new_quantity = record.quantity - amount;
    let mut active: stock_record::ActiveModel = record.into();
    active.quantity = Set(new_quantity);
    active.updated_at = Set(Some(Utc::now()));
    active.update(conn).await.map_err(ServiceError::db_error)?;

    Ok(new_quantity)
}

/// Service exposing the stock ledger as a standalone collaborator.
///
/// Purchase intake and the pick engine run the same primitives inside their
/// own transactions; this wrapper is for callers that touch stock directly.
#[derive(Clone)]
pub struct StockService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl StockService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Current quantity on hand; creates a zero record on first access.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn quantity_on_hand(&self, product_id: Uuid) -> Result<i32, ServiceError> {
        let db = &*self.db_pool;

        let quantity = db
            .transaction::<_, i32, ServiceError>(move |txn| {
                Box::pin(async move {
                    let record = get_or_create_record(txn, product_id).await?;
                    Ok(record.quantity)
                })
            })
            .await
            .map_err(unwrap_transaction_error)?;

        Ok(quantity)
    }

    /// Receives quantity into stock.
    #[instrument(skip(self), fields(product_id = %product_id, amount = amount))]
    pub async fn receive(&self, product_id: Uuid, amount: i32) -> Result<i32, ServiceError> {
        let db = &*self.db_pool;

        let on_hand = db
            .transaction::<_, i32, ServiceError>(move |txn| {
                Box::pin(async move { apply_increase(txn, product_id, amount).await })
            })
            .await
            .map_err(unwrap_transaction_error)?;

        info!(product_id = %product_id, amount = amount, on_hand = on_hand, "Stock received");

        self.emit(Event::StockReceived {
            product_id,
            quantity: amount,
            on_hand,
        })
        .await;

        Ok(on_hand)
    }

    /// Withdraws quantity from stock with a sufficiency check.
    #[instrument(skip(self), fields(product_id = %product_id, amount = amount))]
    pub async fn withdraw(&self, product_id: Uuid, amount: i32) -> Result<i32, ServiceError> {
        let db = &*self.db_pool;

        let on_hand = db
            .transaction::<_, i32, ServiceError>(move |txn| {
                Box::pin(async move { apply_decrease(txn, product_id, amount).await })
            })
            .await
            .map_err(unwrap_transaction_error)?;

        info!(product_id = %product_id, amount = amount, on_hand = on_hand, "Stock withdrawn");

        self.emit(Event::StockWithdrawn {
            product_id,
            quantity: amount,
            on_hand,
        })
        .await;

        Ok(on_hand)
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "Failed to send stock event");
            }
        }
    }
}

/// Flattens SeaORM's transaction error wrapper back into our error type.
pub(crate) fn unwrap_transaction_error(err: TransactionError<ServiceError>) -> ServiceError {
    match err {
        TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
        TransactionError::Transaction(service_err) => service_err,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_order_is_ascending_and_deduplicated() {
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        let c = Uuid::from_u128(3);

        // Union of two phases of an edit (reverted and applied products) must
        // collapse to one ascending pass.
        let ids = sorted_product_ids([c, a, b, a, c]);
        assert_eq!(ids, vec![a, b, c]);
    }
}
