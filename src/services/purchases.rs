use crate::{
    db::DbPool,
    entities::{
        purchase_line_item::{self, Entity as PurchaseLineItem},
        purchase_order::{self, Entity as PurchaseOrder},
        supplier::{self, Entity as Supplier},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use super::stock::{
    apply_decrease, apply_increase, lock_products, sorted_product_ids, unwrap_transaction_error,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseLineInput {
    pub product_id: Uuid,
    pub amount: Decimal,
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreatePurchaseOrderRequest {
    pub supplier_id: Uuid,
    /// Caller-supplied total; must equal the sum of line amounts.
    pub total: Decimal,
    #[validate(length(min = 1, message = "at least one line item is required"))]
    pub items: Vec<PurchaseLineInput>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PurchaseLineItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub amount: Decimal,
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PurchaseOrderResponse {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub ordered_on: chrono::NaiveDate,
    pub total: Decimal,
    pub items: Vec<PurchaseLineItemResponse>,
}

fn check_items(items: &[PurchaseLineInput], claimed_total: Decimal) -> Result<(), ServiceError> {
    for item in items {
        if item.quantity < 0 {
            return Err(ServiceError::ValidationError(
                "line item quantity must not be negative".to_string(),
            ));
        }
    }

    let line_total: Decimal = items.iter().map(|i| i.amount).sum();
    if line_total != claimed_total {
        return Err(ServiceError::ValidationError(format!(
            "total {} does not match the sum of line amounts {}",
            claimed_total, line_total
        )));
    }

    Ok(())
}

/// Service for purchase intake (belanja): supplier deliveries that feed the
/// stock ledger.
#[derive(Clone)]
pub struct PurchaseService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl PurchaseService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a purchase order and increments stock for every line item.
    #[instrument(skip(self, request), fields(supplier_id = %request.supplier_id))]
    pub async fn create(
        &self,
        request: CreatePurchaseOrderRequest,
    ) -> Result<PurchaseOrderResponse, ServiceError> {
        request.validate()?;
        check_items(&request.items, request.total)?;

        let db = &*self.db_pool;
        let order_id = Uuid::new_v4();
        let total = request.total;

        let response = db
            .transaction::<_, PurchaseOrderResponse, ServiceError>(move |txn| {
                Box::pin(async move {
                    Supplier::find_by_id(request.supplier_id)
                        .filter(supplier::Column::IsActive.eq(true))
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Supplier {} not found",
                                request.supplier_id
                            ))
                        })?;

                    let now = Utc::now();
                    let order = purchase_order::ActiveModel {
                        id: Set(order_id),
                        supplier_id: Set(request.supplier_id),
                        ordered_on: Set(now.date_naive()),
                        total: Set(request.total),
                        created_at: Set(now),
                        updated_at: Set(Some(now)),
                    };
                    let order = order.insert(txn).await.map_err(ServiceError::db_error)?;

                    let items =
                        insert_line_items(txn, order_id, &request.items).await?;

                    Ok(PurchaseOrderResponse {
                        id: order.id,
                        supplier_id: order.supplier_id,
                        ordered_on: order.ordered_on,
                        total: order.total,
                        items,
                    })
                })
            })
            .await
            .map_err(unwrap_transaction_error)?;

        info!(order_id = %order_id, total = %total, "Purchase order created");

        self.emit(Event::PurchaseOrderCreated { order_id, total }).await;

        Ok(response)
    }

    /// Replaces a purchase order's line items wholesale.
    ///
    /// Stock for every existing line is reverted with a checked decrement
    /// (stock already consumed elsewhere aborts the whole replace), old lines
    /// are deleted, and the new set is applied. Never a per-line diff.
    #[instrument(skip(self, items), fields(order_id = %order_id))]
    pub async fn replace_items(
        &self,
        order_id: Uuid,
        total: Decimal,
        items: Vec<PurchaseLineInput>,
    ) -> Result<PurchaseOrderResponse, ServiceError> {
        if items.is_empty() {
            return Err(ServiceError::ValidationError(
                "at least one line item is required".to_string(),
            ));
        }
        check_items(&items, total)?;

        let db = &*self.db_pool;

        let response = db
            .transaction::<_, PurchaseOrderResponse, ServiceError>(move |txn| {
                Box::pin(async move {
                    let order = PurchaseOrder::find_by_id(order_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Purchase order {} not found", order_id))
                        })?;

                    let old_lines = order
                        .find_related(PurchaseLineItem)
                        .all(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    // One ascending lock pass over every product the revert
                    // and the new lines touch, before any mutation.
                    let touched = sorted_product_ids(
                        old_lines
                            .iter()
                            .map(|l| l.product_id)
                            .chain(items.iter().map(|i| i.product_id)),
                    );
                    lock_products(txn, &touched).await?;

                    for line in &old_lines {
                        apply_decrease(txn, line.product_id, line.quantity).await?;
                    }

                    PurchaseLineItem::delete_many()
                        .filter(purchase_line_item::Column::PurchaseOrderId.eq(order_id))
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    let new_items = insert_line_items(txn, order_id, &items).await?;

                    let mut active: purchase_order::ActiveModel = order.into();
                    active.total = Set(total);
                    active.updated_at = Set(Some(Utc::now()));
                    let order = active.update(txn).await.map_err(ServiceError::db_error)?;

                    Ok(PurchaseOrderResponse {
                        id: order.id,
                        supplier_id: order.supplier_id,
                        ordered_on: order.ordered_on,
                        total: order.total,
                        items: new_items,
                    })
                })
            })
            .await
            .map_err(unwrap_transaction_error)?;

        info!(order_id = %order_id, total = %total, "Purchase order line items replaced");

        self.emit(Event::PurchaseOrderReplaced(order_id)).await;

        Ok(response)
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "Failed to send purchase event");
            }
        }
    }
}

/// Inserts line items in ascending product-id order, incrementing stock per
/// line. Products must exist and be active.
async fn insert_line_items<C: sea_orm::ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    items: &[PurchaseLineInput],
) -> Result<Vec<PurchaseLineItemResponse>, ServiceError> {
    let mut sorted: Vec<&PurchaseLineInput> = items.iter().collect();
    sorted.sort_by_key(|item| item.product_id);

    let mut responses = Vec::with_capacity(sorted.len());
    for item in sorted {
        super::catalog::find_active_product(conn, item.product_id).await?;

        let line = purchase_line_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            purchase_order_id: Set(order_id),
            product_id: Set(item.product_id),
            amount: Set(item.amount),
            quantity: Set(item.quantity),
        };
        let line = line.insert(conn).await.map_err(ServiceError::db_error)?;

        apply_increase(conn, item.product_id, item.quantity).await?;

        responses.push(PurchaseLineItemResponse {
            id: line.id,
            product_id: line.product_id,
            amount: line.amount,
            quantity: line.quantity,
        });
    }

    Ok(responses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn total_mismatch_is_rejected() {
        let items = vec![
            PurchaseLineInput {
                product_id: Uuid::new_v4(),
                amount: dec!(100),
                quantity: 5,
            },
            PurchaseLineInput {
                product_id: Uuid::new_v4(),
                amount: dec!(50),
                quantity: 2,
            },
        ];

        assert!(check_items(&items, dec!(150)).is_ok());
        assert!(matches!(
            check_items(&items, dec!(149)),
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn negative_quantity_is_rejected() {
        let items = vec![PurchaseLineInput {
            product_id: Uuid::new_v4(),
            amount: dec!(10),
            quantity: -1,
        }];

        assert!(matches!(
            check_items(&items, dec!(10)),
            Err(ServiceError::ValidationError(_))
        ));
    }
}
