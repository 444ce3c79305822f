use crate::{
    db::DbPool,
    entities::{
        payment_line_item::{self, Entity as PaymentLineItem},
        payment_transaction::{self, Entity as PaymentTransaction, PaymentStatus},
        pick_line_item::{self, Entity as PickLineItem},
        pick_transaction::{self, Entity as PickTransaction},
        price_tier::TierName,
        route::{self, Entity as Route},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use super::catalog::{find_active_product, resolve_unit_price};
use super::stock::{
    apply_decrease, apply_increase, lock_products, sorted_product_ids, unwrap_transaction_error,
};

/// Role required to withdraw stock through the pick engine.
pub const SALES_ROLE: &str = "sales";

/// Authorization seam for the pick engine. Identity itself lives outside this
/// crate; callers plug in whatever backs their role assignments.
pub trait RolePolicy: Send + Sync {
    fn has_role(&self, user_id: Uuid, role: &str) -> bool;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickItemInput {
    /// Present when editing an existing line; absent lines are created fresh.
    pub line_id: Option<Uuid>,
    pub product_id: Uuid,
    pub quantity: i32,
    pub tier: TierName,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreatePickRequest {
    pub user_id: Uuid,
    pub route_id: Uuid,
    #[validate(length(min = 1, message = "at least one line item is required"))]
    pub items: Vec<PickItemInput>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdatePickRequest {
    pub user_id: Uuid,
    pub route_id: Uuid,
    #[validate(length(min = 1, message = "at least one line item is required"))]
    pub items: Vec<PickItemInput>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PickLineItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PickTransactionResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub route_id: Uuid,
    pub picked_on: chrono::NaiveDate,
    pub total: Decimal,
    pub is_confirmed: bool,
    pub items: Vec<PickLineItemResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePickResponse {
    pub transaction: PickTransactionResponse,
    pub payment_id: Uuid,
}

/// Outcome of a confirmation attempt. A repeated confirm is declined, not an
/// error: `status` is false and stock is untouched.
#[derive(Debug, Serialize, Deserialize)]
pub struct ConfirmPickResponse {
    pub status: bool,
    pub message: String,
    pub data: PickTransactionResponse,
}

fn check_item_quantities(items: &[PickItemInput]) -> Result<(), ServiceError> {
    for item in items {
        if item.quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "line item quantity must be positive".to_string(),
            ));
        }
    }
    Ok(())
}

/// Pick transaction engine (pengambilan): agents withdraw stock for a selling
/// round, producing a transaction, its line items, and a mirrored payment
/// ledger entry in one atomic step.
#[derive(Clone)]
pub struct PickService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
    role_policy: Arc<dyn RolePolicy>,
}

impl PickService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Option<Arc<EventSender>>,
        role_policy: Arc<dyn RolePolicy>,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            role_policy,
        }
    }

    fn require_sales_role(&self, user_id: Uuid) -> Result<(), ServiceError> {
        if !self.role_policy.has_role(user_id, SALES_ROLE) {
            return Err(ServiceError::Forbidden(format!(
                "user {} lacks the {} role",
                user_id, SALES_ROLE
            )));
        }
        Ok(())
    }

    /// Creates a pick transaction, decrementing stock per line and opening an
    /// unpaid payment ledger entry for the same agent, route, and date.
    #[instrument(skip(self, request), fields(user_id = %request.user_id, route_id = %request.route_id))]
    pub async fn create(
        &self,
        request: CreatePickRequest,
    ) -> Result<CreatePickResponse, ServiceError> {
        request.validate()?;
        check_item_quantities(&request.items)?;
        self.require_sales_role(request.user_id)?;

        let db = &*self.db_pool;
        let transaction_id = Uuid::new_v4();
        let payment_id = Uuid::new_v4();

        let response = db
            .transaction::<_, CreatePickResponse, ServiceError>(move |txn| {
                Box::pin(async move {
                    find_route(txn, request.route_id).await?;

                    let now = Utc::now();
                    let picked_on = now.date_naive();

                    let transaction = pick_transaction::ActiveModel {
                        id: Set(transaction_id),
                        user_id: Set(request.user_id),
                        route_id: Set(request.route_id),
                        picked_on: Set(picked_on),
                        total: Set(Decimal::ZERO),
                        is_confirmed: Set(false),
                        created_at: Set(now),
                        updated_at: Set(Some(now)),
                    };
                    transaction.insert(txn).await.map_err(ServiceError::db_error)?;

                    // Ascending product id keeps lock acquisition deterministic
                    // across concurrent transactions.
                    let mut sorted: Vec<&PickItemInput> = request.items.iter().collect();
                    sorted.sort_by_key(|item| item.product_id);

                    let mut lines = Vec::with_capacity(sorted.len());
                    for item in sorted {
                        find_active_product(txn, item.product_id).await?;
                        let unit_price =
                            resolve_unit_price(txn, item.product_id, item.tier).await?;
                        let subtotal = unit_price * Decimal::from(item.quantity);

                        let line = pick_line_item::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            transaction_id: Set(transaction_id),
                            product_id: Set(item.product_id),
                            quantity: Set(item.quantity),
                            unit_price: Set(unit_price),
                            subtotal: Set(subtotal),
                        };
                        let line = line.insert(txn).await.map_err(ServiceError::db_error)?;

                        apply_decrease(txn, item.product_id, item.quantity).await?;
                        lines.push(line);
                    }

                    let total: Decimal = lines.iter().map(|l| l.subtotal).sum();

                    let mut active: pick_transaction::ActiveModel =
                        pick_transaction::ActiveModel {
                            id: Set(transaction_id),
                            ..Default::default()
                        };
                    active.total = Set(total);
                    active.updated_at = Set(Some(now));
                    let transaction =
                        active.update(txn).await.map_err(ServiceError::db_error)?;

                    let payment = payment_transaction::ActiveModel {
                        id: Set(payment_id),
                        user_id: Set(request.user_id),
                        route_id: Set(request.route_id),
                        paid_on: Set(picked_on),
                        total_due: Set(total),
                        amount_paid: Set(Decimal::ZERO),
                        shortfall: Set(total),
                        status: Set(PaymentStatus::Unpaid.as_ref().to_string()),
                        created_at: Set(now),
                        updated_at: Set(Some(now)),
                    };
                    payment.insert(txn).await.map_err(ServiceError::db_error)?;

                    regenerate_payment_lines(txn, payment_id, &lines).await?;

                    Ok(CreatePickResponse {
                        transaction: to_response(transaction, lines),
                        payment_id,
                    })
                })
            })
            .await
            .map_err(unwrap_transaction_error)?;

        info!(
            transaction_id = %transaction_id,
            payment_id = %payment_id,
            total = %response.transaction.total,
            "Pick transaction created"
        );

        self.emit(Event::PickCreated {
            transaction_id,
            payment_id,
            total: response.transaction.total,
        })
        .await;

        Ok(response)
    }

    /// Edits an unconfirmed pick transaction.
    ///
    /// Removed lines restore their stock, surviving lines apply only the
    /// quantity delta, new lines decrement in full. The mirrored payment entry
    /// is re-totaled and its line items fully regenerated.
    #[instrument(skip(self, request), fields(transaction_id = %transaction_id))]
    pub async fn update(
        &self,
        transaction_id: Uuid,
        request: UpdatePickRequest,
    ) -> Result<PickTransactionResponse, ServiceError> {
        request.validate()?;
        check_item_quantities(&request.items)?;
        self.require_sales_role(request.user_id)?;

        let db = &*self.db_pool;

        let response = db
            .transaction::<_, PickTransactionResponse, ServiceError>(move |txn| {
                Box::pin(async move {
                    let transaction = PickTransaction::find_by_id(transaction_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Pick transaction {} not found",
                                transaction_id
                            ))
                        })?;
                    if transaction.is_confirmed {
                        return Err(ServiceError::AlreadyConfirmed(transaction_id));
                    }

                    let existing = transaction
                        .find_related(PickLineItem)
                        .all(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    let existing_by_id: HashMap<Uuid, pick_line_item::Model> =
                        existing.iter().map(|l| (l.id, l.clone())).collect();

                    let requested_ids: HashSet<Uuid> =
                        request.items.iter().filter_map(|i| i.line_id).collect();

                    // Every stock row this edit touches (reverted or applied)
                    // is locked in one ascending pass before any mutation, so
                    // concurrent edits cannot acquire the locks in crossing
                    // orders.
                    let touched = sorted_product_ids(
                        existing
                            .iter()
                            .map(|l| l.product_id)
                            .chain(request.items.iter().map(|i| i.product_id)),
                    );
                    lock_products(txn, &touched).await?;

                    // Lines dropped from the request give their stock back.
                    let removed: Vec<&pick_line_item::Model> = existing
                        .iter()
                        .filter(|l| !requested_ids.contains(&l.id))
                        .collect();

                    for line in removed {
                        apply_increase(txn, line.product_id, line.quantity).await?;
                        PaymentLineItem::delete_many()
                            .filter(payment_line_item::Column::PickLineItemId.eq(line.id))
                            .exec(txn)
                            .await
                            .map_err(ServiceError::db_error)?;
                        PickLineItem::delete_by_id(line.id)
                            .exec(txn)
                            .await
                            .map_err(ServiceError::db_error)?;
                    }

                    for item in &request.items {
                        match item.line_id.and_then(|id| existing_by_id.get(&id)) {
                            Some(line) => {
                                if line.product_id != item.product_id {
                                    return Err(ServiceError::ProductImmutable(line.id));
                                }

                                let delta = item.quantity - line.quantity;
                                if delta > 0 {
                                    apply_decrease(txn, line.product_id, delta).await?;
                                } else if delta < 0 {
                                    apply_increase(txn, line.product_id, -delta).await?;
                                }

                                let unit_price =
                                    resolve_unit_price(txn, item.product_id, item.tier).await?;
                                let subtotal = unit_price * Decimal::from(item.quantity);

                                let mut active: pick_line_item::ActiveModel =
                                    line.clone().into();
                                active.quantity = Set(item.quantity);
                                active.unit_price = Set(unit_price);
                                active.subtotal = Set(subtotal);
                                active.update(txn).await.map_err(ServiceError::db_error)?;
                            }
                            // Unknown or absent line id means a fresh line.
                            None => {
                                find_active_product(txn, item.product_id).await?;
                                let unit_price =
                                    resolve_unit_price(txn, item.product_id, item.tier).await?;
                                let subtotal = unit_price * Decimal::from(item.quantity);

                                let line = pick_line_item::ActiveModel {
                                    id: Set(Uuid::new_v4()),
                                    transaction_id: Set(transaction_id),
                                    product_id: Set(item.product_id),
                                    quantity: Set(item.quantity),
                                    unit_price: Set(unit_price),
                                    subtotal: Set(subtotal),
                                };
                                line.insert(txn).await.map_err(ServiceError::db_error)?;

                                apply_decrease(txn, item.product_id, item.quantity).await?;
                            }
                        }
                    }

                    let lines = PickLineItem::find()
                        .filter(pick_line_item::Column::TransactionId.eq(transaction_id))
                        .all(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    let total: Decimal = lines.iter().map(|l| l.subtotal).sum();

                    let picked_on = transaction.picked_on;
                    let now = Utc::now();
                    let mut active: pick_transaction::ActiveModel = transaction.into();
                    active.user_id = Set(request.user_id);
                    active.route_id = Set(request.route_id);
                    active.total = Set(total);
                    active.updated_at = Set(Some(now));
                    let transaction =
                        active.update(txn).await.map_err(ServiceError::db_error)?;

                    let payment_id = upsert_payment(
                        txn,
                        request.user_id,
                        request.route_id,
                        picked_on,
                        total,
                    )
                    .await?;

                    // Full regeneration keeps the payment mirror exact even
                    // when line ids survived the edit.
                    PaymentLineItem::delete_many()
                        .filter(payment_line_item::Column::PaymentId.eq(payment_id))
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    regenerate_payment_lines(txn, payment_id, &lines).await?;

                    Ok(to_response(transaction, lines))
                })
            })
            .await
            .map_err(unwrap_transaction_error)?;

        info!(
            transaction_id = %transaction_id,
            total = %response.total,
            "Pick transaction updated"
        );

        self.emit(Event::PickUpdated {
            transaction_id,
            total: response.total,
        })
        .await;

        Ok(response)
    }

    /// Confirms a pick transaction, applying the confirmation decrement to
    /// every line. Confirming twice is declined without touching stock.
    #[instrument(skip(self), fields(transaction_id = %transaction_id))]
    pub async fn confirm(
        &self,
        transaction_id: Uuid,
    ) -> Result<ConfirmPickResponse, ServiceError> {
        let db = &*self.db_pool;

        let response = db
            .transaction::<_, ConfirmPickResponse, ServiceError>(move |txn| {
                Box::pin(async move {
                    let transaction = PickTransaction::find_by_id(transaction_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Pick transaction {} not found",
                                transaction_id
                            ))
                        })?;

                    let mut lines = transaction
                        .find_related(PickLineItem)
                        .all(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    lines.sort_by_key(|l| l.product_id);

                    if transaction.is_confirmed {
                        return Ok(ConfirmPickResponse {
                            status: false,
                            message: "Transaction already confirmed.".to_string(),
                            data: to_response(transaction, lines),
                        });
                    }

                    for line in &lines {
                        apply_decrease(txn, line.product_id, line.quantity).await?;
                    }

                    let mut active: pick_transaction::ActiveModel = transaction.into();
                    active.is_confirmed = Set(true);
                    active.updated_at = Set(Some(Utc::now()));
                    let transaction =
                        active.update(txn).await.map_err(ServiceError::db_error)?;

                    Ok(ConfirmPickResponse {
                        status: true,
                        message: "Transaction confirmed and stock updated.".to_string(),
                        data: to_response(transaction, lines),
                    })
                })
            })
            .await
            .map_err(unwrap_transaction_error)?;

        if response.status {
            info!(transaction_id = %transaction_id, "Pick transaction confirmed");
            self.emit(Event::PickConfirmed(transaction_id)).await;
        } else {
            info!(transaction_id = %transaction_id, "Pick transaction already confirmed");
        }

        Ok(response)
    }

    /// Loads a pick transaction with its line items.
    #[instrument(skip(self), fields(transaction_id = %transaction_id))]
    pub async fn get(
        &self,
        transaction_id: Uuid,
    ) -> Result<PickTransactionResponse, ServiceError> {
        let db = &*self.db_pool;

        let transaction = PickTransaction::find_by_id(transaction_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Pick transaction {} not found", transaction_id))
            })?;

        let lines = transaction
            .find_related(PickLineItem)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(to_response(transaction, lines))
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "Failed to send pick event");
            }
        }
    }
}

async fn find_route<C: ConnectionTrait>(
    conn: &C,
    route_id: Uuid,
) -> Result<route::Model, ServiceError> {
    Route::find_by_id(route_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Route {} not found", route_id)))
}

/// Finds the payment ledger entry keyed on (agent, route, date) and re-totals
/// it, or opens a fresh unpaid one.
async fn upsert_payment<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    route_id: Uuid,
    paid_on: chrono::NaiveDate,
    total_due: Decimal,
) -> Result<Uuid, ServiceError> {
    let existing = PaymentTransaction::find()
        .filter(payment_transaction::Column::UserId.eq(user_id))
        .filter(payment_transaction::Column::RouteId.eq(route_id))
        .filter(payment_transaction::Column::PaidOn.eq(paid_on))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?;

    let now = Utc::now();
    match existing {
        Some(payment) => {
            let amount_paid = payment.amount_paid;
            let status = PaymentStatus::derive(amount_paid, total_due);
            let shortfall = match status {
                PaymentStatus::Paid => Decimal::ZERO,
                _ => total_due - amount_paid,
            };

            let payment_id = payment.id;
            let mut active: payment_transaction::ActiveModel = payment.into();
            active.total_due = Set(total_due);
            active.shortfall = Set(shortfall);
            active.status = Set(status.as_ref().to_string());
            active.updated_at = Set(Some(now));
            active.update(conn).await.map_err(ServiceError::db_error)?;

            Ok(payment_id)
        }
        None => {
            let payment_id = Uuid::new_v4();
            let payment = payment_transaction::ActiveModel {
                id: Set(payment_id),
                user_id: Set(user_id),
                route_id: Set(route_id),
                paid_on: Set(paid_on),
                total_due: Set(total_due),
                amount_paid: Set(Decimal::ZERO),
                shortfall: Set(total_due),
                status: Set(PaymentStatus::Unpaid.as_ref().to_string()),
                created_at: Set(now),
                updated_at: Set(Some(now)),
            };
            payment.insert(conn).await.map_err(ServiceError::db_error)?;

            Ok(payment_id)
        }
    }
}

/// Mirrors the current pick lines into the payment ledger one to one.
async fn regenerate_payment_lines<C: ConnectionTrait>(
    conn: &C,
    payment_id: Uuid,
    lines: &[pick_line_item::Model],
) -> Result<(), ServiceError> {
    for line in lines {
        let mirror = payment_line_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            payment_id: Set(payment_id),
            pick_line_item_id: Set(line.id),
            quantity: Set(line.quantity),
            unit_price: Set(line.unit_price),
            subtotal: Set(line.subtotal),
        };
        mirror.insert(conn).await.map_err(ServiceError::db_error)?;
    }
    Ok(())
}

fn to_response(
    transaction: pick_transaction::Model,
    lines: Vec<pick_line_item::Model>,
) -> PickTransactionResponse {
    PickTransactionResponse {
        id: transaction.id,
        user_id: transaction.user_id,
        route_id: transaction.route_id,
        picked_on: transaction.picked_on,
        total: transaction.total,
        is_confirmed: transaction.is_confirmed,
        items: lines
            .into_iter()
            .map(|l| PickLineItemResponse {
                id: l.id,
                product_id: l.product_id,
                quantity: l.quantity,
                unit_price: l.unit_price,
                subtotal: l.subtotal,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_and_negative_quantities_are_rejected() {
        let item = |quantity| PickItemInput {
            line_id: None,
            product_id: Uuid::new_v4(),
            quantity,
            tier: TierName::Retail,
        };

        assert!(check_item_quantities(&[item(1)]).is_ok());
        assert!(check_item_quantities(&[item(0)]).is_err());
        assert!(check_item_quantities(&[item(-3)]).is_err());
    }
}
