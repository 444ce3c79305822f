use crate::{
    db::DbPool,
    entities::{
        supplier::{self, Entity as Supplier},
        supplier_supply,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use super::stock::{apply_increase, unwrap_transaction_error};

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateSupplierRequest {
    #[validate(length(min = 1, max = 20))]
    pub company: String,
    #[validate(length(min = 1, max = 20))]
    pub contact_name: String,
    #[validate(length(min = 1, max = 50))]
    pub address: String,
    #[validate(length(min = 1, max = 13))]
    pub phone: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RecordSupplyRequest {
    pub supplier_id: Uuid,
    pub product_id: Uuid,
    pub amount: Decimal,
    #[validate(range(min = 0))]
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SupplyResponse {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub product_id: Uuid,
    pub amount: Decimal,
    pub quantity: i32,
    pub stock_on_hand: i32,
}

/// Service for suppliers and their ad-hoc delivery records.
#[derive(Clone)]
pub struct SupplierService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl SupplierService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, request), fields(company = %request.company))]
    pub async fn create_supplier(
        &self,
        request: CreateSupplierRequest,
    ) -> Result<supplier::Model, ServiceError> {
        request.validate()?;

        let now = Utc::now();
        let model = supplier::ActiveModel {
            id: Set(Uuid::new_v4()),
            company: Set(request.company),
            contact_name: Set(request.contact_name),
            address: Set(request.address),
            phone: Set(request.phone),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };

        let model = model
            .insert(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        info!(supplier_id = %model.id, "Supplier created");

        self.emit(Event::SupplierCreated(model.id)).await;

        Ok(model)
    }

    /// Records a (product, supplier) delivery and feeds its quantity into
    /// stock, all in one transaction.
    #[instrument(skip(self, request), fields(supplier_id = %request.supplier_id, product_id = %request.product_id))]
    pub async fn record_supply(
        &self,
        request: RecordSupplyRequest,
    ) -> Result<SupplyResponse, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;
        let supplier_id = request.supplier_id;
        let product_id = request.product_id;
        let quantity = request.quantity;

        let response = db
            .transaction::<_, SupplyResponse, ServiceError>(move |txn| {
                Box::pin(async move {
                    let supplier = Supplier::find_by_id(supplier_id)
                        .filter(supplier::Column::IsActive.eq(true))
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Supplier {} not found", supplier_id))
                        })?;

                    super::catalog::find_active_product(txn, product_id).await?;

                    let now = Utc::now();
                    let supply = supplier_supply::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        product_id: Set(product_id),
                        supplier_id: Set(supplier.id),
                        amount: Set(request.amount),
                        quantity: Set(quantity),
                        supplied_on: Set(now.date_naive()),
                        created_at: Set(now),
                        updated_at: Set(Some(now)),
                    };
                    let supply = supply.insert(txn).await.map_err(ServiceError::db_error)?;

                    let on_hand = apply_increase(txn, product_id, quantity).await?;

                    Ok(SupplyResponse {
                        id: supply.id,
                        supplier_id: supply.supplier_id,
                        product_id: supply.product_id,
                        amount: supply.amount,
                        quantity: supply.quantity,
                        stock_on_hand: on_hand,
                    })
                })
            })
            .await
            .map_err(unwrap_transaction_error)?;

        info!(
            supply_id = %response.id,
            on_hand = response.stock_on_hand,
            "Supply recorded"
        );

        self.emit(Event::SupplyRecorded {
            supplier_id,
            product_id,
            quantity,
        })
        .await;

        Ok(response)
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "Failed to send supplier event");
            }
        }
    }
}
