use crate::{
    db::DbPool,
    entities::{
        price_tier::{self, Entity as PriceTier, TierName, MAX_TIERS_PER_PRODUCT},
        product::{self, Entity as Product},
        stock_record,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use super::stock::unwrap_transaction_error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductTierInput {
    pub tier: TierName,
    pub value: Decimal,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 30, message = "Product name must be between 1 and 30 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 600, message = "Photo URL must be between 1 and 600 characters"))]
    pub photo_url: String,
    pub tiers: Vec<ProductTierInput>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PriceTierResponse {
    pub id: Uuid,
    pub tier: String,
    pub value: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub photo_url: String,
    pub tiers: Vec<PriceTierResponse>,
    pub stock_quantity: i32,
}

/// Resolves the unit price for (product, tier) from the catalog.
///
/// Missing or soft-deleted tiers resolve to zero rather than an error, so a
/// withdrawal is never blocked by absent pricing.
pub(crate) async fn resolve_unit_price<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    tier: TierName,
) -> Result<Decimal, ServiceError> {
    let entry = PriceTier::find()
        .filter(price_tier::Column::ProductId.eq(product_id))
        .filter(price_tier::Column::Tier.eq(tier.as_ref()))
        .filter(price_tier::Column::IsDeleted.eq(false))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?;

    Ok(entry.map(|e| e.value).unwrap_or(Decimal::ZERO))
}

/// Loads a product that exists and is not soft-deleted.
pub(crate) async fn find_active_product<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
) -> Result<product::Model, ServiceError> {
    Product::find_by_id(product_id)
        .filter(product::Column::IsDeleted.eq(false))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
}

/// Service for the product catalog: products, their price tiers, and the
/// zero stock record every product starts with.
#[derive(Clone)]
pub struct CatalogService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl CatalogService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a product with its initial price tiers and a zero stock record.
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_product(
        &self,
        request: CreateProductRequest,
    ) -> Result<ProductResponse, ServiceError> {
        request.validate()?;

        if request.tiers.is_empty() {
            return Err(ServiceError::ValidationError(
                "at least one price tier is required".to_string(),
            ));
        }
        if request.tiers.len() > MAX_TIERS_PER_PRODUCT {
            return Err(ServiceError::ValidationError(format!(
                "a product carries at most {} price tiers",
                MAX_TIERS_PER_PRODUCT
            )));
        }
        let mut seen = HashSet::new();
        for tier in &request.tiers {
            if !seen.insert(tier.tier) {
                return Err(ServiceError::ValidationError(format!(
                    "price tier '{}' appears more than once",
                    tier.tier
                )));
            }
        }

        let db = &*self.db_pool;
        let product_id = Uuid::new_v4();

        let response = db
            .transaction::<_, ProductResponse, ServiceError>(move |txn| {
                Box::pin(async move {
                    let now = Utc::now();

                    let product = product::ActiveModel {
                        id: Set(product_id),
                        name: Set(request.name.clone()),
                        photo_url: Set(request.photo_url.clone()),
                        is_deleted: Set(false),
                        created_at: Set(now),
                        updated_at: Set(Some(now)),
                    };
                    let product = product.insert(txn).await.map_err(ServiceError::db_error)?;

                    let stock = stock_record::ActiveModel {
                        product_id: Set(product_id),
                        quantity: Set(0),
                        created_at: Set(now),
                        updated_at: Set(Some(now)),
                    };
                    stock.insert(txn).await.map_err(ServiceError::db_error)?;

                    let mut tiers = Vec::with_capacity(request.tiers.len());
                    for tier in &request.tiers {
                        let row = price_tier::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            product_id: Set(product_id),
                            tier: Set(tier.tier.as_ref().to_string()),
                            value: Set(tier.value),
                            is_deleted: Set(false),
                            created_at: Set(now),
                            updated_at: Set(Some(now)),
                        };
                        let row = row.insert(txn).await.map_err(ServiceError::db_error)?;
                        tiers.push(PriceTierResponse {
                            id: row.id,
                            tier: row.tier,
                            value: row.value,
                        });
                    }

                    Ok(ProductResponse {
                        id: product.id,
                        name: product.name,
                        photo_url: product.photo_url,
                        tiers,
                        stock_quantity: 0,
                    })
                })
            })
            .await
            .map_err(unwrap_transaction_error)?;

        info!(product_id = %product_id, "Product created");

        self.emit(Event::ProductCreated(product_id)).await;

        Ok(response)
    }

    /// Adds a price tier to an existing product.
    ///
    /// Rejects duplicates for the same (product, tier) pair and enforces the
    /// per-product tier cap.
    #[instrument(skip(self), fields(product_id = %product_id, tier = %tier))]
    pub async fn add_price_tier(
        &self,
        product_id: Uuid,
        tier: TierName,
        value: Decimal,
    ) -> Result<PriceTierResponse, ServiceError> {
        let db = &*self.db_pool;

        let response = db
            .transaction::<_, PriceTierResponse, ServiceError>(move |txn| {
                Box::pin(async move {
                    find_active_product(txn, product_id).await?;

                    let existing = PriceTier::find()
                        .filter(price_tier::Column::ProductId.eq(product_id))
                        .filter(price_tier::Column::Tier.eq(tier.as_ref()))
                        .filter(price_tier::Column::IsDeleted.eq(false))
                        .count(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    if existing > 0 {
                        return Err(ServiceError::Conflict(format!(
                            "price tier '{}' already exists for this product",
                            tier
                        )));
                    }

                    let total = PriceTier::find()
                        .filter(price_tier::Column::ProductId.eq(product_id))
                        .filter(price_tier::Column::IsDeleted.eq(false))
                        .count(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    if total as usize >= MAX_TIERS_PER_PRODUCT {
                        return Err(ServiceError::ValidationError(format!(
                            "a product carries at most {} price tiers",
                            MAX_TIERS_PER_PRODUCT
                        )));
                    }

                    let now = Utc::now();
                    let row = price_tier::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        product_id: Set(product_id),
                        tier: Set(tier.as_ref().to_string()),
                        value: Set(value),
                        is_deleted: Set(false),
                        created_at: Set(now),
                        updated_at: Set(Some(now)),
                    };
                    let row = row.insert(txn).await.map_err(ServiceError::db_error)?;

                    Ok(PriceTierResponse {
                        id: row.id,
                        tier: row.tier,
                        value: row.value,
                    })
                })
            })
            .await
            .map_err(unwrap_transaction_error)?;

        self.emit(Event::PriceTierAdded {
            product_id,
            tier: tier.to_string(),
        })
        .await;

        Ok(response)
    }

    /// Unit price for (product, tier); zero when the tier is absent.
    #[instrument(skip(self), fields(product_id = %product_id, tier = %tier))]
    pub async fn unit_price(&self, product_id: Uuid, tier: TierName) -> Result<Decimal, ServiceError> {
        resolve_unit_price(&*self.db_pool, product_id, tier).await
    }

    /// Soft-deletes a price tier; later lookups fall back to zero.
    #[instrument(skip(self), fields(tier_id = %tier_id))]
    pub async fn remove_price_tier(&self, tier_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let row = PriceTier::find_by_id(tier_id)
            .filter(price_tier::Column::IsDeleted.eq(false))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Price tier {} not found", tier_id)))?;

        let mut active: price_tier::ActiveModel = row.into();
        active.is_deleted = Set(true);
        active.updated_at = Set(Some(Utc::now()));
        active.update(db).await.map_err(ServiceError::db_error)?;

        Ok(())
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "Failed to send catalog event");
            }
        }
    }
}
