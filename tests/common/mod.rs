#![allow(dead_code)]

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use std::time::Duration;
use toko_api::{
    db::{establish_connection_with_config, DbConfig, DbPool},
    entities::{price_tier::TierName, route, supplier},
    migrator::Migrator,
    services::{catalog, picks::RolePolicy},
    AppServices,
};
use uuid::Uuid;

/// Policy that grants every role; the default for tests not about authz.
pub struct AllowAll;

impl RolePolicy for AllowAll {
    fn has_role(&self, _user_id: Uuid, _role: &str) -> bool {
        true
    }
}

/// Policy that denies every role.
pub struct DenyAll;

impl RolePolicy for DenyAll {
    fn has_role(&self, _user_id: Uuid, _role: &str) -> bool {
        false
    }
}

pub struct TestApp {
    pub db: Arc<DbPool>,
    pub services: AppServices,
}

pub async fn setup() -> TestApp {
    setup_with_policy(Arc::new(AllowAll)).await
}

pub async fn setup_with_policy(policy: Arc<dyn RolePolicy>) -> TestApp {
    // A single connection keeps every handle on the same in-memory database.
    let config = DbConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        connect_timeout: Duration::from_secs(5),
        idle_timeout: Duration::from_secs(60),
        acquire_timeout: Duration::from_secs(5),
    };

    let db = establish_connection_with_config(&config)
        .await
        .expect("failed to open test database");
    Migrator::up(&db, None).await.expect("migrations failed");

    let db = Arc::new(db);
    let services = AppServices::new(db.clone(), None, policy);

    TestApp { db, services }
}

/// Creates a product with the given price tiers and returns its response.
pub async fn seed_product(
    app: &TestApp,
    name: &str,
    tiers: &[(TierName, Decimal)],
) -> catalog::ProductResponse {
    app.services
        .catalog
        .create_product(catalog::CreateProductRequest {
            name: name.to_string(),
            photo_url: format!("https://img.example/{}.jpg", name),
            tiers: tiers
                .iter()
                .map(|(tier, value)| catalog::ProductTierInput {
                    tier: *tier,
                    value: *value,
                })
                .collect(),
        })
        .await
        .expect("failed to seed product")
}

pub async fn seed_route(app: &TestApp, name: &str) -> Uuid {
    let now = Utc::now();
    let model = route::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        created_at: Set(now),
        updated_at: Set(Some(now)),
    };
    let model = model
        .insert(&*app.db)
        .await
        .expect("failed to seed route");
    model.id
}

pub async fn seed_supplier(app: &TestApp, company: &str) -> supplier::Model {
    let now = Utc::now();
    let model = supplier::ActiveModel {
        id: Set(Uuid::new_v4()),
        company: Set(company.to_string()),
        contact_name: Set("Budi".to_string()),
        address: Set("Jl. Pasar Baru 1".to_string()),
        phone: Set("081234567890".to_string()),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(Some(now)),
    };
    model
        .insert(&*app.db)
        .await
        .expect("failed to seed supplier")
}

/// Current quantity on hand for a product.
pub async fn on_hand(app: &TestApp, product_id: Uuid) -> i32 {
    app.services
        .stock
        .quantity_on_hand(product_id)
        .await
        .expect("failed to read stock")
}
