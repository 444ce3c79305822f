#![forbid(unsafe_code)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod migrator;
pub mod services;

use std::sync::Arc;

use config::AppConfig;
use db::DbPool;
use events::EventSender;
use services::{
    CatalogService, PaymentService, PickService, PurchaseService, RolePolicy, StockService,
    SupplierService,
};

/// All domain services wired to the same pool and event channel.
#[derive(Clone)]
pub struct AppServices {
    pub catalog: CatalogService,
    pub stock: StockService,
    pub suppliers: SupplierService,
    pub purchases: PurchaseService,
    pub picks: PickService,
    pub payments: PaymentService,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Option<Arc<EventSender>>,
        role_policy: Arc<dyn RolePolicy>,
    ) -> Self {
        Self {
            catalog: CatalogService::new(db_pool.clone(), event_sender.clone()),
            stock: StockService::new(db_pool.clone(), event_sender.clone()),
            suppliers: SupplierService::new(db_pool.clone(), event_sender.clone()),
            purchases: PurchaseService::new(db_pool.clone(), event_sender.clone()),
            picks: PickService::new(db_pool.clone(), event_sender.clone(), role_policy),
            payments: PaymentService::new(db_pool, event_sender),
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: AppConfig,
    pub services: AppServices,
}

impl AppState {
    pub fn new(
        db: Arc<DbPool>,
        config: AppConfig,
        event_sender: Option<Arc<EventSender>>,
        role_policy: Arc<dyn RolePolicy>,
    ) -> Self {
        let services = AppServices::new(db.clone(), event_sender, role_policy);
        Self {
            db,
            config,
            services,
        }
    }
}
