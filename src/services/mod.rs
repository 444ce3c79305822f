pub mod catalog;
pub mod payments;
pub mod picks;
pub mod purchases;
pub mod stock;
pub mod suppliers;

pub use catalog::CatalogService;
pub use payments::PaymentService;
pub use picks::{PickService, RolePolicy, SALES_ROLE};
pub use purchases::PurchaseService;
pub use stock::StockService;
pub use suppliers::SupplierService;
