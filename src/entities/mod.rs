pub mod payment_line_item;
pub mod payment_transaction;
pub mod pick_line_item;
pub mod pick_transaction;
pub mod price_tier;
pub mod product;
pub mod purchase_line_item;
pub mod purchase_order;
pub mod route;
pub mod stock_record;
pub mod supplier;
pub mod supplier_supply;
