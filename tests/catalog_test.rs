mod common;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use toko_api::{
    entities::price_tier::TierName,
    errors::ServiceError,
    services::suppliers::RecordSupplyRequest,
};

use common::{on_hand, seed_product, seed_supplier, setup};

#[tokio::test]
async fn new_products_start_with_zero_stock() {
    let app = setup().await;
    let product = seed_product(
        &app,
        "wafer",
        &[
            (TierName::Factory, dec!(70)),
            (TierName::Retail, dec!(100)),
        ],
    )
    .await;

    assert_eq!(product.tiers.len(), 2);
    assert_eq!(product.stock_quantity, 0);
    assert_eq!(on_hand(&app, product.id).await, 0);
}

#[tokio::test]
async fn duplicate_tier_is_a_conflict() {
    let app = setup().await;
    let product = seed_product(&app, "biskuit", &[(TierName::Retail, dec!(100))]).await;

    let err = app
        .services
        .catalog
        .add_price_tier(product.id, TierName::Retail, dec!(120))
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::Conflict(_));
}

#[tokio::test]
async fn a_product_can_carry_all_eight_tiers() {
    let app = setup().await;
    let product = seed_product(
        &app,
        "permen",
        &[
            (TierName::Factory, dec!(10)),
            (TierName::ToMarket, dec!(12)),
            (TierName::AtMarket, dec!(14)),
            (TierName::ToStore, dec!(16)),
            (TierName::AtStore, dec!(18)),
            (TierName::BelowStandardMarket, dec!(8)),
            (TierName::BelowStandardStore, dec!(9)),
            (TierName::Retail, dec!(20)),
        ],
    )
    .await;

    assert_eq!(product.tiers.len(), 8);

    // Every name is taken, so any further tier collides.
    let err = app
        .services
        .catalog
        .add_price_tier(product.id, TierName::Factory, dec!(11))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));
}

#[tokio::test]
async fn removed_tiers_resolve_to_zero() {
    let app = setup().await;
    let product = seed_product(&app, "coklat", &[(TierName::Retail, dec!(100))]).await;
    let tier_id = product.tiers[0].id;

    assert_eq!(
        app.services
            .catalog
            .unit_price(product.id, TierName::Retail)
            .await
            .unwrap(),
        dec!(100)
    );

    app.services.catalog.remove_price_tier(tier_id).await.unwrap();

    assert_eq!(
        app.services
            .catalog
            .unit_price(product.id, TierName::Retail)
            .await
            .unwrap(),
        dec!(0)
    );
}

#[tokio::test]
async fn absent_tiers_resolve_to_zero() {
    let app = setup().await;
    let product = seed_product(&app, "agar", &[(TierName::Retail, dec!(100))]).await;

    let price = app
        .services
        .catalog
        .unit_price(product.id, TierName::ToStore)
        .await
        .unwrap();

    assert_eq!(price, dec!(0));
}

#[tokio::test]
async fn supplies_feed_the_stock_ledger() {
    let app = setup().await;
    let supplier = seed_supplier(&app, "PT Segar").await;
    let product = seed_product(&app, "air", &[(TierName::Retail, dec!(30))]).await;

    let supply = app
        .services
        .suppliers
        .record_supply(RecordSupplyRequest {
            supplier_id: supplier.id,
            product_id: product.id,
            amount: dec!(150),
            quantity: 12,
        })
        .await
        .unwrap();

    assert_eq!(supply.stock_on_hand, 12);
    assert_eq!(on_hand(&app, product.id).await, 12);
}
