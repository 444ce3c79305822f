mod common;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use toko_api::{
    entities::price_tier::TierName,
    errors::ServiceError,
    services::purchases::{CreatePurchaseOrderRequest, PurchaseLineInput},
};
use uuid::Uuid;

use common::{on_hand, seed_product, seed_supplier, setup};

#[tokio::test]
async fn create_increments_stock_per_line() {
    let app = setup().await;
    let supplier = seed_supplier(&app, "PT Sumber").await;
    let p1 = seed_product(&app, "kecap", &[(TierName::Retail, dec!(100))]).await;
    let p2 = seed_product(&app, "sambal", &[(TierName::Retail, dec!(150))]).await;

    let order = app
        .services
        .purchases
        .create(CreatePurchaseOrderRequest {
            supplier_id: supplier.id,
            total: dec!(350),
            items: vec![
                PurchaseLineInput {
                    product_id: p1.id,
                    amount: dec!(200),
                    quantity: 10,
                },
                PurchaseLineInput {
                    product_id: p2.id,
                    amount: dec!(150),
                    quantity: 6,
                },
            ],
        })
        .await
        .unwrap();

    assert_eq!(order.total, dec!(350));
    assert_eq!(order.items.len(), 2);
    assert_eq!(on_hand(&app, p1.id).await, 10);
    assert_eq!(on_hand(&app, p2.id).await, 6);
}

#[tokio::test]
async fn total_must_match_the_sum_of_line_amounts() {
    let app = setup().await;
    let supplier = seed_supplier(&app, "PT Makmur").await;
    let product = seed_product(&app, "terigu", &[(TierName::Retail, dec!(50))]).await;

    let err = app
        .services
        .purchases
        .create(CreatePurchaseOrderRequest {
            supplier_id: supplier.id,
            total: dec!(999),
            items: vec![PurchaseLineInput {
                product_id: product.id,
                amount: dec!(200),
                quantity: 4,
            }],
        })
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::ValidationError(_));
    assert_eq!(on_hand(&app, product.id).await, 0);
}

#[tokio::test]
async fn unknown_supplier_is_not_found() {
    let app = setup().await;
    let product = seed_product(&app, "tepung", &[(TierName::Retail, dec!(50))]).await;

    let err = app
        .services
        .purchases
        .create(CreatePurchaseOrderRequest {
            supplier_id: Uuid::new_v4(),
            total: dec!(100),
            items: vec![PurchaseLineInput {
                product_id: product.id,
                amount: dec!(100),
                quantity: 2,
            }],
        })
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::NotFound(_));
    assert_eq!(on_hand(&app, product.id).await, 0);
}

#[tokio::test]
async fn replace_reverts_old_lines_and_applies_new_ones() {
    let app = setup().await;
    let supplier = seed_supplier(&app, "PT Jaya").await;
    let p1 = seed_product(&app, "sirup", &[(TierName::Retail, dec!(100))]).await;
    let p2 = seed_product(&app, "madu", &[(TierName::Retail, dec!(500))]).await;

    let order = app
        .services
        .purchases
        .create(CreatePurchaseOrderRequest {
            supplier_id: supplier.id,
            total: dec!(300),
            items: vec![PurchaseLineInput {
                product_id: p1.id,
                amount: dec!(300),
                quantity: 5,
            }],
        })
        .await
        .unwrap();
    assert_eq!(on_hand(&app, p1.id).await, 5);

    let replaced = app
        .services
        .purchases
        .replace_items(
            order.id,
            dec!(450),
            vec![
                PurchaseLineInput {
                    product_id: p1.id,
                    amount: dec!(200),
                    quantity: 2,
                },
                PurchaseLineInput {
                    product_id: p2.id,
                    amount: dec!(250),
                    quantity: 3,
                },
            ],
        )
        .await
        .unwrap();

    assert_eq!(replaced.total, dec!(450));
    assert_eq!(replaced.items.len(), 2);
    assert_eq!(on_hand(&app, p1.id).await, 2);
    assert_eq!(on_hand(&app, p2.id).await, 3);
}

#[tokio::test]
async fn replace_aborts_when_delivered_stock_was_already_consumed() {
    let app = setup().await;
    let supplier = seed_supplier(&app, "PT Abadi").await;
    let product = seed_product(&app, "kacang", &[(TierName::Retail, dec!(100))]).await;

    let order = app
        .services
        .purchases
        .create(CreatePurchaseOrderRequest {
            supplier_id: supplier.id,
            total: dec!(500),
            items: vec![PurchaseLineInput {
                product_id: product.id,
                amount: dec!(500),
                quantity: 5,
            }],
        })
        .await
        .unwrap();

    // Consume most of the delivered quantity so the revert cannot succeed.
    app.services.stock.withdraw(product.id, 4).await.unwrap();
    assert_eq!(on_hand(&app, product.id).await, 1);

    let err = app
        .services
        .purchases
        .replace_items(
            order.id,
            dec!(100),
            vec![PurchaseLineInput {
                product_id: product.id,
                amount: dec!(100),
                quantity: 1,
            }],
        )
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::InsufficientStock(_));
    assert_eq!(on_hand(&app, product.id).await, 1);
}

#[tokio::test]
async fn replace_of_unknown_order_is_not_found() {
    let app = setup().await;
    let product = seed_product(&app, "cuka", &[(TierName::Retail, dec!(100))]).await;

    let err = app
        .services
        .purchases
        .replace_items(
            Uuid::new_v4(),
            dec!(100),
            vec![PurchaseLineInput {
                product_id: product.id,
                amount: dec!(100),
                quantity: 1,
            }],
        )
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::NotFound(_));
}
