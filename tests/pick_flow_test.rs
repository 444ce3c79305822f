mod common;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use sea_orm::{EntityTrait, PaginatorTrait};
use std::sync::Arc;
use toko_api::{
    entities::{
        payment_transaction::PaymentStatus, pick_transaction::Entity as PickTransaction,
        price_tier::TierName,
    },
    errors::ServiceError,
    services::picks::{CreatePickRequest, PickItemInput, UpdatePickRequest},
};
use uuid::Uuid;

use common::{on_hand, seed_product, seed_route, setup, setup_with_policy, DenyAll};

fn item(product_id: Uuid, quantity: i32, tier: TierName) -> PickItemInput {
    PickItemInput {
        line_id: None,
        product_id,
        quantity,
        tier,
    }
}

#[tokio::test]
async fn create_decrements_stock_and_opens_unpaid_payment() {
    let app = setup().await;
    let product = seed_product(&app, "kerupuk", &[(TierName::Retail, dec!(100))]).await;
    let route_id = seed_route(&app, "pasar timur").await;
    app.services.stock.receive(product.id, 10).await.unwrap();

    let user_id = Uuid::new_v4();
    let created = app
        .services
        .picks
        .create(CreatePickRequest {
            user_id,
            route_id,
            items: vec![item(product.id, 4, TierName::Retail)],
        })
        .await
        .unwrap();

    assert_eq!(created.transaction.total, dec!(400));
    assert!(!created.transaction.is_confirmed);
    assert_eq!(created.transaction.items.len(), 1);
    assert_eq!(created.transaction.items[0].unit_price, dec!(100));
    assert_eq!(on_hand(&app, product.id).await, 6);

    let payment = app.services.payments.get(created.payment_id).await.unwrap();
    assert_eq!(payment.total_due, dec!(400));
    assert_eq!(payment.amount_paid, dec!(0));
    assert_eq!(payment.shortfall, dec!(400));
    assert_eq!(payment.status, PaymentStatus::Unpaid.to_string());
    assert_eq!(payment.items.len(), 1);
    assert_eq!(payment.items[0].subtotal, dec!(400));
}

#[tokio::test]
async fn insufficient_stock_aborts_the_whole_pick() {
    let app = setup().await;
    let product = seed_product(&app, "teh botol", &[(TierName::Retail, dec!(50))]).await;
    let route_id = seed_route(&app, "pasar barat").await;
    app.services.stock.receive(product.id, 3).await.unwrap();

    let err = app
        .services
        .picks
        .create(CreatePickRequest {
            user_id: Uuid::new_v4(),
            route_id,
            items: vec![item(product.id, 5, TierName::Retail)],
        })
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::InsufficientStock(_));
    assert_eq!(on_hand(&app, product.id).await, 3);

    let count = PickTransaction::find().count(&*app.db).await.unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn missing_price_tier_falls_back_to_zero() {
    let app = setup().await;
    let product = seed_product(&app, "gula", &[(TierName::Retail, dec!(100))]).await;
    let route_id = seed_route(&app, "pasar utara").await;
    app.services.stock.receive(product.id, 5).await.unwrap();

    let created = app
        .services
        .picks
        .create(CreatePickRequest {
            user_id: Uuid::new_v4(),
            route_id,
            items: vec![item(product.id, 2, TierName::Factory)],
        })
        .await
        .unwrap();

    assert_eq!(created.transaction.total, dec!(0));
    assert_eq!(on_hand(&app, product.id).await, 3);

    let payment = app.services.payments.get(created.payment_id).await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Unpaid.to_string());
    assert_eq!(payment.shortfall, dec!(0));
}

#[tokio::test]
async fn edit_restores_removed_lines_and_applies_deltas() {
    let app = setup().await;
    let p1 = seed_product(&app, "kopi", &[(TierName::Retail, dec!(100))]).await;
    let p2 = seed_product(&app, "susu", &[(TierName::Retail, dec!(200))]).await;
    let route_id = seed_route(&app, "pasar selatan").await;
    app.services.stock.receive(p1.id, 10).await.unwrap();
    app.services.stock.receive(p2.id, 10).await.unwrap();

    let user_id = Uuid::new_v4();
    let created = app
        .services
        .picks
        .create(CreatePickRequest {
            user_id,
            route_id,
            items: vec![
                item(p1.id, 2, TierName::Retail),
                item(p2.id, 2, TierName::Retail),
            ],
        })
        .await
        .unwrap();
    assert_eq!(on_hand(&app, p1.id).await, 8);
    assert_eq!(on_hand(&app, p2.id).await, 8);

    let p2_line = created
        .transaction
        .items
        .iter()
        .find(|l| l.product_id == p2.id)
        .unwrap();

    let updated = app
        .services
        .picks
        .update(
            created.transaction.id,
            UpdatePickRequest {
                user_id,
                route_id,
                items: vec![PickItemInput {
                    line_id: Some(p2_line.id),
                    product_id: p2.id,
                    quantity: 5,
                    tier: TierName::Retail,
                }],
            },
        )
        .await
        .unwrap();

    // The dropped p1 line gives its 2 back; p2 applies only the +3 delta.
    assert_eq!(on_hand(&app, p1.id).await, 10);
    assert_eq!(on_hand(&app, p2.id).await, 5);
    assert_eq!(updated.total, dec!(1000));
    assert_eq!(updated.items.len(), 1);

    let payment = app.services.payments.get(created.payment_id).await.unwrap();
    assert_eq!(payment.total_due, dec!(1000));
    assert_eq!(payment.shortfall, dec!(1000));
    assert_eq!(payment.items.len(), 1);
    assert_eq!(payment.items[0].quantity, 5);
}

#[tokio::test]
async fn edit_round_trip_leaves_stock_unchanged() {
    let app = setup().await;
    let product = seed_product(&app, "mie", &[(TierName::Retail, dec!(100))]).await;
    let route_id = seed_route(&app, "pasar lama").await;
    app.services.stock.receive(product.id, 10).await.unwrap();

    let user_id = Uuid::new_v4();
    let created = app
        .services
        .picks
        .create(CreatePickRequest {
            user_id,
            route_id,
            items: vec![item(product.id, 4, TierName::Retail)],
        })
        .await
        .unwrap();
    let line_id = created.transaction.items[0].id;

    for quantity in [7, 4] {
        app.services
            .picks
            .update(
                created.transaction.id,
                UpdatePickRequest {
                    user_id,
                    route_id,
                    items: vec![PickItemInput {
                        line_id: Some(line_id),
                        product_id: product.id,
                        quantity,
                        tier: TierName::Retail,
                    }],
                },
            )
            .await
            .unwrap();
    }

    assert_eq!(on_hand(&app, product.id).await, 6);
}

#[tokio::test]
async fn edit_rejects_changing_a_line_product() {
    let app = setup().await;
    let p1 = seed_product(&app, "roti", &[(TierName::Retail, dec!(100))]).await;
    let p2 = seed_product(&app, "keju", &[(TierName::Retail, dec!(300))]).await;
    let route_id = seed_route(&app, "pasar baru").await;
    app.services.stock.receive(p1.id, 10).await.unwrap();
    app.services.stock.receive(p2.id, 10).await.unwrap();

    let user_id = Uuid::new_v4();
    let created = app
        .services
        .picks
        .create(CreatePickRequest {
            user_id,
            route_id,
            items: vec![item(p1.id, 2, TierName::Retail)],
        })
        .await
        .unwrap();
    let line_id = created.transaction.items[0].id;

    let err = app
        .services
        .picks
        .update(
            created.transaction.id,
            UpdatePickRequest {
                user_id,
                route_id,
                items: vec![PickItemInput {
                    line_id: Some(line_id),
                    product_id: p2.id,
                    quantity: 2,
                    tier: TierName::Retail,
                }],
            },
        )
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::ProductImmutable(id) if id == line_id);
    assert_eq!(on_hand(&app, p1.id).await, 8);
}

#[tokio::test]
async fn confirm_decrements_again_and_repeats_are_declined() {
    let app = setup().await;
    let product = seed_product(&app, "sabun", &[(TierName::Retail, dec!(100))]).await;
    let route_id = seed_route(&app, "pasar pagi").await;
    app.services.stock.receive(product.id, 10).await.unwrap();

    let created = app
        .services
        .picks
        .create(CreatePickRequest {
            user_id: Uuid::new_v4(),
            route_id,
            items: vec![item(product.id, 3, TierName::Retail)],
        })
        .await
        .unwrap();
    assert_eq!(on_hand(&app, product.id).await, 7);

    let first = app.services.picks.confirm(created.transaction.id).await.unwrap();
    assert!(first.status);
    assert!(first.data.is_confirmed);
    assert_eq!(on_hand(&app, product.id).await, 4);

    let second = app.services.picks.confirm(created.transaction.id).await.unwrap();
    assert!(!second.status);
    assert_eq!(on_hand(&app, product.id).await, 4);
}

#[tokio::test]
async fn confirm_aborts_when_remaining_stock_is_insufficient() {
    let app = setup().await;
    let product = seed_product(&app, "lilin", &[(TierName::Retail, dec!(100))]).await;
    let route_id = seed_route(&app, "pasar kecil").await;
    app.services.stock.receive(product.id, 5).await.unwrap();

    let created = app
        .services
        .picks
        .create(CreatePickRequest {
            user_id: Uuid::new_v4(),
            route_id,
            items: vec![item(product.id, 4, TierName::Retail)],
        })
        .await
        .unwrap();
    assert_eq!(on_hand(&app, product.id).await, 1);

    // Only 1 left; the confirmation decrement needs 4 again.
    let err = app
        .services
        .picks
        .confirm(created.transaction.id)
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::InsufficientStock(_));
    assert_eq!(on_hand(&app, product.id).await, 1);

    let fetched = app.services.picks.get(created.transaction.id).await.unwrap();
    assert!(!fetched.is_confirmed);
}

#[tokio::test]
async fn confirmed_transactions_reject_edits() {
    let app = setup().await;
    let product = seed_product(&app, "garam", &[(TierName::Retail, dec!(50))]).await;
    let route_id = seed_route(&app, "pasar sore").await;
    app.services.stock.receive(product.id, 10).await.unwrap();

    let user_id = Uuid::new_v4();
    let created = app
        .services
        .picks
        .create(CreatePickRequest {
            user_id,
            route_id,
            items: vec![item(product.id, 2, TierName::Retail)],
        })
        .await
        .unwrap();
    app.services.picks.confirm(created.transaction.id).await.unwrap();

    let err = app
        .services
        .picks
        .update(
            created.transaction.id,
            UpdatePickRequest {
                user_id,
                route_id,
                items: vec![item(product.id, 1, TierName::Retail)],
            },
        )
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::AlreadyConfirmed(id) if id == created.transaction.id);
}

#[tokio::test]
async fn users_without_the_sales_role_are_forbidden() {
    let app = setup_with_policy(Arc::new(DenyAll)).await;
    let product = seed_product(&app, "minyak", &[(TierName::Retail, dec!(100))]).await;
    let route_id = seed_route(&app, "pasar malam").await;

    let err = app
        .services
        .picks
        .create(CreatePickRequest {
            user_id: Uuid::new_v4(),
            route_id,
            items: vec![item(product.id, 1, TierName::Retail)],
        })
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::Forbidden(_));
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let app = setup().await;
    let product = seed_product(&app, "beras", &[(TierName::Retail, dec!(100))]).await;
    app.services.stock.receive(product.id, 5).await.unwrap();

    let err = app
        .services
        .picks
        .create(CreatePickRequest {
            user_id: Uuid::new_v4(),
            route_id: Uuid::new_v4(),
            items: vec![item(product.id, 1, TierName::Retail)],
        })
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::NotFound(_));
    assert_eq!(on_hand(&app, product.id).await, 5);
}
