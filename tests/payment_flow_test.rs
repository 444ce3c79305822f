mod common;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use toko_api::{
    entities::{payment_transaction::PaymentStatus, price_tier::TierName},
    errors::ServiceError,
    services::picks::{CreatePickRequest, PickItemInput},
};
use uuid::Uuid;

use common::{seed_product, seed_route, setup, TestApp};

/// Opens a payment of 400 (4 x 100) through the pick engine.
async fn open_payment(app: &TestApp) -> Uuid {
    let product = seed_product(app, "sarden", &[(TierName::Retail, dec!(100))]).await;
    let route_id = seed_route(app, "pasar induk").await;
    app.services.stock.receive(product.id, 10).await.unwrap();

    let created = app
        .services
        .picks
        .create(CreatePickRequest {
            user_id: Uuid::new_v4(),
            route_id,
            items: vec![PickItemInput {
                line_id: None,
                product_id: product.id,
                quantity: 4,
                tier: TierName::Retail,
            }],
        })
        .await
        .unwrap();

    created.payment_id
}

#[tokio::test]
async fn installments_walk_the_status_ladder() {
    let app = setup().await;
    let payment_id = open_payment(&app).await;

    let after_first = app
        .services
        .payments
        .add_installment(payment_id, dec!(150))
        .await
        .unwrap();
    assert_eq!(after_first.amount_paid, dec!(150));
    assert_eq!(after_first.shortfall, dec!(250));
    assert_eq!(after_first.status, PaymentStatus::PartiallyPaid.to_string());

    // 150 + 300 overshoots 400; the installment clamps at the total due.
    let after_second = app
        .services
        .payments
        .add_installment(payment_id, dec!(300))
        .await
        .unwrap();
    assert_eq!(after_second.amount_paid, dec!(400));
    assert_eq!(after_second.shortfall, dec!(0));
    assert_eq!(after_second.status, PaymentStatus::Paid.to_string());
}

#[tokio::test]
async fn non_positive_installments_are_rejected() {
    let app = setup().await;
    let payment_id = open_payment(&app).await;

    for amount in [dec!(0), dec!(-50)] {
        let err = app
            .services
            .payments
            .add_installment(payment_id, amount)
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(_));
    }
}

#[tokio::test]
async fn pay_in_full_settles_and_repeats_are_rejected() {
    let app = setup().await;
    let payment_id = open_payment(&app).await;

    app.services
        .payments
        .add_installment(payment_id, dec!(100))
        .await
        .unwrap();

    let settled = app.services.payments.pay_in_full(payment_id).await.unwrap();
    assert_eq!(settled.amount_paid, dec!(400));
    assert_eq!(settled.shortfall, dec!(0));
    assert_eq!(settled.status, PaymentStatus::Paid.to_string());

    let err = app.services.payments.pay_in_full(payment_id).await.unwrap_err();
    assert_matches!(err, ServiceError::AlreadyPaid(id) if id == payment_id);
}

#[tokio::test]
async fn record_payment_allows_overpayment() {
    let app = setup().await;
    let payment_id = open_payment(&app).await;

    let overpaid = app
        .services
        .payments
        .record_payment(payment_id, dec!(500))
        .await
        .unwrap();
    assert_eq!(overpaid.amount_paid, dec!(500));
    assert_eq!(overpaid.shortfall, dec!(0));
    assert_eq!(overpaid.status, PaymentStatus::Paid.to_string());
}

#[tokio::test]
async fn record_payment_applies_negative_corrections() {
    let app = setup().await;
    let payment_id = open_payment(&app).await;

    app.services
        .payments
        .record_payment(payment_id, dec!(500))
        .await
        .unwrap();

    let corrected = app
        .services
        .payments
        .record_payment(payment_id, dec!(-200))
        .await
        .unwrap();
    assert_eq!(corrected.amount_paid, dec!(300));
    assert_eq!(corrected.shortfall, dec!(100));
    assert_eq!(corrected.status, PaymentStatus::PartiallyPaid.to_string());
}

#[tokio::test]
async fn unknown_payment_is_not_found() {
    let app = setup().await;

    let err = app
        .services
        .payments
        .pay_in_full(Uuid::new_v4())
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::NotFound(_));
}
