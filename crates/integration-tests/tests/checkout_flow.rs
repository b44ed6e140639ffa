//! Feasibility, order commit and payment callbacks over HTTP.

#![allow(clippy::unwrap_used)]

use stockroom_client::ClientError;
use stockroom_core::{
    CreateOrderRequest, Infeasibility, LineRequest, OrderStatus, PaymentMethod, PaymentStatus,
    ProductId, Quantity, UserId,
};
use stockroom_integration_tests::{TestApp, recipient};

fn line(product_id: ProductId, quantity: i32) -> LineRequest {
    LineRequest {
        product_id,
        quantity: Quantity::new(quantity).unwrap(),
    }
}

fn order(lines: Vec<LineRequest>) -> CreateOrderRequest {
    CreateOrderRequest {
        lines,
        recipient: recipient(),
        payment_method: PaymentMethod::Online,
    }
}

#[tokio::test]
async fn test_check_order_and_failed_payment_round_trip() {
    let app = TestApp::spawn().await;
    let api = app.api();
    let a = app.product("Enamel mug", 5, 3).await;

    let results = api.check_feasibility(&[line(a.id, 3)]).await.unwrap();
    assert!(results.first().unwrap().can_be_ordered);

    let results = api.check_feasibility(&[line(a.id, 4)]).await.unwrap();
    let result = results.first().unwrap();
    assert!(!result.can_be_ordered);
    assert_eq!(
        result.reason,
        Some(Infeasibility::ExceededMaxOrderQuantity { limit: 3 })
    );

    let receipt = api.create_order(&order(vec![line(a.id, 3)])).await.unwrap();
    assert_eq!(receipt.status, OrderStatus::Placed);
    assert_eq!(app.stock(a.id).await, 2);

    let (status, body) = app.callback(PaymentStatus::Failure, receipt.order_id).await;
    assert_eq!(status, 200);
    assert_eq!(body["outcome"], "stock_restored");
    assert_eq!(app.stock(a.id).await, 5);

    let view = api.order(receipt.order_id).await.unwrap();
    let history: Vec<OrderStatus> = view.history.iter().map(|e| e.status).collect();
    assert_eq!(
        history,
        vec![
            OrderStatus::Placed,
            OrderStatus::PaymentFailed,
            OrderStatus::StockRestored
        ]
    );
    assert!(view.stock_restored_at.is_some());
    assert!(!view.is_paid);
}

#[tokio::test]
async fn test_order_is_all_or_nothing() {
    let app = TestApp::spawn().await;
    let api = app.api();
    let a = app.product("Scarce", 3, 10).await;
    let b = app.product("Plenty", 10, 10).await;

    let err = api
        .create_order(&order(vec![line(a.id, 5), line(b.id, 1)]))
        .await
        .unwrap_err();

    let ClientError::CommitViolation(violation) = err else {
        panic!("expected a commit violation, got {err:?}");
    };
    assert_eq!(violation.results.len(), 1);
    let offending = violation.results.first().unwrap();
    assert_eq!(offending.product_id, a.id);
    assert_eq!(
        offending.reason,
        Some(Infeasibility::InsufficientStock { limit: 3 })
    );

    assert_eq!(app.stock(a.id).await, 3);
    assert_eq!(app.stock(b.id).await, 10);
    assert_eq!(app.store.order_count().await, 0);
}

#[tokio::test]
async fn test_stale_check_is_caught_at_commit() {
    let app = TestApp::spawn().await;
    let api = app.api();
    let a = app.product("Last few", 2, 5).await;

    let results = api.check_feasibility(&[line(a.id, 2)]).await.unwrap();
    assert!(results.first().unwrap().can_be_ordered);

    // Another shopper buys one in between.
    app.api()
        .create_order(&order(vec![line(a.id, 1)]))
        .await
        .unwrap();

    let err = api
        .create_order(&order(vec![line(a.id, 2)]))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::CommitViolation(_)));
    assert_eq!(app.stock(a.id).await, 1);
}

#[tokio::test]
async fn test_restoration_is_exact_despite_unrelated_sales() {
    let app = TestApp::spawn().await;
    let api = app.api();
    let a = app.product("A", 10, 5).await;
    let b = app.product("B", 10, 5).await;

    let first = api
        .create_order(&order(vec![line(a.id, 3), line(b.id, 2)]))
        .await
        .unwrap();
    api.create_order(&order(vec![line(a.id, 1)])).await.unwrap();
    assert_eq!(app.stock(a.id).await, 6);
    assert_eq!(app.stock(b.id).await, 8);

    app.callback(PaymentStatus::Cancel, first.order_id).await;

    assert_eq!(app.stock(a.id).await, 9);
    assert_eq!(app.stock(b.id).await, 10);
}

#[tokio::test]
async fn test_duplicate_failure_callback_restores_once() {
    let app = TestApp::spawn().await;
    let api = app.api();
    let a = app.product("Mug", 5, 5).await;
    let receipt = api.create_order(&order(vec![line(a.id, 2)])).await.unwrap();

    let (_, first) = app.callback(PaymentStatus::Failure, receipt.order_id).await;
    let (status, second) = app.callback(PaymentStatus::Failure, receipt.order_id).await;
    let (_, third) = app.callback(PaymentStatus::Cancel, receipt.order_id).await;

    assert_eq!(first["outcome"], "stock_restored");
    assert_eq!(status, 200);
    assert_eq!(second["outcome"], "already_restored");
    assert_eq!(third["outcome"], "already_restored");
    assert_eq!(app.stock(a.id).await, 5);
}

#[tokio::test]
async fn test_paid_order_is_never_restored() {
    let app = TestApp::spawn().await;
    let api = app.api();
    let a = app.product("Mug", 5, 5).await;
    let receipt = api.create_order(&order(vec![line(a.id, 2)])).await.unwrap();

    let (_, paid) = app.callback(PaymentStatus::Success, receipt.order_id).await;
    let (_, again) = app.callback(PaymentStatus::AlreadyPaid, receipt.order_id).await;
    let (status, late_cancel) = app.callback(PaymentStatus::Cancel, receipt.order_id).await;

    assert_eq!(paid["outcome"], "paid");
    assert_eq!(again["outcome"], "already_paid");
    assert_eq!(status, 200);
    assert_eq!(late_cancel["outcome"], "order_paid");
    assert_eq!(app.stock(a.id).await, 3);
    assert!(api.order(receipt.order_id).await.unwrap().is_paid);
}

#[tokio::test]
async fn test_callback_for_unknown_order_is_acknowledged() {
    let app = TestApp::spawn().await;
    let a = app.product("Mug", 5, 5).await;

    let (status, body) = app
        .callback(PaymentStatus::Failure, stockroom_core::OrderId::new(999))
        .await;

    assert_eq!(status, 200);
    assert_eq!(body["outcome"], "unknown_order");
    assert_eq!(app.stock(a.id).await, 5);
}

#[tokio::test]
async fn test_malformed_callback_is_rejected() {
    let app = TestApp::spawn().await;
    let (status, body) = app.post_callback(b"not base64!".to_vec(), false).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "invalid_callback");
}

#[tokio::test]
async fn test_unsigned_callback_rejected_when_secret_configured() {
    let app = TestApp::spawn_with_callback_secret().await;
    let api = app.api();
    let a = app.product("Mug", 5, 5).await;
    let receipt = api.create_order(&order(vec![line(a.id, 2)])).await.unwrap();

    let body = stockroom_core::PaymentCallback {
        status: PaymentStatus::Failure,
        order_id: receipt.order_id,
    }
    .encode()
    .unwrap()
    .into_bytes();

    let (status, _) = app.post_callback(body.clone(), false).await;
    assert_eq!(status, 401);
    assert_eq!(app.stock(a.id).await, 3);

    let (status, json) = app.post_callback(body, true).await;
    assert_eq!(status, 200);
    assert_eq!(json["outcome"], "stock_restored");
    assert_eq!(app.stock(a.id).await, 5);
}

#[tokio::test]
async fn test_orders_are_private_to_their_owner() {
    let app = TestApp::spawn().await;
    let a = app.product("Mug", 5, 5).await;

    let owner = app.api();
    app.login(&owner, UserId::new(1)).await;
    let receipt = owner.create_order(&order(vec![line(a.id, 1)])).await.unwrap();
    assert_eq!(owner.order(receipt.order_id).await.unwrap().user_id, Some(UserId::new(1)));

    let stranger = app.api();
    app.login(&stranger, UserId::new(2)).await;
    let err = stranger.order(receipt.order_id).await.unwrap_err();
    assert!(matches!(err, ClientError::NotFound(_)));
}

#[tokio::test]
async fn test_anonymous_orders_are_private_to_their_session() {
    let app = TestApp::spawn().await;
    let a = app.product("Mug", 5, 5).await;

    let shopper = app.api();
    let receipt = shopper
        .create_order(&order(vec![line(a.id, 1)]))
        .await
        .unwrap();
    let view = shopper.order(receipt.order_id).await.unwrap();
    assert_eq!(view.user_id, None);
    assert_eq!(view.recipient.email, "ada@example.com");

    let stranger = app.api();
    let err = stranger.order(receipt.order_id).await.unwrap_err();
    assert!(matches!(err, ClientError::NotFound(_)));

    app.login(&stranger, UserId::new(2)).await;
    let err = stranger.order(receipt.order_id).await.unwrap_err();
    assert!(matches!(err, ClientError::NotFound(_)));
}

#[tokio::test]
async fn test_invalid_order_is_a_data_rejection() {
    let app = TestApp::spawn().await;
    let api = app.api();
    let a = app.product("Mug", 5, 5).await;

    let err = api
        .create_order(&order(vec![line(a.id, 1), line(a.id, 2)]))
        .await
        .unwrap_err();

    assert!(err.is_data_rejection());
    assert_eq!(app.stock(a.id).await, 5);
}
