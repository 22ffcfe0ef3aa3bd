//! Accrual client taxonomy tests against an in-process stub server.

use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use rust_decimal_macros::dec;
use std::future::IntoFuture;

use bonusd::client::{AccrualApi, AccrualClient, AccrualStatus, ClientError};

async fn stub_get_order(Path(number): Path<String>) -> axum::response::Response {
    match number.as_str() {
        "processed" => Json(serde_json::json!({
            "order": "processed",
            "status": "PROCESSED",
            "accrual": 1500.5
        }))
        .into_response(),
        "registered" => Json(serde_json::json!({
            "order": "registered",
            "status": "REGISTERED"
        }))
        .into_response(),
        "unknown" => StatusCode::NO_CONTENT.into_response(),
        "limited" => (StatusCode::TOO_MANY_REQUESTS, [("Retry-After", "30")]).into_response(),
        "down" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn stub_register(Json(body): Json<serde_json::Value>) -> StatusCode {
    match body["order"].as_str() {
        Some("taken") => StatusCode::CONFLICT,
        Some(_) => StatusCode::ACCEPTED,
        None => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

async fn spawn_stub() -> String {
    let app = Router::new()
        .route("/api/orders/{number}", get(stub_get_order))
        .route("/api/orders", post(stub_register));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(axum::serve(listener, app).into_future());

    format!("http://{addr}")
}

#[tokio::test]
async fn successful_poll_parses_status_and_amount() {
    let base = spawn_stub().await;
    let client = AccrualClient::new(base).unwrap();

    let resp = client.get_order("processed").await.unwrap();
    assert_eq!(resp.status, AccrualStatus::Processed);
    assert_eq!(resp.accrual, Some(dec!(1500.5)));

    let resp = client.get_order("registered").await.unwrap();
    assert_eq!(resp.status, AccrualStatus::Registered);
    assert_eq!(resp.accrual, None);
}

#[tokio::test]
async fn no_content_maps_to_not_registered() {
    let base = spawn_stub().await;
    let client = AccrualClient::new(base).unwrap();

    let err = client.get_order("unknown").await.unwrap_err();
    assert!(matches!(err, ClientError::OrderNotRegistered));
}

#[tokio::test]
async fn rate_limit_carries_the_retry_after_header() {
    let base = spawn_stub().await;
    let client = AccrualClient::new(base).unwrap();

    let err = client.get_order("limited").await.unwrap_err();
    match err {
        ClientError::RateLimitExceeded { retry_after } => {
            assert_eq!(retry_after, std::time::Duration::from_secs(30));
        }
        other => panic!("expected RateLimitExceeded, got {other:?}"),
    }
}

#[tokio::test]
async fn server_errors_map_to_unavailable() {
    let base = spawn_stub().await;
    let client = AccrualClient::new(base).unwrap();

    let err = client.get_order("down").await.unwrap_err();
    assert!(matches!(err, ClientError::Unavailable));
}

#[tokio::test]
async fn other_statuses_are_the_generic_failure() {
    let base = spawn_stub().await;
    let client = AccrualClient::new(base).unwrap();

    let err = client.get_order("whatever").await.unwrap_err();
    assert!(matches!(err, ClientError::UnexpectedStatus(404)));
}

#[tokio::test]
async fn transport_failure_maps_to_unavailable() {
    // nothing listens on this port
    let client = AccrualClient::new("http://127.0.0.1:1").unwrap();

    let err = client.get_order("processed").await.unwrap_err();
    assert!(matches!(err, ClientError::Unavailable));
}

#[tokio::test]
async fn register_order_tolerates_200_and_202() {
    let base = spawn_stub().await;
    let client = AccrualClient::new(base).unwrap();

    client.register_order("fresh").await.unwrap();

    let err = client.register_order("taken").await.unwrap_err();
    assert!(matches!(err, ClientError::UnexpectedStatus(409)));
}
