//! Registration over a real socket.

use reqwest::StatusCode;
use serde_json::{json, Value};

use user_service::config::ShutdownConfig;
use user_service::http::REGISTER_USER_PATH;

mod common;

fn anna() -> Value {
    json!({
        "email": "anna@example.com",
        "public_name": "anna",
        "password": "Sicilian#1",
        "country_code": "NO",
        "language": "en"
    })
}

#[tokio::test]
async fn test_register_user_lifecycle() {
    let service = common::start(ShutdownConfig::default()).await;
    let client = common::client();

    let res = client.get(service.url("/healthz")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));

    let res = client
        .post(service.url(REGISTER_USER_PATH))
        .json(&anna())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "User successfully registered.");
    assert_eq!(service.store.len(), 1);

    let res = client
        .post(service.url(REGISTER_USER_PATH))
        .json(&anna())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "ALREADY_EXISTS");

    let res = client
        .post(service.url(REGISTER_USER_PATH))
        .json(&json!({
            "email": "bob@example.com",
            "public_name": "b",
            "password": "short",
            "language": "en"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert!(body["details"]["public_name"].is_string());
    assert!(body["details"]["password"].is_string());

    service.trigger.request_shutdown();
    let report = service.task.await.unwrap().unwrap();
    assert!(report.failed_resources.is_empty());
    assert!(service.store.is_closed());
    assert_eq!(service.tracker.active_count(), 0);
}
