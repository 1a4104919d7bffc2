//! API integration tests against a running server.
//!
//! Expects a server on localhost:5000 using the default JWT secret, a
//! seeded book with id 1 and a student with registration number "S1".

use chrono::{Duration, Utc};
use reqwest::Client;
use serde_json::{json, Value};

use booknexus_server::models::{Role, UserClaims};

const BASE_URL: &str = "http://localhost:5000/api/v1";
const SECRET: &str = "change-this-secret-in-production";

fn bearer(user_id: i32, role: Role) -> String {
    let now = Utc::now();
    let token = UserClaims {
        sub: user_id.to_string(),
        user_id,
        role,
        exp: (now + Duration::hours(1)).timestamp(),
        iat: now.timestamp(),
    }
    .create_token(SECRET)
    .expect("Failed to sign token");
    format!("Bearer {}", token)
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_ready() {
    let client = Client::new();

    let response = client
        .get(format!("{}/ready", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
}

#[tokio::test]
#[ignore]
async fn test_checkout_requires_token() {
    let client = Client::new();

    let response = client
        .post(format!("{}/books/1/checkout", BASE_URL))
        .json(&json!({ "registration_number": "S1" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_checkout_then_return() {
    let client = Client::new();
    let auth = bearer(1, Role::Admin);

    let response = client
        .post(format!("{}/books/1/checkout", BASE_URL))
        .header("Authorization", &auth)
        .json(&json!({ "registration_number": "S1" }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["student"]["registration_number"], "S1");
    let after_checkout = body["book"]["available_copies"].as_i64().unwrap();

    let response = client
        .put(format!("{}/books/1/return", BASE_URL))
        .header("Authorization", &auth)
        .json(&json!({ "registration_number": "S1" }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["book"]["available_copies"].as_i64().unwrap(), after_checkout + 1);
}

#[tokio::test]
#[ignore]
async fn test_active_checkouts() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books/active-checkouts", BASE_URL))
        .header("Authorization", bearer(1, Role::Admin))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["pending_count"].is_number());
    assert!(body["checkouts"].is_array());
}

#[tokio::test]
#[ignore]
async fn test_unknown_student() {
    let client = Client::new();

    let response = client
        .post(format!("{}/books/1/checkout", BASE_URL))
        .header("Authorization", bearer(1, Role::Admin))
        .json(&json!({ "registration_number": "NO-SUCH-STUDENT" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["message"], "Student not found with this registration number");
}
