// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, Response};
use calorie_tracker::config::Config;
use calorie_tracker::db::{FirestoreDb, MemoryStore};
use calorie_tracker::middleware::auth::create_jwt;
use calorie_tracker::routes::create_router;
use calorie_tracker::services::UnverifiedPayments;
use calorie_tracker::AppState;
use serde_json::Value;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a test app over an in-memory store.
/// Returns the router, the shared state, and the store for seeding.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let state = Arc::new(AppState::new(
        Config::test_default(),
        store.clone(),
        Arc::new(UnverifiedPayments),
    ));

    (create_router(state.clone()), state, store)
}

/// Bearer token for `account_id`, signed with the test key.
#[allow(dead_code)]
pub fn bearer(account_id: &str) -> String {
    let token = create_jwt(
        account_id,
        Some(&format!("{account_id}@example.com")),
        &Config::test_default().jwt_signing_key,
    )
    .expect("Failed to create JWT");
    format!("Bearer {token}")
}

/// POST to a callable as `account_id`.
#[allow(dead_code)]
pub fn callable(path: &str, account_id: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header(header::AUTHORIZATION, bearer(account_id))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// POST to a trigger endpoint with the configured trigger token.
#[allow(dead_code)]
pub fn trigger(path: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("x-trigger-token", Config::test_default().trigger_token)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
