// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tests for the trigger endpoints (`/jobs/*` and `/hooks/*`).

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use calorie_tracker::db::{usage_limit_doc, user_doc};
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{create_test_app, json_body, trigger};

// ═══════════════════════════════════════════════════════════════════════════
// TRIGGER TOKEN
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_trigger_without_token_forbidden() {
    let (app, _, store) = create_test_app();
    store.seed(&usage_limit_doc("u1"), &json!({"count": 3}));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/jobs/usage_counter_reset")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(store.document(&usage_limit_doc("u1")).unwrap()["count"], 3);
}

#[tokio::test]
async fn test_trigger_with_wrong_token_forbidden() {
    let (app, _, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/hooks/user-created")
                .header("x-trigger-token", "test_trigger_tokem")
                .header("content-type", "application/json")
                .body(Body::from(json!({"accountId": "u1"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_callable_token_does_not_open_triggers() {
    let (app, _, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/jobs/usage_counter_reset")
                .header("authorization", common::bearer("u1"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ═══════════════════════════════════════════════════════════════════════════
// JOBS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_run_job_returns_report() {
    let (app, _, store) = create_test_app();
    store.seed(&usage_limit_doc("u1"), &json!({"count": 3, "maxDaily": 8}));
    store.seed(&usage_limit_doc("u2"), &json!({"count": 8, "maxDaily": 8}));

    let response = app
        .oneshot(trigger("/jobs/usage_counter_reset", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let report = json_body(response).await;
    assert_eq!(report["job"], "usage_counter_reset");
    assert_eq!(report["status"], "completed");
    assert_eq!(report["scanned"], 2);
    assert_eq!(report["staged"], 2);
    assert_eq!(report["operations"], 2);
    assert_eq!(report["groups"], 1);
    assert!(report.get("error").is_none());
    for id in ["u1", "u2"] {
        assert_eq!(store.document(&usage_limit_doc(id)).unwrap()["count"], 0);
    }
}

#[tokio::test]
async fn test_unknown_job_not_found() {
    let (app, _, _) = create_test_app();

    let response = app
        .oneshot(trigger("/jobs/drop_all_users", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "not-found");
}

#[tokio::test]
async fn test_every_job_runs_on_empty_store() {
    let (app, _, _) = create_test_app();

    for kind in calorie_tracker::jobs::JobKind::ALL {
        let response = app
            .clone()
            .oneshot(trigger(&format!("/jobs/{kind}"), json!({})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK, "{kind}");
        let report = json_body(response).await;
        assert_eq!(report["status"], "completed", "{kind}");
        assert_eq!(report["scanned"], 0, "{kind}");
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// USER-CREATED HOOK
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_user_created_seeds_free_trial() {
    let (app, _, store) = create_test_app();
    let account = json!({"email": "new@example.com", "subscription": {"tier": "free"}});
    store.seed(&user_doc("new"), &account);

    let response = app
        .oneshot(trigger(
            "/hooks/user-created",
            json!({"accountId": "new", "account": account}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["usageRecordSeeded"], true);
    assert_eq!(body["trialStarted"], true);

    let usage = store.document(&usage_limit_doc("new")).unwrap();
    assert_eq!(usage["count"], 0);
    assert_eq!(usage["maxDaily"], 3);
    let user = store.document(&user_doc("new")).unwrap();
    assert_eq!(user["maxPhotoUploadsPerDay"], 3);
    assert!(user.contains_key("freeTrialPhotoUploadsEndDate"));
    let notes = store.documents(&user_doc("new").subcollection("notifications"));
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].data["type"], "trial_started");
}

#[tokio::test]
async fn test_user_created_redelivery_starts_no_second_trial() {
    let (app, _, store) = create_test_app();
    store.seed(
        &user_doc("new"),
        &json!({"email": "new@example.com", "subscription": {"tier": "free"}}),
    );

    let first = app
        .clone()
        .oneshot(trigger("/hooks/user-created", json!({"accountId": "new"})))
        .await
        .unwrap();
    assert_eq!(json_body(first).await["trialStarted"], true);
    let user_after_first = store.document(&user_doc("new"));

    let second = app
        .oneshot(trigger("/hooks/user-created", json!({"accountId": "new"})))
        .await
        .unwrap();

    assert_eq!(second.status(), StatusCode::OK);
    let body = json_body(second).await;
    assert_eq!(body["usageRecordSeeded"], false);
    assert_eq!(body["trialStarted"], false);
    assert_eq!(store.document(&user_doc("new")), user_after_first);
    let notes = store.documents(&user_doc("new").subcollection("notifications"));
    assert_eq!(notes.len(), 1);
}

#[tokio::test]
async fn test_user_created_for_admin_seeds_nothing() {
    let (app, _, store) = create_test_app();
    let account = json!({"email": "boss@example.com", "role": "admin"});
    store.seed(&user_doc("boss"), &account);

    let response = app
        .oneshot(trigger(
            "/hooks/user-created",
            json!({"accountId": "boss", "account": account}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["usageRecordSeeded"], false);
    assert!(store.document(&usage_limit_doc("boss")).is_none());
}

#[tokio::test]
async fn test_user_created_requires_account_id() {
    let (app, _, _) = create_test_app();

    let response = app
        .oneshot(trigger("/hooks/user-created", json!({"accountId": ""})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "invalid-argument");
}
