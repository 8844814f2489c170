// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Callable endpoints for authenticated clients.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::Tier;
use crate::services::{
    Authorizer, SubscriptionAccess, SubscriptionService, UpgradeResult, UpgradeVerification,
    UploadGate, UploadStatus,
};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// Callable routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/callable/validateSubscriptionAccess",
            post(validate_subscription_access),
        )
        .route("/callable/updateSubscription", post(update_subscription))
        .route("/callable/cancelSubscription", post(cancel_subscription))
        .route("/callable/recordUpload", post(record_upload))
        .route(
            "/callable/admin/upgradePremiumToProfessional",
            post(upgrade_premium_to_professional),
        )
        .route("/callable/admin/verifyUpgrade", post(verify_upgrade))
}

fn subscription_service(state: &AppState) -> SubscriptionService {
    SubscriptionService::new(
        state.store.clone(),
        state.payments.clone(),
        state.config.jobs.clone(),
    )
}

/// Unwrap a JSON body, reporting malformed input as `invalid-argument`.
pub(crate) fn parse_body<T: Validate>(body: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    let Json(value) = body.map_err(|e| AppError::InvalidArgument(e.body_text()))?;
    value
        .validate()
        .map_err(|e| AppError::InvalidArgument(e.to_string()))?;
    Ok(value)
}

// ─── Subscriptions ───────────────────────────────────────────

async fn validate_subscription_access(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<SubscriptionAccess>> {
    let access = subscription_service(&state)
        .validate_access(&user.account_id, Utc::now())
        .await?;
    Ok(Json(access))
}

/// Subscription change request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubscriptionRequest {
    pub tier: Tier,
    #[validate(length(min = 1, max = 256))]
    pub payment_id: String,
}

#[derive(Serialize)]
struct SuccessResponse {
    success: bool,
}

async fn update_subscription(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    body: std::result::Result<Json<UpdateSubscriptionRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>> {
    let request = parse_body(body)?;
    subscription_service(&state)
        .update_subscription(&user.account_id, request.tier, &request.payment_id, Utc::now())
        .await?;
    Ok(Json(SuccessResponse { success: true }))
}

async fn cancel_subscription(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<SuccessResponse>> {
    subscription_service(&state)
        .cancel_subscription(&user.account_id)
        .await?;
    Ok(Json(SuccessResponse { success: true }))
}

// ─── Uploads ─────────────────────────────────────────────────

async fn record_upload(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UploadStatus>> {
    let status = UploadGate::new(state.store.clone(), state.config.jobs.clone())
        .record_upload(&user.account_id, Utc::now())
        .await?;
    Ok(Json(status))
}

// ─── Admin ───────────────────────────────────────────────────

async fn upgrade_premium_to_professional(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UpgradeResult>> {
    Authorizer::new(state.store.clone())
        .require_admin(&user.account_id)
        .await?;
    tracing::info!(admin = %user.account_id, "Starting premium to professional upgrade");

    let result = subscription_service(&state)
        .upgrade_premium_to_professional(Utc::now())
        .await?;
    Ok(Json(result))
}

async fn verify_upgrade(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UpgradeVerification>> {
    Authorizer::new(state.store.clone())
        .require_admin(&user.account_id)
        .await?;

    let verification = subscription_service(&state).verify_upgrade(Utc::now()).await?;
    Ok(Json(verification))
}
