// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Document-creation hooks.
//!
//! Called once per new `users/{id}` document by the hosting platform's
//! trigger, authenticated with the shared trigger token.

use crate::error::Result;
use crate::routes::callable::parse_body;
use crate::services::{OnboardingResult, OnboardingService};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/hooks/user-created", post(user_created))
}

/// Payload of the user-created hook.
///
/// Only the id is used; the account's fields are read back from the store
/// so a stale or redelivered payload cannot drive seeding.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserCreatedEvent {
    #[validate(length(min = 1, max = 128))]
    pub account_id: String,
}

async fn user_created(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<UserCreatedEvent>, JsonRejection>,
) -> Result<Json<OnboardingResult>> {
    let event = parse_body(body)?;
    tracing::info!(account_id = %event.account_id, "User created hook");

    let result = OnboardingService::new(state.store.clone(), state.config.jobs.clone())
        .seed_new_account(&event.account_id, Utc::now())
        .await?;
    Ok(Json(result))
}
