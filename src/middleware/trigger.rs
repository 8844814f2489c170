// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared-secret guard for scheduler and document-hook endpoints.

use crate::AppState;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Header carrying the trigger secret.
pub const TRIGGER_TOKEN_HEADER: &str = "x-trigger-token";

/// Require `x-trigger-token` to match the configured secret.
pub async fn require_trigger_token(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let provided = request
        .headers()
        .get(TRIGGER_TOKEN_HEADER)
        .map(|h| h.as_bytes())
        .unwrap_or_default();
    let expected = state.config.trigger_token.as_bytes();

    // An empty configured secret never authorizes anything.
    let valid = !expected.is_empty() && bool::from(provided.ct_eq(expected));
    if !valid {
        tracing::warn!(
            path = %request.uri().path(),
            header_present = !provided.is_empty(),
            "Blocked trigger request with invalid token"
        );
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(next.run(request).await)
}
