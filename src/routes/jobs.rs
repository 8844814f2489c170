// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! On-demand job triggers for external schedulers.

use crate::error::{AppError, Result};
use crate::jobs::{JobKind, JobReport};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/jobs/{name}", post(run_job))
}

/// Run one job to completion and return its report.
///
/// A failed run still answers 200; the report's `status` says what happened.
async fn run_job(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<JobReport>> {
    let kind: JobKind = name
        .parse()
        .map_err(|_| AppError::NotFound(format!("Unknown job: {name}")))?;

    tracing::info!(job = %kind, "Job triggered over HTTP");
    Ok(Json(state.runner.run_kind(kind).await))
}
