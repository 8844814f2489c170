// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calorie tracker backend: scheduled reconciliation jobs, account hooks, and
//! subscription callables over a document store.
//!
//! Every job is one [`jobs::Reconciliation`] driven by [`jobs::JobRunner`],
//! which scans a collection, plans writes per document on a bounded worker
//! pool, and commits them through the batch accumulator.

pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod scheduler;
pub mod services;
pub mod time_utils;

use config::Config;
use db::DocumentStore;
use jobs::JobRunner;
use services::PaymentProcessor;
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn DocumentStore>,
    pub payments: Arc<dyn PaymentProcessor>,
    pub runner: Arc<JobRunner>,
}

impl AppState {
    /// Wire the runner to the same store, processor, and settings.
    pub fn new(
        config: Config,
        store: Arc<dyn DocumentStore>,
        payments: Arc<dyn PaymentProcessor>,
    ) -> Self {
        let runner = Arc::new(JobRunner::new(
            store.clone(),
            payments.clone(),
            config.jobs.clone(),
        ));
        Self {
            config,
            store,
            payments,
            runner,
        }
    }
}
