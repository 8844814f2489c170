// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! The shape shared by every maintenance job.
//!
//! A job names a collection and a set of field filters, and plans the
//! writes for each matching document. [`JobRunner`](super::JobRunner) does
//! the rest: scanning, exemptions, bounded concurrency, batching, commit,
//! and reporting.

use crate::config::JobSettings;
use crate::db::{CollectionPath, Document, DocumentStore, FieldFilter, Write};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;

/// Per-run state handed to every plan.
pub struct JobContext {
    /// Time the run started. Every cutoff in the run derives from this.
    pub now: DateTime<Utc>,
    /// Admin accounts, loaded once per run. Their documents are never planned.
    pub exempt_accounts: HashSet<String>,
    pub store: Arc<dyn DocumentStore>,
    pub settings: JobSettings,
}

impl JobContext {
    pub fn is_exempt(&self, account_id: &str) -> bool {
        self.exempt_accounts.contains(account_id)
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }
}

/// Decision for one document.
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    /// Not eligible; nothing to write.
    Skip(String),
    /// Writes to stage for this document.
    Stage(Vec<Write>),
}

impl Plan {
    pub fn skip(reason: impl Into<String>) -> Self {
        Plan::Skip(reason.into())
    }
}

/// How planned writes are committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitScope {
    /// All plans share one accumulator. Each plan is one atomic unit.
    Shared,
    /// Each document's writes are committed on their own, so one document's
    /// commit failure does not affect the others.
    PerDocument,
}

/// What a per-document error does to the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log it, count it, keep going.
    Isolate,
    /// Fail the run without committing shared writes.
    Abort,
}

/// One canonical maintenance job.
#[async_trait]
pub trait Reconciliation: Send + Sync {
    fn name(&self) -> &'static str;

    /// Collection whose documents are planned.
    fn collection(&self) -> CollectionPath;

    /// Eligibility filters pushed down to the store.
    fn filters(&self, _ctx: &JobContext) -> Vec<FieldFilter> {
        Vec::new()
    }

    fn commit_scope(&self) -> CommitScope {
        CommitScope::Shared
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::Isolate
    }

    /// Decide what to write for one document. Writes must be idempotent:
    /// absolute values only, so a re-run after a partial commit converges.
    async fn plan(&self, ctx: &JobContext, doc: &Document) -> Result<Plan>;
}
