// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Drives a [`Reconciliation`] through scan, filter, stage, commit, and log.

use crate::config::JobSettings;
use crate::db::{
    BatchAccumulator, CollectionScanner, CommitSummary, DocPath, Document, DocumentStore, Write,
};
use crate::error::{AppError, Result};
use crate::jobs::{build_job, CommitScope, FailurePolicy, JobContext, JobKind, Plan, Reconciliation};
use crate::services::{Authorizer, PaymentProcessor};
use crate::time_utils::rfc3339;
use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};
use serde::Serialize;
use std::sync::Arc;

/// Terminal state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Completed,
    Failed,
}

/// Aggregate result of one run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport {
    pub job: &'static str,
    pub status: JobStatus,
    /// Documents returned by the scan
    pub scanned: usize,
    /// Documents whose writes were staged
    pub staged: usize,
    /// Documents skipped as ineligible or exempt
    pub skipped: usize,
    /// Paths of documents whose planning or commit failed
    pub failed_documents: Vec<String>,
    /// Writes actually committed
    pub operations: usize,
    /// Batch groups actually committed
    pub groups: usize,
    #[serde(with = "rfc3339")]
    pub started_at: DateTime<Utc>,
    #[serde(with = "rfc3339")]
    pub finished_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobReport {
    fn new(job: &'static str, started_at: DateTime<Utc>) -> Self {
        Self {
            job,
            status: JobStatus::Completed,
            scanned: 0,
            staged: 0,
            skipped: 0,
            failed_documents: Vec::new(),
            operations: 0,
            groups: 0,
            started_at,
            finished_at: started_at,
            error: None,
        }
    }

    fn add_committed(&mut self, summary: CommitSummary) {
        self.operations += summary.operations;
        self.groups += summary.groups;
    }

    /// Count what a failed multi-group commit already applied.
    fn add_partial(&mut self, err: &AppError) {
        if let AppError::PartialCommit {
            committed_groups,
            committed_operations,
            ..
        } = err
        {
            self.operations += committed_operations;
            self.groups += committed_groups;
        }
    }
}

/// What happened to one scanned document.
enum Outcome {
    Exempt,
    Skipped(String),
    /// Shared scope: writes waiting for the shared commit.
    Planned(Vec<Write>),
    /// Per-document scope: writes already committed.
    Committed(CommitSummary),
    Failed(AppError),
}

/// Runs maintenance jobs against the document store.
pub struct JobRunner {
    store: Arc<dyn DocumentStore>,
    payments: Arc<dyn PaymentProcessor>,
    settings: JobSettings,
}

impl JobRunner {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        payments: Arc<dyn PaymentProcessor>,
        settings: JobSettings,
    ) -> Self {
        Self {
            store,
            payments,
            settings,
        }
    }

    /// Run one of the canonical jobs now.
    pub async fn run_kind(&self, kind: JobKind) -> JobReport {
        let job = build_job(kind, self.payments.clone());
        self.run(job.as_ref(), Utc::now()).await
    }

    /// Run `job` as of `now`. Never panics; failures land in the report.
    pub async fn run(&self, job: &dyn Reconciliation, now: DateTime<Utc>) -> JobReport {
        let mut report = JobReport::new(job.name(), now);
        tracing::info!(job = job.name(), started_at = %now, "Starting job");

        if let Err(e) = self.execute(job, now, &mut report).await {
            report.status = JobStatus::Failed;
            report.error = Some(e.to_string());
        }
        report.finished_at = Utc::now();

        match report.status {
            JobStatus::Completed => tracing::info!(
                job = report.job,
                scanned = report.scanned,
                staged = report.staged,
                skipped = report.skipped,
                failed = report.failed_documents.len(),
                operations = report.operations,
                groups = report.groups,
                "Job completed"
            ),
            JobStatus::Failed => tracing::error!(
                job = report.job,
                scanned = report.scanned,
                staged = report.staged,
                failed = report.failed_documents.len(),
                operations = report.operations,
                groups = report.groups,
                error = report.error.as_deref().unwrap_or_default(),
                "Job failed"
            ),
        }
        report
    }

    async fn execute(
        &self,
        job: &dyn Reconciliation,
        now: DateTime<Utc>,
        report: &mut JobReport,
    ) -> Result<()> {
        let exempt_accounts = Authorizer::new(self.store.clone())
            .exempt_accounts()
            .await?;
        let ctx = JobContext {
            now,
            exempt_accounts,
            store: self.store.clone(),
            settings: self.settings.clone(),
        };

        let docs = CollectionScanner::new(self.store.as_ref())
            .scan(&job.collection(), &job.filters(&ctx))
            .await?;
        report.scanned = docs.len();

        let scope = job.commit_scope();
        let ctx = &ctx;
        let mut outcomes: Vec<(DocPath, Outcome)> = stream::iter(docs)
            .map(|doc| async move {
                let outcome = self.process(job, ctx, &doc, scope).await;
                (doc.path, outcome)
            })
            .buffer_unordered(self.settings.max_concurrency.max(1))
            .collect()
            .await;
        // Deterministic group partition regardless of completion order.
        outcomes.sort_by(|a, b| a.0.cmp(&b.0));

        let mut batch = BatchAccumulator::new(self.settings.max_batch_operations);
        let mut abort = None;
        for (path, outcome) in outcomes {
            let failure = match outcome {
                Outcome::Exempt => {
                    report.skipped += 1;
                    tracing::debug!(job = job.name(), path = %path, "Skipping exempt account");
                    None
                }
                Outcome::Skipped(reason) => {
                    report.skipped += 1;
                    tracing::debug!(job = job.name(), path = %path, reason = %reason, "Skipping document");
                    None
                }
                Outcome::Planned(writes) => match batch.stage_atomic(writes) {
                    Ok(()) => {
                        report.staged += 1;
                        None
                    }
                    Err(e) => Some(e),
                },
                Outcome::Committed(summary) => {
                    report.staged += 1;
                    report.add_committed(summary);
                    None
                }
                Outcome::Failed(e) => {
                    report.add_partial(&e);
                    Some(e)
                }
            };

            if let Some(e) = failure {
                tracing::error!(
                    job = job.name(),
                    account_id = path.root_id(),
                    path = %path,
                    error = %e,
                    "Document failed"
                );
                report.failed_documents.push(path.to_string());
                if job.failure_policy() == FailurePolicy::Abort && abort.is_none() {
                    abort = Some(e);
                }
            }
        }

        if let Some(e) = abort {
            return Err(e);
        }

        if !batch.is_empty() {
            match batch.commit(self.store.as_ref()).await {
                Ok(summary) => report.add_committed(summary),
                Err(e) => {
                    report.add_partial(&e);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    async fn process(
        &self,
        job: &dyn Reconciliation,
        ctx: &JobContext,
        doc: &Document,
        scope: CommitScope,
    ) -> Outcome {
        if ctx.is_exempt(doc.path.root_id()) {
            return Outcome::Exempt;
        }

        let writes = match job.plan(ctx, doc).await {
            Ok(Plan::Skip(reason)) => return Outcome::Skipped(reason),
            Ok(Plan::Stage(writes)) if writes.is_empty() => {
                return Outcome::Skipped("nothing to write".to_string())
            }
            Ok(Plan::Stage(writes)) => writes,
            Err(e) => return Outcome::Failed(e),
        };

        match scope {
            CommitScope::Shared => Outcome::Planned(writes),
            CommitScope::PerDocument => {
                let mut batch = BatchAccumulator::new(self.settings.max_batch_operations);
                for write in writes {
                    batch.stage(write);
                }
                match batch.commit(self.store.as_ref()).await {
                    Ok(summary) => Outcome::Committed(summary),
                    Err(e) => Outcome::Failed(e),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{user_doc, CollectionPath, FieldFilter, MemoryStore};
    use crate::services::UnverifiedPayments;
    use async_trait::async_trait;
    use serde_json::json;

    /// Marks every user document whose `n` is below a threshold.
    struct MarkSmall {
        scope: CommitScope,
        policy: FailurePolicy,
    }

    #[async_trait]
    impl Reconciliation for MarkSmall {
        fn name(&self) -> &'static str {
            "mark_small"
        }

        fn collection(&self) -> CollectionPath {
            CollectionPath::root("users")
        }

        fn filters(&self, _ctx: &JobContext) -> Vec<FieldFilter> {
            vec![FieldFilter::lt("n", 100)]
        }

        fn commit_scope(&self) -> CommitScope {
            self.scope
        }

        fn failure_policy(&self) -> FailurePolicy {
            self.policy
        }

        async fn plan(&self, _ctx: &JobContext, doc: &Document) -> Result<Plan> {
            match doc.field("n").and_then(|v| v.as_i64()) {
                Some(13) => Err(AppError::InvalidArgument("unlucky".to_string())),
                Some(n) if n % 2 == 1 => Ok(Plan::skip("odd")),
                _ => Ok(Plan::Stage(vec![Write::update(
                    doc.path.clone(),
                    [("small", json!(true))],
                )])),
            }
        }
    }

    fn seeded(count: i64) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for n in 0..count {
            store.seed(&user_doc(&format!("u{n:03}")), &json!({"n": n}));
        }
        store.seed(&user_doc("boss"), &json!({"n": 2, "role": "admin"}));
        store
    }

    fn runner(store: Arc<MemoryStore>, settings: JobSettings) -> JobRunner {
        JobRunner::new(store, Arc::new(UnverifiedPayments), settings)
    }

    #[tokio::test]
    async fn test_shared_scope_isolates_plan_failures() {
        let store = seeded(20);
        let job = MarkSmall {
            scope: CommitScope::Shared,
            policy: FailurePolicy::Isolate,
        };

        let report = runner(store.clone(), JobSettings::default())
            .run(&job, Utc::now())
            .await;

        assert_eq!(report.status, JobStatus::Completed);
        assert_eq!(report.scanned, 21);
        assert_eq!(report.staged, 10);
        // 9 odd (13 fails) plus the exempt admin
        assert_eq!(report.skipped, 10);
        assert_eq!(report.failed_documents, vec!["users/u013".to_string()]);
        assert_eq!(report.operations, 10);
        assert_eq!(report.groups, 1);
        assert!(store.document(&user_doc("boss")).unwrap().get("small").is_none());
        assert_eq!(store.document(&user_doc("u004")).unwrap()["small"], json!(true));
    }

    #[tokio::test]
    async fn test_abort_policy_commits_nothing() {
        let store = seeded(20);
        let job = MarkSmall {
            scope: CommitScope::Shared,
            policy: FailurePolicy::Abort,
        };

        let report = runner(store.clone(), JobSettings::default())
            .run(&job, Utc::now())
            .await;

        assert_eq!(report.status, JobStatus::Failed);
        assert!(report.error.is_some());
        assert_eq!(report.operations, 0);
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_shared_commit_failure_reports_partial_progress() {
        let store = seeded(20);
        let settings = JobSettings {
            max_batch_operations: 4,
            ..JobSettings::default()
        };
        let job = MarkSmall {
            scope: CommitScope::Shared,
            policy: FailurePolicy::Isolate,
        };
        store.fail_nth_commit_from_now(2);

        let report = runner(store.clone(), settings).run(&job, Utc::now()).await;

        assert_eq!(report.status, JobStatus::Failed);
        assert_eq!(report.groups, 1);
        assert_eq!(report.operations, 4);
        let marked = store
            .documents(&CollectionPath::root("users"))
            .into_iter()
            .filter(|d| d.data.contains_key("small"))
            .count();
        assert_eq!(marked, 4);
    }

    #[tokio::test]
    async fn test_per_document_scope_isolates_commit_failures() {
        let store = seeded(6);
        store.fail_commits_touching("users/u002");
        let job = MarkSmall {
            scope: CommitScope::PerDocument,
            policy: FailurePolicy::Isolate,
        };

        let report = runner(store.clone(), JobSettings::default())
            .run(&job, Utc::now())
            .await;

        assert_eq!(report.status, JobStatus::Completed);
        assert_eq!(report.failed_documents, vec!["users/u002".to_string()]);
        assert_eq!(report.staged, 2);
        assert_eq!(report.groups, 2);
        assert_eq!(store.document(&user_doc("u000")).unwrap()["small"], json!(true));
        assert_eq!(store.document(&user_doc("u004")).unwrap()["small"], json!(true));
        assert!(store.document(&user_doc("u002")).unwrap().get("small").is_none());
    }

    #[tokio::test]
    async fn test_concurrency_of_one_still_processes_everything() {
        let store = seeded(10);
        let settings = JobSettings {
            max_concurrency: 1,
            ..JobSettings::default()
        };
        let job = MarkSmall {
            scope: CommitScope::Shared,
            policy: FailurePolicy::Isolate,
        };

        let report = runner(store, settings).run(&job, Utc::now()).await;

        assert_eq!(report.scanned, 11);
        assert_eq!(report.staged, 5);
    }
}
