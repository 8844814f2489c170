// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Moves per-user data out of legacy top-level collections.

use crate::db::{
    collections, usage_limit_doc, CollectionPath, CollectionScanner, Document, FieldFilter, Write,
};
use crate::error::Result;
use crate::jobs::{CommitScope, JobContext, Plan, Reconciliation};
use crate::models::UsageLimitRecord;
use crate::services::usage::usage_fields;
use async_trait::async_trait;
use serde_json::json;

/// For each account:
///
/// - `upload_rules/{id}` is folded into `usage_limits/{id}` and deleted. If
///   both exist the current record wins.
/// - A default usage record is seeded when neither exists.
/// - Top-level `notifications` carrying `userId == id` move to
///   `users/{id}/notifications`, keeping their ids.
pub struct UserDataMigration;

#[async_trait]
impl Reconciliation for UserDataMigration {
    fn name(&self) -> &'static str {
        "user_data_migration"
    }

    fn collection(&self) -> CollectionPath {
        CollectionPath::root(collections::USERS)
    }

    fn commit_scope(&self) -> CommitScope {
        CommitScope::PerDocument
    }

    async fn plan(&self, ctx: &JobContext, doc: &Document) -> Result<Plan> {
        let account_id = doc.id();
        let store = ctx.store();
        let usage = usage_limit_doc(account_id);
        let legacy_rules = CollectionPath::root(collections::LEGACY_UPLOAD_RULES).doc(account_id);

        let (current, legacy) = tokio::try_join!(store.get(&usage), store.get(&legacy_rules))?;

        let mut writes = Vec::new();
        match (current, legacy) {
            (None, Some(mut legacy)) => {
                legacy
                    .data
                    .entry("userId")
                    .or_insert_with(|| json!(account_id));
                writes.push(Write::set(usage.clone(), &legacy.data)?);
                writes.push(Write::delete(legacy_rules));
            }
            (Some(_), Some(_)) => writes.push(Write::delete(legacy_rules)),
            (None, None) => {
                let record =
                    UsageLimitRecord::new(account_id, ctx.settings.default_daily_limit, ctx.now);
                writes.push(Write::merge(usage.clone(), usage_fields(&record)?));
            }
            (Some(_), None) => {}
        }

        let notifications = CollectionScanner::new(store)
            .scan(
                &CollectionPath::root(collections::LEGACY_NOTIFICATIONS),
                &[FieldFilter::eq("userId", account_id)],
            )
            .await?;
        let inbox = doc.path.subcollection(collections::NOTIFICATIONS);
        for note in notifications {
            writes.push(Write::set(inbox.doc(note.id()), &note.data)?);
            writes.push(Write::delete(note.path));
        }

        if writes.is_empty() {
            return Ok(Plan::skip("already migrated"));
        }
        tracing::debug!(account_id, writes = writes.len(), "Migrating legacy data");
        Ok(Plan::Stage(writes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JobSettings;
    use crate::db::{user_doc, MemoryStore};
    use crate::jobs::{JobRunner, JobStatus};
    use crate::services::UnverifiedPayments;
    use chrono::Utc;
    use std::sync::Arc;

    fn runner(store: Arc<MemoryStore>) -> JobRunner {
        JobRunner::new(store, Arc::new(UnverifiedPayments), JobSettings::default())
    }

    fn legacy_rules(id: &str) -> crate::db::DocPath {
        CollectionPath::root("upload_rules").doc(id)
    }

    #[tokio::test]
    async fn test_legacy_upload_rules_move_to_usage_limits() {
        let store = Arc::new(MemoryStore::new());
        store.seed(&user_doc("u1"), &json!({}));
        store.seed(&legacy_rules("u1"), &json!({"count": 2, "maxDaily": 5}));

        let report = runner(store.clone()).run(&UserDataMigration, Utc::now()).await;

        assert_eq!(report.status, JobStatus::Completed);
        assert!(store.document(&legacy_rules("u1")).is_none());
        let usage = store.document(&usage_limit_doc("u1")).unwrap();
        assert_eq!(usage["count"], json!(2));
        assert_eq!(usage["maxDaily"], json!(5));
        assert_eq!(usage["userId"], json!("u1"));
    }

    #[tokio::test]
    async fn test_current_usage_record_wins() {
        let store = Arc::new(MemoryStore::new());
        store.seed(&user_doc("u1"), &json!({}));
        store.seed(&usage_limit_doc("u1"), &json!({"count": 1, "maxDaily": 8}));
        store.seed(&legacy_rules("u1"), &json!({"count": 7, "maxDaily": 2}));

        runner(store.clone()).run(&UserDataMigration, Utc::now()).await;

        assert!(store.document(&legacy_rules("u1")).is_none());
        assert_eq!(
            store.document(&usage_limit_doc("u1")).unwrap(),
            json!({"count": 1, "maxDaily": 8}).as_object().cloned().unwrap()
        );
    }

    #[tokio::test]
    async fn test_missing_usage_record_is_seeded() {
        let store = Arc::new(MemoryStore::new());
        store.seed(&user_doc("u1"), &json!({}));

        runner(store.clone()).run(&UserDataMigration, Utc::now()).await;

        let usage = store.document(&usage_limit_doc("u1")).unwrap();
        assert_eq!(usage["count"], json!(0));
        assert_eq!(usage["maxDaily"], json!(8));
    }

    #[tokio::test]
    async fn test_notifications_move_under_owner() {
        let store = Arc::new(MemoryStore::new());
        store.seed(&user_doc("u1"), &json!({}));
        store.seed(&user_doc("u2"), &json!({}));
        let legacy = CollectionPath::root("notifications");
        store.seed(&legacy.doc("n1"), &json!({"userId": "u1", "title": "Hi"}));
        store.seed(&legacy.doc("n2"), &json!({"userId": "u2", "title": "Hello"}));
        store.seed(&legacy.doc("orphan"), &json!({"userId": "gone", "title": "?"}));

        runner(store.clone()).run(&UserDataMigration, Utc::now()).await;

        let moved = store.documents(&user_doc("u1").subcollection("notifications"));
        assert_eq!(moved.len(), 1);
        assert_eq!(moved[0].id(), "n1");
        assert_eq!(moved[0].data["title"], json!("Hi"));
        let remaining: Vec<String> = store
            .documents(&legacy)
            .iter()
            .map(|d| d.id().to_string())
            .collect();
        assert_eq!(remaining, vec!["orphan"]);
    }

    #[tokio::test]
    async fn test_second_run_has_nothing_to_do() {
        let store = Arc::new(MemoryStore::new());
        store.seed(&user_doc("u1"), &json!({}));
        store.seed(&legacy_rules("u1"), &json!({"count": 2}));

        runner(store.clone()).run(&UserDataMigration, Utc::now()).await;
        let commits = store.commit_count();
        let second = runner(store.clone()).run(&UserDataMigration, Utc::now()).await;

        assert_eq!(second.skipped, 1);
        assert_eq!(store.commit_count(), commits);
    }

    #[tokio::test]
    async fn test_admin_data_is_not_migrated() {
        let store = Arc::new(MemoryStore::new());
        store.seed(&user_doc("boss"), &json!({"role": "admin"}));
        store.seed(&legacy_rules("boss"), &json!({"count": 0}));

        let report = runner(store.clone()).run(&UserDataMigration, Utc::now()).await;

        assert_eq!(report.skipped, 1);
        assert!(store.document(&legacy_rules("boss")).is_some());
        assert!(store.document(&usage_limit_doc("boss")).is_none());
    }
}
