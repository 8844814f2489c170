// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Deletes old meal log entries and recommendations.

use crate::db::{collections, CollectionPath, CollectionScanner, Document, FieldFilter, Write};
use crate::error::Result;
use crate::jobs::{CommitScope, JobContext, Plan, Reconciliation};
use crate::time_utils::{date_key, format_utc_rfc3339};
use async_trait::async_trait;
use chrono::Duration;

/// Per user: meals with `timestamp < now - 90d` and recommendations dated
/// before `now - 7d` are deleted. Each user commits separately so one
/// user's failure does not stop the sweep.
pub struct DataRetentionCleanup;

#[async_trait]
impl Reconciliation for DataRetentionCleanup {
    fn name(&self) -> &'static str {
        "data_retention_cleanup"
    }

    fn collection(&self) -> CollectionPath {
        CollectionPath::root(collections::USERS)
    }

    fn commit_scope(&self) -> CommitScope {
        CommitScope::PerDocument
    }

    async fn plan(&self, ctx: &JobContext, doc: &Document) -> Result<Plan> {
        let meal_cutoff = ctx.now - Duration::days(ctx.settings.meal_retention_days);
        let recommendation_cutoff =
            ctx.now - Duration::days(ctx.settings.recommendation_retention_days);
        let scanner = CollectionScanner::new(ctx.store());

        let meals = scanner
            .scan(
                &doc.path.subcollection(collections::MEALS),
                &[FieldFilter::lt("timestamp", format_utc_rfc3339(meal_cutoff))],
            )
            .await?;
        let recommendations = scanner
            .scan(
                &doc.path.subcollection(collections::RECOMMENDATIONS),
                &[FieldFilter::lt(
                    "date",
                    date_key(recommendation_cutoff.date_naive()),
                )],
            )
            .await?;

        if meals.is_empty() && recommendations.is_empty() {
            return Ok(Plan::skip("nothing expired"));
        }

        tracing::debug!(
            account_id = doc.id(),
            meals = meals.len(),
            recommendations = recommendations.len(),
            "Expiring old entries"
        );
        Ok(Plan::Stage(
            meals
                .into_iter()
                .chain(recommendations)
                .map(|old| Write::delete(old.path))
                .collect(),
        ))
    }
}
