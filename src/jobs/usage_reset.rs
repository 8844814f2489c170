// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily reset of upload usage counters.

use crate::db::{collections, CollectionPath, Document, Write};
use crate::error::Result;
use crate::jobs::{JobContext, Plan, Reconciliation};
use crate::time_utils::format_utc_rfc3339;
use async_trait::async_trait;
use serde_json::json;

/// Sets `count = 0` and `lastReset = now` on every usage record.
pub struct UsageCounterReset;

#[async_trait]
impl Reconciliation for UsageCounterReset {
    fn name(&self) -> &'static str {
        "usage_counter_reset"
    }

    fn collection(&self) -> CollectionPath {
        CollectionPath::root(collections::USAGE_LIMITS)
    }

    async fn plan(&self, ctx: &JobContext, doc: &Document) -> Result<Plan> {
        Ok(Plan::Stage(vec![Write::update(
            doc.path.clone(),
            [
                ("count", json!(0)),
                ("lastReset", json!(format_utc_rfc3339(ctx.now))),
            ],
        )]))
    }
}
