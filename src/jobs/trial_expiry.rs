// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ends the photo upload trial of free-tier accounts.

use crate::db::{collections, usage_limit_doc, CollectionPath, Document, FieldFilter, Write};
use crate::error::Result;
use crate::jobs::{JobContext, Plan, Reconciliation};
use crate::models::{NotificationEntry, Tier, UserAccount};
use crate::time_utils::format_utc_rfc3339;
use async_trait::async_trait;
use serde_json::json;

/// Free-tier accounts whose `freeTrialPhotoUploadsEndDate` has passed lose
/// their upload quota. The account update, the zeroed usage record and the
/// `trial_expired` notification are one atomic unit.
pub struct TrialExpirySweep;

#[async_trait]
impl Reconciliation for TrialExpirySweep {
    fn name(&self) -> &'static str {
        "trial_expiry_sweep"
    }

    fn collection(&self) -> CollectionPath {
        CollectionPath::root(collections::USERS)
    }

    // The tier is checked in `plan` so accounts without a subscription map,
    // or with the legacy string form, are still covered.
    fn filters(&self, ctx: &JobContext) -> Vec<FieldFilter> {
        vec![FieldFilter::lte(
            "freeTrialPhotoUploadsEndDate",
            format_utc_rfc3339(ctx.now),
        )]
    }

    async fn plan(&self, ctx: &JobContext, doc: &Document) -> Result<Plan> {
        let account: UserAccount = doc.decode()?;
        if account.tier() != Tier::Free {
            return Ok(Plan::skip("paid tier"));
        }
        if account.trial_expired {
            return Ok(Plan::skip("trial already expired"));
        }

        let now = json!(format_utc_rfc3339(ctx.now));
        let notification = NotificationEntry::trial_expired(ctx.settings.trial_days, ctx.now);

        Ok(Plan::Stage(vec![
            Write::update(
                doc.path.clone(),
                [
                    ("maxPhotoUploadsPerDay", json!(0)),
                    ("trialExpired", json!(true)),
                    ("trialExpiredAt", now.clone()),
                ],
            ),
            Write::merge(
                usage_limit_doc(doc.id()),
                [
                    ("userId", json!(doc.id())),
                    ("count", json!(0)),
                    ("maxDaily", json!(0)),
                    ("date", now.clone()),
                    ("lastReset", now),
                ],
            ),
            Write::set(
                doc.path.subcollection(collections::NOTIFICATIONS).new_doc(),
                &notification,
            )?,
        ]))
    }
}
