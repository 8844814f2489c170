// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Renews or downgrades auto-renewing subscriptions past their end date.

use crate::db::{collections, CollectionPath, Document, FieldFilter, Write};
use crate::error::Result;
use crate::jobs::{CommitScope, JobContext, Plan, Reconciliation};
use crate::models::{to_field_value, Tier, UserAccount};
use crate::services::payments::renewal_key;
use crate::services::{PaymentProcessor, RenewalOutcome};
use crate::time_utils::format_utc_rfc3339;
use async_trait::async_trait;
use chrono::Duration;
use serde_json::{json, Value};
use std::sync::Arc;

/// Accounts with `subscription.endDate <= now` and `autoRenew` set are
/// offered to the payment processor first. A successful charge extends the
/// end date by one period; anything else drops the account to the free tier
/// with the free feature bundle and clears `autoRenew`.
///
/// Charges happen while planning, so each account's result is committed on
/// its own: a failed commit elsewhere cannot discard a recorded renewal. A
/// charge whose commit failed is retried on the next run under the same
/// idempotency key.
pub struct SubscriptionExpirySweep {
    payments: Arc<dyn PaymentProcessor>,
}

impl SubscriptionExpirySweep {
    pub fn new(payments: Arc<dyn PaymentProcessor>) -> Self {
        Self { payments }
    }
}

#[async_trait]
impl Reconciliation for SubscriptionExpirySweep {
    fn name(&self) -> &'static str {
        "subscription_expiry_sweep"
    }

    fn collection(&self) -> CollectionPath {
        CollectionPath::root(collections::USERS)
    }

    fn commit_scope(&self) -> CommitScope {
        CommitScope::PerDocument
    }

    fn filters(&self, ctx: &JobContext) -> Vec<FieldFilter> {
        vec![
            FieldFilter::lte("subscription.endDate", format_utc_rfc3339(ctx.now)),
            FieldFilter::eq("subscription.autoRenew", true),
        ]
    }

    async fn plan(&self, ctx: &JobContext, doc: &Document) -> Result<Plan> {
        let account: UserAccount = doc.decode()?;
        let Some(subscription) = account.subscription else {
            return Ok(Plan::skip("no subscription"));
        };
        let updated_at = Value::from(format_utc_rfc3339(ctx.now));

        let outcome = if subscription.tier == Tier::Free {
            RenewalOutcome::Unsupported
        } else {
            let key = renewal_key(doc.id(), &subscription);
            self.payments.renew(doc.id(), &subscription, &key).await?
        };

        let fields = match outcome {
            RenewalOutcome::Renewed { payment_id } => {
                let period = Duration::days(ctx.settings.subscription_period_days);
                // Renew from the old end date unless that still leaves it in the past.
                let from = subscription
                    .end_date
                    .filter(|end| *end + period > ctx.now)
                    .unwrap_or(ctx.now);
                tracing::info!(
                    account_id = doc.id(),
                    tier = %subscription.tier,
                    payment_id = %payment_id,
                    "Subscription renewed"
                );
                vec![
                    ("subscription.endDate", json!(format_utc_rfc3339(from + period))),
                    ("subscription.lastPaymentId", json!(payment_id)),
                    ("subscription.updatedAt", updated_at),
                ]
            }
            RenewalOutcome::Declined { reason } => {
                tracing::info!(account_id = doc.id(), reason = %reason, "Renewal declined; downgrading");
                downgrade_fields(updated_at)?
            }
            RenewalOutcome::Unsupported => {
                tracing::debug!(account_id = doc.id(), "Downgrading expired subscription");
                downgrade_fields(updated_at)?
            }
        };

        Ok(Plan::Stage(vec![Write::update(doc.path.clone(), fields)]))
    }
}

fn downgrade_fields(updated_at: Value) -> Result<Vec<(&'static str, Value)>> {
    Ok(vec![
        ("subscription.tier", json!(Tier::Free)),
        ("subscription.features", to_field_value(&Tier::Free.features())?),
        ("subscription.autoRenew", json!(false)),
        ("subscription.updatedAt", updated_at),
    ])
}
