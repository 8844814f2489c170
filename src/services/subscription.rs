// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Subscription callables: access checks, purchases, cancellation, and the
//! admin tier-wide upgrade.

use crate::config::JobSettings;
use crate::db::{
    collections, get_as, user_doc, BatchAccumulator, CollectionPath, CollectionScanner,
    DocumentStore, FieldFilter, Write,
};
use crate::error::{AppError, Result};
use crate::models::{to_field_value, FeatureBundle, NotificationEntry, Tier, UserAccount};
use crate::services::PaymentProcessor;
use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Response of `validateSubscriptionAccess`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionAccess {
    pub tier: Tier,
    pub is_valid: bool,
    pub features: FeatureBundle,
}

/// Response of the admin tier-wide upgrade.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeResult {
    pub users_updated: usize,
    pub errors: Vec<String>,
}

/// Response of the admin upgrade verification.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeVerification {
    pub remaining_premium_users: usize,
    pub total_professional_users: usize,
    pub users_upgraded_from_premium: usize,
    pub verification_time: String,
}

pub struct SubscriptionService {
    store: Arc<dyn DocumentStore>,
    payments: Arc<dyn PaymentProcessor>,
    settings: JobSettings,
}

impl SubscriptionService {
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

    async fn load_account(&self, account_id: &str) -> Result<UserAccount> {
        get_as(self.store.as_ref(), &user_doc(account_id))
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Current tier, whether it is still valid, and its features.
    pub async fn validate_access(
        &self,
        account_id: &str,
        now: DateTime<Utc>,
    ) -> Result<SubscriptionAccess> {
        let account = self.load_account(account_id).await?;

        Ok(match account.subscription {
            None => SubscriptionAccess {
                tier: Tier::Free,
                is_valid: true,
                features: FeatureBundle::default(),
            },
            Some(sub) => SubscriptionAccess {
                tier: sub.tier,
                is_valid: !sub.is_expired(now),
                features: sub.features,
            },
        })
    }

    /// Activate `tier` after the payment processor confirms `payment_id`.
    pub async fn update_subscription(
        &self,
        account_id: &str,
        tier: Tier,
        payment_id: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if payment_id.trim().is_empty() {
            return Err(AppError::InvalidArgument(
                "Missing required fields".to_string(),
            ));
        }
        self.load_account(account_id).await?;
        self.payments.verify(account_id, tier, payment_id).await?;

        let end_date = now + Duration::days(self.settings.subscription_period_days);
        let user = user_doc(account_id);
        let notification = NotificationEntry::subscription_updated(tier, now);

        self.store
            .commit(&[
                Write::update(
                    user.clone(),
                    [
                        ("subscription.tier", json!(tier)),
                        ("subscription.startDate", json!(format_utc_rfc3339(now))),
                        ("subscription.endDate", json!(format_utc_rfc3339(end_date))),
                        ("subscription.features", to_field_value(&tier.features())?),
                        ("subscription.autoRenew", json!(true)),
                        ("subscription.lastPaymentId", json!(payment_id)),
                        ("subscription.updatedAt", json!(format_utc_rfc3339(now))),
                    ],
                ),
                Write::set(
                    user.subcollection(collections::NOTIFICATIONS).new_doc(),
                    &notification,
                )?,
            ])
            .await?;

        tracing::info!(account_id, %tier, end_date = %end_date, "Subscription updated");
        Ok(())
    }

    /// Stop auto-renewal. The subscription stays active until its end date.
    pub async fn cancel_subscription(&self, account_id: &str) -> Result<()> {
        self.load_account(account_id).await?;
        self.store
            .commit(&[Write::update(
                user_doc(account_id),
                [("subscription.autoRenew", json!(false))],
            )])
            .await?;

        tracing::info!(account_id, "Subscription auto-renew cancelled");
        Ok(())
    }

    /// Move every premium account to the professional tier.
    ///
    /// Partial failures are reported in `errors`; groups committed before the
    /// failure stay applied and are counted in `users_updated`.
    pub async fn upgrade_premium_to_professional(&self, now: DateTime<Utc>) -> Result<UpgradeResult> {
        let premium = CollectionScanner::new(self.store.as_ref())
            .scan(
                &CollectionPath::root(collections::USERS),
                &[FieldFilter::eq("subscription.tier", Tier::Premium.as_str())],
            )
            .await?;

        let features = to_field_value(&Tier::Professional.features())?;
        let updated_at = Value::from(format_utc_rfc3339(now));
        let mut batch = BatchAccumulator::new(self.settings.max_batch_operations);
        for doc in &premium {
            batch.stage(Write::update(
                doc.path.clone(),
                [
                    ("subscription.tier", json!(Tier::Professional)),
                    ("subscription.features", features.clone()),
                    ("subscription.updatedAt", updated_at.clone()),
                    ("subscription.upgradedFromPremium", json!(true)),
                ],
            ));
        }

        let mut result = UpgradeResult::default();
        match batch.commit(self.store.as_ref()).await {
            Ok(summary) => result.users_updated = summary.operations,
            Err(AppError::PartialCommit {
                committed_operations,
                reason,
                ..
            }) => {
                result.users_updated = committed_operations;
                result.errors.push(reason);
            }
            Err(e) => return Err(e),
        }

        tracing::info!(
            candidates = premium.len(),
            users_updated = result.users_updated,
            errors = result.errors.len(),
            "Premium to professional upgrade completed"
        );
        Ok(result)
    }

    /// Counts that confirm the tier-wide upgrade landed.
    pub async fn verify_upgrade(&self, now: DateTime<Utc>) -> Result<UpgradeVerification> {
        let users = CollectionPath::root(collections::USERS);
        let scanner = CollectionScanner::new(self.store.as_ref());
        let count = |filter: FieldFilter| {
            let users = users.clone();
            async move { scanner.scan(&users, &[filter]).await.map(|docs| docs.len()) }
        };

        let (remaining, professional, upgraded) = tokio::try_join!(
            count(FieldFilter::eq("subscription.tier", Tier::Premium.as_str())),
            count(FieldFilter::eq("subscription.tier", Tier::Professional.as_str())),
            count(FieldFilter::eq("subscription.upgradedFromPremium", true)),
        )?;

        Ok(UpgradeVerification {
            remaining_premium_users: remaining,
            total_professional_users: professional,
            users_upgraded_from_premium: upgraded,
            verification_time: format_utc_rfc3339(now),
        })
    }
}
