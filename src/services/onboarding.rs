// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! New account seeding, run once per created user document.

use crate::config::JobSettings;
use crate::db::{collections, usage_limit_doc, user_doc, DocumentStore, Write};
use crate::error::{AppError, Result};
use crate::models::{NotificationEntry, Tier, UsageLimitRecord, UserAccount};
use crate::services::usage::usage_fields;
use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

/// What the hook did for one account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingResult {
    pub usage_record_seeded: bool,
    pub trial_started: bool,
}

pub struct OnboardingService {
    store: Arc<dyn DocumentStore>,
    settings: JobSettings,
}

impl OnboardingService {
    pub fn new(store: Arc<dyn DocumentStore>, settings: JobSettings) -> Self {
        Self { store, settings }
    }

    /// Seed the usage record and, for free-tier accounts, the photo upload
    /// trial.
    ///
    /// Decisions are made from the stored documents, not the hook payload:
    /// a trial starts only for a free account that has never had one, and
    /// the usage record is written only if absent. The trial fields and
    /// their notification land in one transaction on the user document, so
    /// redelivered or concurrent hooks start at most one trial. Admin
    /// accounts are left alone.
    pub async fn seed_new_account(
        &self,
        account_id: &str,
        now: DateTime<Utc>,
    ) -> Result<OnboardingResult> {
        let user = user_doc(account_id);
        let trial_days = self.settings.trial_days;
        let trial_uploads = self.settings.trial_uploads_per_day;

        let seen = self
            .store
            .read_modify_write(&user, &|doc| {
                let account: UserAccount = doc
                    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?
                    .decode()?;
                if !trial_due(&account) {
                    return Ok(Vec::new());
                }
                let trial_end = now + Duration::days(trial_days);
                Ok(vec![
                    Write::update(
                        user.clone(),
                        [
                            ("freeTrialStartDate", json!(format_utc_rfc3339(now))),
                            ("freeTrialPhotoUploadsEndDate", json!(format_utc_rfc3339(trial_end))),
                            ("maxPhotoUploadsPerDay", json!(trial_uploads)),
                        ],
                    ),
                    Write::set(
                        user.subcollection(collections::NOTIFICATIONS).new_doc(),
                        &NotificationEntry::trial_started(trial_days, trial_uploads, now),
                    )?,
                ])
            })
            .await?;
        let account: UserAccount = seen
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?
            .decode()?;

        if account.is_admin() {
            tracing::info!(account_id, "Admin account created; skipping seeding");
            return Ok(OnboardingResult::default());
        }

        let trial_started = trial_due(&account);
        let in_trial = trial_started
            || (account.tier() == Tier::Free
                && account.free_trial_start_date.is_some()
                && !account.trial_expired);
        let max_daily = if in_trial {
            trial_uploads
        } else {
            self.settings.default_daily_limit
        };

        let usage = usage_limit_doc(account_id);
        let fresh = UsageLimitRecord::new(account_id, max_daily, now);
        let existing = self
            .store
            .read_modify_write(&usage, &|doc| match doc {
                None => Ok(vec![Write::merge(usage.clone(), usage_fields(&fresh)?)]),
                Some(_) if trial_started => Ok(vec![Write::update(
                    usage.clone(),
                    [("maxDaily", json!(max_daily))],
                )]),
                Some(_) => Ok(Vec::new()),
            })
            .await?;
        let usage_record_seeded = existing.is_none();

        tracing::info!(
            account_id,
            max_daily,
            usage_record_seeded,
            trial_started,
            "Seeded new account"
        );
        Ok(OnboardingResult {
            usage_record_seeded,
            trial_started,
        })
    }
}

/// A free, non-admin account that has never been given a trial.
fn trial_due(account: &UserAccount) -> bool {
    !account.is_admin()
        && account.tier() == Tier::Free
        && account.free_trial_start_date.is_none()
        && account.free_trial_photo_uploads_end_date.is_none()
        && !account.trial_expired
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{Role, Subscription};

    fn service() -> (Arc<MemoryStore>, OnboardingService) {
        let store = Arc::new(MemoryStore::new());
        let svc = OnboardingService::new(store.clone(), JobSettings::default());
        (store, svc)
    }

    #[tokio::test]
    async fn test_free_account_gets_trial() {
        let (store, svc) = service();
        let account = UserAccount::default();
        store.seed(&user_doc("u1"), &account);
        let now = Utc::now();

        let result = svc.seed_new_account("u1", now).await.unwrap();

        assert!(result.trial_started);
        assert!(result.usage_record_seeded);
        let user: UserAccount = serde_json::from_value(
            serde_json::Value::Object(store.document(&user_doc("u1")).unwrap()),
        )
        .unwrap();
        assert_eq!(user.max_photo_uploads_per_day, Some(3));
        assert_eq!(
            user.free_trial_photo_uploads_end_date.map(format_utc_rfc3339),
            Some(format_utc_rfc3339(now + Duration::days(14)))
        );
        let usage = store.document(&usage_limit_doc("u1")).unwrap();
        assert_eq!(usage["count"], json!(0));
        assert_eq!(usage["maxDaily"], json!(3));
        let notifications = store.documents(&user_doc("u1").subcollection("notifications"));
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].data["type"], json!("trial_started"));
    }

    #[tokio::test]
    async fn test_paid_account_gets_default_limit_only() {
        let (store, svc) = service();
        let account = UserAccount {
            subscription: Some(Subscription {
                tier: Tier::Premium,
                ..Subscription::default()
            }),
            ..UserAccount::default()
        };
        store.seed(&user_doc("u1"), &account);

        let result = svc.seed_new_account("u1", Utc::now()).await.unwrap();

        assert!(!result.trial_started);
        assert_eq!(store.document(&usage_limit_doc("u1")).unwrap()["maxDaily"], json!(8));
        assert!(store
            .documents(&user_doc("u1").subcollection("notifications"))
            .is_empty());
    }

    #[tokio::test]
    async fn test_admin_account_is_not_seeded() {
        let (store, svc) = service();
        let account = UserAccount {
            role: Role::Admin,
            ..UserAccount::default()
        };
        store.seed(&user_doc("boss"), &account);

        let result = svc.seed_new_account("boss", Utc::now()).await.unwrap();

        assert_eq!(result, OnboardingResult::default());
        assert!(store.document(&usage_limit_doc("boss")).is_none());
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_redelivered_hook_changes_nothing() {
        let (store, svc) = service();
        store.seed(&user_doc("u1"), &UserAccount::default());
        let created = Utc::now();
        svc.seed_new_account("u1", created).await.unwrap();
        store
            .commit(&[Write::update(usage_limit_doc("u1"), [("count", json!(2))])])
            .await
            .unwrap();
        let user_before = store.document(&user_doc("u1"));

        let again = svc
            .seed_new_account("u1", created + Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(again, OnboardingResult::default());
        assert_eq!(store.document(&user_doc("u1")), user_before);
        let usage = store.document(&usage_limit_doc("u1")).unwrap();
        assert_eq!(usage["count"], json!(2));
        assert_eq!(usage["maxDaily"], json!(3));
        assert_eq!(
            store
                .documents(&user_doc("u1").subcollection("notifications"))
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_expired_trial_is_not_reopened() {
        let (store, svc) = service();
        store.seed(
            &user_doc("u1"),
            &json!({
                "subscription": {"tier": "free"},
                "freeTrialStartDate": "2024-05-01T00:00:00Z",
                "freeTrialPhotoUploadsEndDate": "2024-05-15T00:00:00Z",
                "maxPhotoUploadsPerDay": 0,
                "trialExpired": true
            }),
        );
        store.seed(&usage_limit_doc("u1"), &json!({"count": 0, "maxDaily": 0}));
        let user_before = store.document(&user_doc("u1"));

        let result = svc.seed_new_account("u1", Utc::now()).await.unwrap();

        assert_eq!(result, OnboardingResult::default());
        assert_eq!(store.document(&user_doc("u1")), user_before);
        assert_eq!(store.document(&usage_limit_doc("u1")).unwrap()["maxDaily"], json!(0));
        assert!(store
            .documents(&user_doc("u1").subcollection("notifications"))
            .is_empty());
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_user_is_not_found() {
        let (store, svc) = service();

        let err = svc.seed_new_account("ghost", Utc::now()).await.unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert!(store.document(&usage_limit_doc("ghost")).is_none());
    }
}
