// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-app notifications.

use crate::models::Tier;
use crate::time_utils::rfc3339;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    TrialStarted,
    TrialExpired,
    SubscriptionUpdated,
}

/// Notification stored at `users/{account_id}/notifications/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEntry {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    #[serde(with = "rfc3339")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
}

impl NotificationEntry {
    pub fn trial_started(trial_days: i64, uploads_per_day: i64, now: DateTime<Utc>) -> Self {
        Self {
            kind: NotificationKind::TrialStarted,
            title: "Welcome to Your Free Trial!".to_string(),
            message: format!(
                "You can now upload up to {uploads_per_day} photos per day for the next {trial_days} days. Make the most of it!"
            ),
            created_at: now,
            read: false,
            action_url: None,
        }
    }

    pub fn trial_expired(trial_days: i64, now: DateTime<Utc>) -> Self {
        Self {
            kind: NotificationKind::TrialExpired,
            title: "Free Trial Ended".to_string(),
            message: format!(
                "Your {trial_days}-day free trial has ended. Upgrade to Premium to continue uploading photos and accessing all features!"
            ),
            created_at: now,
            read: false,
            action_url: Some("/upgrade".to_string()),
        }
    }

    pub fn subscription_updated(tier: Tier, now: DateTime<Utc>) -> Self {
        Self {
            kind: NotificationKind::SubscriptionUpdated,
            title: "Subscription Updated".to_string(),
            message: format!("Your subscription is now {tier}."),
            created_at: now,
            read: false,
            action_url: None,
        }
    }
}
