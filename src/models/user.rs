// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User account model.

use crate::models::subscription::{self, Subscription, Tier};
use crate::time_utils::rfc3339_opt;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Account role. Unknown values are treated as a regular user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    #[serde(other)]
    User,
}

/// User profile stored at `users/{account_id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(
        default,
        deserialize_with = "subscription::deserialize_lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub subscription: Option<Subscription>,
    /// Daily nutrition targets by macro name (calories, protein, carbs, fat)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_macros: Option<BTreeMap<String, f64>>,
    /// Per-day photo upload quota
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_photo_uploads_per_day: Option<i64>,
    #[serde(default, with = "rfc3339_opt", skip_serializing_if = "Option::is_none")]
    pub free_trial_start_date: Option<DateTime<Utc>>,
    #[serde(default, with = "rfc3339_opt", skip_serializing_if = "Option::is_none")]
    pub free_trial_photo_uploads_end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub trial_expired: bool,
    #[serde(default, with = "rfc3339_opt", skip_serializing_if = "Option::is_none")]
    pub trial_expired_at: Option<DateTime<Utc>>,
    #[serde(default, with = "rfc3339_opt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "rfc3339_opt", skip_serializing_if = "Option::is_none")]
    pub last_active: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_test_user: Option<bool>,
}

impl UserAccount {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Effective tier; accounts without a subscription are on the free tier.
    pub fn tier(&self) -> Tier {
        self.subscription.as_ref().map(|s| s.tier).unwrap_or_default()
    }
}
