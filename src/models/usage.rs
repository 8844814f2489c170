// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily upload usage counter.

use crate::time_utils::rfc3339_opt;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Usage limit record stored at `usage_limits/{account_id}`.
///
/// `count` is reset to 0 by the daily reset job; the upload gate refuses
/// uploads once `count >= maxDaily`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageLimitRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub max_daily: i64,
    #[serde(default, with = "rfc3339_opt", skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, with = "rfc3339_opt", skip_serializing_if = "Option::is_none")]
    pub last_reset: Option<DateTime<Utc>>,
}

impl UsageLimitRecord {
    /// A zeroed record for a new account.
    pub fn new(account_id: &str, max_daily: i64, now: DateTime<Utc>) -> Self {
        Self {
            user_id: Some(account_id.to_string()),
            count: 0,
            max_daily,
            date: Some(now),
            last_reset: Some(now),
        }
    }

    /// Uploads left today. A negative `maxDaily` means unlimited.
    pub fn remaining(&self) -> Option<i64> {
        (self.max_daily >= 0).then(|| (self.max_daily - self.count).max(0))
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == Some(0)
    }
}
