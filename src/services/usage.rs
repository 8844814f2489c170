// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Upload gate: enforces the daily photo upload quota.

use crate::config::JobSettings;
use crate::db::{get_as, usage_limit_doc, user_doc, DocumentStore, Write};
use crate::error::{AppError, Result};
use crate::models::{to_field_value, Tier, UsageLimitRecord, UserAccount};
use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Response of `recordUpload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadStatus {
    pub count: i64,
    pub max_daily: i64,
    /// Uploads left today, or `None` when the account is not capped
    pub remaining: Option<i64>,
}

pub struct UploadGate {
    store: Arc<dyn DocumentStore>,
    settings: JobSettings,
}

impl UploadGate {
    pub fn new(store: Arc<dyn DocumentStore>, settings: JobSettings) -> Self {
        Self { store, settings }
    }

    /// Count one upload against today's quota.
    ///
    /// Free-tier accounts are refused once `count >= maxDaily`; paid tiers
    /// are counted but not capped. A missing usage record is created with the
    /// default limit. The quota check and the increment happen in one
    /// transaction, so concurrent uploads cannot overshoot the limit.
    pub async fn record_upload(&self, account_id: &str, now: DateTime<Utc>) -> Result<UploadStatus> {
        let store = self.store.as_ref();
        let account: UserAccount = get_as(store, &user_doc(account_id))
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        let path = usage_limit_doc(account_id);
        let capped = account.tier() == Tier::Free;

        if !capped {
            if let Some(record) = get_as::<UsageLimitRecord>(store, &path).await? {
                store.increment(&path, "count", 1).await?;
                tracing::debug!(account_id, count = record.count + 1, "Recorded upload");
                return Ok(UploadStatus {
                    count: record.count + 1,
                    max_daily: record.max_daily,
                    remaining: None,
                });
            }
        }

        let fresh = UsageLimitRecord::new(account_id, self.settings.default_daily_limit, now);
        let seen = store
            .read_modify_write(&path, &|doc| {
                let record = match doc {
                    Some(doc) => doc.decode::<UsageLimitRecord>()?,
                    None => fresh.clone(),
                };
                if capped && record.is_exhausted() {
                    tracing::info!(
                        account_id,
                        count = record.count,
                        max_daily = record.max_daily,
                        "Upload refused: daily limit reached"
                    );
                    return Err(AppError::PermissionDenied(
                        "Daily upload limit reached".to_string(),
                    ));
                }
                let count = record.count + 1;
                let write = match doc {
                    Some(_) => Write::update(path.clone(), [("count", Value::from(count))]),
                    None => Write::merge(
                        path.clone(),
                        usage_fields(&UsageLimitRecord { count, ..record })?,
                    ),
                };
                Ok(vec![write])
            })
            .await?;

        let record = match seen {
            Some(doc) => doc.decode::<UsageLimitRecord>()?,
            None => {
                tracing::info!(account_id, "Created missing usage record");
                fresh
            }
        };
        let updated = UsageLimitRecord {
            count: record.count + 1,
            ..record
        };
        tracing::debug!(account_id, count = updated.count, "Recorded upload");

        Ok(UploadStatus {
            count: updated.count,
            max_daily: updated.max_daily,
            remaining: if capped { updated.remaining() } else { None },
        })
    }
}

/// Fields of a fresh usage record, for merge writes.
pub(crate) fn usage_fields(record: &UsageLimitRecord) -> Result<Vec<(&'static str, Value)>> {
    let mut fields = vec![
        ("count", to_field_value(&record.count)?),
        ("maxDaily", to_field_value(&record.max_daily)?),
    ];
    if let Some(user_id) = &record.user_id {
        fields.push(("userId", to_field_value(user_id)?));
    }
    if let Some(date) = record.date {
        fields.push(("date", format_utc_rfc3339(date).into()));
    }
    if let Some(last_reset) = record.last_reset {
        fields.push(("lastReset", format_utc_rfc3339(last_reset).into()));
    }
    Ok(fields)
}
