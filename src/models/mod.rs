// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod meal;
pub mod notification;
pub mod recommendation;
pub mod subscription;
pub mod usage;
pub mod user;

pub use meal::MealLogEntry;
pub use notification::{NotificationEntry, NotificationKind};
pub use recommendation::{CalendarDay, RecommendationEntry};
pub use subscription::{FeatureBundle, Subscription, Tier};
pub use usage::UsageLimitRecord;
pub use user::{Role, UserAccount};

use crate::error::AppError;
use serde::Serialize;
use serde_json::Value;

/// Serialize a model for use as a field value in a write.
pub fn to_field_value<T: Serialize>(value: &T) -> Result<Value, AppError> {
    serde_json::to_value(value)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize field value: {}", e)))
}
