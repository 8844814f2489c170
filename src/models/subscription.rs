// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Subscription tiers and their feature bundles.

use crate::time_utils::rfc3339_opt;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Subscription level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Premium,
    Professional,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Premium => "premium",
            Tier::Professional => "professional",
        }
    }

    /// The canonical feature bundle for this tier.
    pub fn features(self) -> FeatureBundle {
        FeatureBundle::for_tier(self)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Tier::Free),
            "premium" => Ok(Tier::Premium),
            "professional" => Ok(Tier::Professional),
            other => Err(format!("unknown tier: {other}")),
        }
    }
}

/// Feature flags derived from a tier. Never authored independently.
///
/// `-1` means unlimited for the numeric limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureBundle {
    pub max_meal_plans: i64,
    pub custom_meal_planning: bool,
    pub ai_nutrition_analysis: bool,
    pub export_data: bool,
    pub meal_reminders: bool,
    pub progress_analytics: bool,
    pub priority_support: bool,
    pub shopping_list_generation: bool,
    pub restaurant_guidance: bool,
    pub max_photo_uploads_per_day: i64,
}

impl FeatureBundle {
    pub fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::Free => Self {
                max_meal_plans: 1,
                custom_meal_planning: false,
                ai_nutrition_analysis: true,
                export_data: false,
                meal_reminders: false,
                progress_analytics: false,
                priority_support: false,
                shopping_list_generation: false,
                restaurant_guidance: false,
                max_photo_uploads_per_day: 5,
            },
            Tier::Premium => Self::paid(-1, 10),
            Tier::Professional => Self::paid(10, -1),
        }
    }

    fn paid(max_meal_plans: i64, max_photo_uploads_per_day: i64) -> Self {
        Self {
            max_meal_plans,
            custom_meal_planning: true,
            ai_nutrition_analysis: true,
            export_data: true,
            meal_reminders: true,
            progress_analytics: true,
            priority_support: true,
            shopping_list_generation: true,
            restaurant_guidance: true,
            max_photo_uploads_per_day,
        }
    }
}

impl Default for FeatureBundle {
    fn default() -> Self {
        Self::for_tier(Tier::Free)
    }
}

/// Subscription state, stored as the `subscription` map of a user document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(default)]
    pub tier: Tier,
    #[serde(default)]
    pub features: FeatureBundle,
    #[serde(default, with = "rfc3339_opt", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, with = "rfc3339_opt", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub auto_renew: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_payment_id: Option<String>,
    #[serde(default, with = "rfc3339_opt", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub upgraded_from_premium: bool,
}

impl Subscription {
    /// A fresh free-tier subscription with no end date.
    pub fn free() -> Self {
        Self::default()
    }

    /// Whether the subscription is past its end date at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.end_date.is_some_and(|end| end < now)
    }
}

/// Accept both the current map layout and the legacy bare tier string
/// (`"subscription": "free"`) written by older clients.
pub(crate) fn deserialize_lenient<'de, D>(d: D) -> Result<Option<Subscription>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Stored {
        Legacy(Tier),
        Full(Subscription),
    }

    Ok(match Option::<Stored>::deserialize(d)? {
        None => None,
        Some(Stored::Legacy(tier)) => Some(Subscription {
            tier,
            features: tier.features(),
            ..Subscription::default()
        }),
        Some(Stored::Full(sub)) => Some(sub),
    })
}
