// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily nutrient recommendations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Foods suggested per macro category.
const FOOD_SUGGESTIONS: &[(&str, [&str; 3])] = &[
    ("fat", ["Avocado", "Nuts", "Olive Oil"]),
    ("protein", ["Chicken", "Eggs", "Tofu"]),
    ("carbs", ["Quinoa", "Sweet Potatoes", "Brown Rice"]),
];

/// Suggestion list for a macro, if it has one (`calories` does not).
pub fn food_suggestions(macro_name: &str) -> Option<&'static [&'static str; 3]> {
    FOOD_SUGGESTIONS
        .iter()
        .find(|(name, _)| *name == macro_name)
        .map(|(_, foods)| foods)
}

/// Recommendation stored at `users/{account_id}/recommendations/{YYYY-MM-DD}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationEntry {
    /// Day the recommendation covers (`YYYY-MM-DD`), also the document id
    pub date: String,
    /// Shortfall per macro (target minus actual), only for macros below target
    pub missing_nutrients: BTreeMap<String, f64>,
    pub suggested_foods: Vec<String>,
}

/// Per-day aggregate stored at `users/{account_id}/calendar/{YYYY-MM-DD}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    #[serde(default)]
    pub daily_macros: BTreeMap<String, f64>,
}

/// Shortfall of `actual` against `targets`, per macro.
///
/// Macros missing from `actual` count as zero intake.
pub fn missing_nutrients(
    targets: &BTreeMap<String, f64>,
    actual: &BTreeMap<String, f64>,
) -> BTreeMap<String, f64> {
    targets
        .iter()
        .filter_map(|(name, target)| {
            let eaten = actual.get(name).copied().unwrap_or(0.0);
            (eaten < *target).then(|| (name.clone(), target - eaten))
        })
        .collect()
}
