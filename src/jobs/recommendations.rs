// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily nutrient recommendations from yesterday's intake.

use crate::db::{collections, get_as, CollectionPath, Document, Write};
use crate::error::Result;
use crate::jobs::{JobContext, Plan, Reconciliation};
use crate::models::recommendation::{food_suggestions, missing_nutrients};
use crate::models::{CalendarDay, RecommendationEntry, UserAccount};
use crate::time_utils::{date_key, yesterday_in};
use async_trait::async_trait;
use rand::seq::IndexedRandom;

/// Compares yesterday's calendar totals (in the configured time zone) with
/// the account's macro targets and upserts `recommendations/{date}` with
/// the shortfall and one suggested food per short macro.
pub struct NutrientRecommendations;

#[async_trait]
impl Reconciliation for NutrientRecommendations {
    fn name(&self) -> &'static str {
        "nutrient_recommendations"
    }

    fn collection(&self) -> CollectionPath {
        CollectionPath::root(collections::USERS)
    }

    async fn plan(&self, ctx: &JobContext, doc: &Document) -> Result<Plan> {
        let account: UserAccount = doc.decode()?;
        let Some(targets) = account.target_macros.filter(|t| !t.is_empty()) else {
            return Ok(Plan::skip("no target macros"));
        };

        let date = date_key(yesterday_in(ctx.now, &ctx.settings.recommendation_time_zone));
        let calendar = doc.path.subcollection(collections::CALENDAR).doc(date.clone());
        let Some(day) = get_as::<CalendarDay>(ctx.store(), &calendar).await? else {
            return Ok(Plan::skip(format!("no calendar data for {date}")));
        };

        let missing = missing_nutrients(&targets, &day.daily_macros);
        let suggested_foods = {
            let mut rng = rand::rng();
            missing
                .keys()
                .filter_map(|name| food_suggestions(name)?.choose(&mut rng))
                .map(|food| food.to_string())
                .collect()
        };

        let entry = RecommendationEntry {
            date: date.clone(),
            missing_nutrients: missing,
            suggested_foods,
        };
        tracing::debug!(
            account_id = doc.id(),
            date = %date,
            suggested = ?entry.suggested_foods,
            "Planned recommendation"
        );

        let path = doc.path.subcollection(collections::RECOMMENDATIONS).doc(date);
        Ok(Plan::Stage(vec![Write::set(path, &entry)?]))
    }
}
