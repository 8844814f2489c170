// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fills in required account fields.

use crate::db::{collections, CollectionPath, Document, Write};
use crate::error::Result;
use crate::jobs::{JobContext, Plan, Reconciliation};
use crate::models::{to_field_value, Subscription, Tier};
use crate::time_utils::format_utc_rfc3339;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Gives every account a full `subscription` map (normalizing the legacy
/// bare tier string), `createdAt`, `lastActive`, and `isTestUser`.
pub struct UserStructureValidation;

#[async_trait]
impl Reconciliation for UserStructureValidation {
    fn name(&self) -> &'static str {
        "user_structure_validation"
    }

    fn collection(&self) -> CollectionPath {
        CollectionPath::root(collections::USERS)
    }

    async fn plan(&self, ctx: &JobContext, doc: &Document) -> Result<Plan> {
        let now = json!(format_utc_rfc3339(ctx.now));
        let mut fields: Vec<(&str, Value)> = Vec::new();

        let subscription = match doc.field("subscription") {
            None | Some(Value::Null) => Some(Tier::Free),
            Some(Value::String(raw)) => Some(raw.parse().unwrap_or_else(|_| {
                tracing::warn!(account_id = doc.id(), tier = %raw, "Unknown legacy tier; using free");
                Tier::Free
            })),
            Some(_) => None,
        };
        if let Some(tier) = subscription {
            let normalized = Subscription {
                tier,
                features: tier.features(),
                updated_at: Some(ctx.now),
                ..Subscription::default()
            };
            fields.push(("subscription", to_field_value(&normalized)?));
        }

        for field in ["createdAt", "lastActive"] {
            if doc.field(field).map_or(true, Value::is_null) {
                fields.push((field, now.clone()));
            }
        }
        if doc.field("isTestUser").is_none() {
            fields.push(("isTestUser", json!(false)));
        }

        if fields.is_empty() {
            return Ok(Plan::skip("structure complete"));
        }
        tracing::debug!(
            account_id = doc.id(),
            fields = ?fields.iter().map(|(name, _)| *name).collect::<Vec<_>>(),
            "Filling missing account fields"
        );
        Ok(Plan::Stage(vec![Write::update(doc.path.clone(), fields)]))
    }
}
