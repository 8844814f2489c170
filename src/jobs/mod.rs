// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Scheduled maintenance jobs.
//!
//! Every job is a [`Reconciliation`] run by [`JobRunner`]. [`JobKind`] names
//! the canonical set, used by the scheduler and the `/jobs/{name}` endpoint.

pub mod migration;
pub mod reconcile;
pub mod recommendations;
pub mod retention;
pub mod runner;
pub mod structure;
pub mod subscription_expiry;
pub mod trial_expiry;
pub mod usage_reset;

pub use reconcile::{CommitScope, FailurePolicy, JobContext, Plan, Reconciliation};
pub use runner::{JobReport, JobRunner, JobStatus};

use crate::services::PaymentProcessor;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// The canonical maintenance jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    DataRetentionCleanup,
    NutrientRecommendations,
    SubscriptionExpirySweep,
    TrialExpirySweep,
    UsageCounterReset,
    UserDataMigration,
    UserStructureValidation,
}

impl JobKind {
    pub const ALL: [JobKind; 7] = [
        JobKind::DataRetentionCleanup,
        JobKind::NutrientRecommendations,
        JobKind::SubscriptionExpirySweep,
        JobKind::TrialExpirySweep,
        JobKind::UsageCounterReset,
        JobKind::UserDataMigration,
        JobKind::UserStructureValidation,
    ];

    pub fn name(self) -> &'static str {
        match self {
            JobKind::DataRetentionCleanup => "data_retention_cleanup",
            JobKind::NutrientRecommendations => "nutrient_recommendations",
            JobKind::SubscriptionExpirySweep => "subscription_expiry_sweep",
            JobKind::TrialExpirySweep => "trial_expiry_sweep",
            JobKind::UsageCounterReset => "usage_counter_reset",
            JobKind::UserDataMigration => "user_data_migration",
            JobKind::UserStructureValidation => "user_structure_validation",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("unknown job: {s}"))
    }
}

/// Build the job for `kind`, wiring in its dependencies.
pub fn build_job(kind: JobKind, payments: Arc<dyn PaymentProcessor>) -> Box<dyn Reconciliation> {
    match kind {
        JobKind::DataRetentionCleanup => Box::new(retention::DataRetentionCleanup),
        JobKind::NutrientRecommendations => Box::new(recommendations::NutrientRecommendations),
        JobKind::SubscriptionExpirySweep => {
            Box::new(subscription_expiry::SubscriptionExpirySweep::new(payments))
        }
        JobKind::TrialExpirySweep => Box::new(trial_expiry::TrialExpirySweep),
        JobKind::UsageCounterReset => Box::new(usage_reset::UsageCounterReset),
        JobKind::UserDataMigration => Box::new(migration::UserDataMigration),
        JobKind::UserStructureValidation => Box::new(structure::UserStructureValidation),
    }
}
