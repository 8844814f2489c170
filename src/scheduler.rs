// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process job scheduler.
//!
//! Registers every [`JobKind`] on its schedule. Disable it with
//! `SCHEDULER_ENABLED=false` when an external scheduler calls `/jobs/*`.

use crate::jobs::{JobKind, JobRunner};
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

const DAILY: Duration = Duration::from_secs(24 * 60 * 60);

/// When a job fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Fixed interval from scheduler start.
    Every(Duration),
    /// 6-field cron expression (with seconds), in UTC.
    Cron(&'static str),
    /// 6-field cron expression in the given time zone.
    CronTz(&'static str, Tz),
}

/// Schedule of each job.
pub fn schedule_for(kind: JobKind, recommendation_tz: Tz) -> Schedule {
    match kind {
        JobKind::DataRetentionCleanup
        | JobKind::SubscriptionExpirySweep
        | JobKind::UsageCounterReset => Schedule::Every(DAILY),
        JobKind::TrialExpirySweep | JobKind::UserDataMigration => Schedule::Cron("0 0 0 * * *"),
        JobKind::UserStructureValidation => Schedule::Cron("0 0 12 * * *"),
        JobKind::NutrientRecommendations => Schedule::CronTz("0 0 6 * * *", recommendation_tz),
    }
}

/// Builds and starts the scheduler.
///
/// The returned handle must be kept alive for the lifetime of the process;
/// dropping it shuts down all jobs.
pub async fn build_scheduler(
    runner: Arc<JobRunner>,
    recommendation_tz: Tz,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    for kind in JobKind::ALL {
        let schedule = schedule_for(kind, recommendation_tz);
        scheduler.add(make_job(kind, schedule, runner.clone())?).await?;
        tracing::info!(job = %kind, schedule = ?schedule, "Registered scheduled job");
    }

    scheduler.start().await?;
    Ok(scheduler)
}

fn make_job(
    kind: JobKind,
    schedule: Schedule,
    runner: Arc<JobRunner>,
) -> Result<Job, JobSchedulerError> {
    let run = move |_uuid: uuid::Uuid, _lock: JobScheduler| {
        let runner = Arc::clone(&runner);
        Box::pin(async move {
            // The report is logged by the runner; nothing consumes it here.
            runner.run_kind(kind).await;
        }) as std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>
    };

    match schedule {
        Schedule::Every(interval) => Job::new_repeated_async(interval, run),
        Schedule::Cron(expr) => Job::new_async(expr, run),
        Schedule::CronTz(expr, tz) => Job::new_async_tz(expr, tz, run),
    }
}
