//! Application configuration loaded from environment variables.
//!
//! Built once in `main` and shared through `AppState`; nothing reads the
//! environment after startup.

use std::env;

/// Which document store backend to connect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    /// In-process store, for local runs without GCP credentials.
    Memory,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Document store backend
    pub store_backend: StoreBackend,
    /// Run the in-process cron scheduler. Disable when an external
    /// scheduler calls `/jobs/*` instead.
    pub scheduler_enabled: bool,

    // --- Secrets ---
    /// JWT signing key for callable requests (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Shared secret expected in `x-trigger-token` on `/jobs/*` and `/hooks/*`
    pub trigger_token: String,

    /// Maintenance job tuning
    pub jobs: JobSettings,
}

/// Constants that shape the maintenance jobs and account seeding.
#[derive(Debug, Clone)]
pub struct JobSettings {
    /// Meal log entries older than this are deleted.
    pub meal_retention_days: i64,
    /// Recommendation entries older than this are deleted.
    pub recommendation_retention_days: i64,
    /// Length of the free-tier photo upload trial.
    pub trial_days: i64,
    /// Uploads per day during the trial.
    pub trial_uploads_per_day: i64,
    /// `maxDaily` on newly seeded usage records.
    pub default_daily_limit: i64,
    /// Length of a paid subscription period.
    pub subscription_period_days: i64,
    /// Operations per atomic batch (store hard limit is 500).
    pub max_batch_operations: usize,
    /// Documents planned concurrently by one job run.
    pub max_concurrency: usize,
    /// Time zone the nutrient recommendation job runs in.
    pub recommendation_time_zone: chrono_tz::Tz,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            meal_retention_days: 90,
            recommendation_retention_days: 7,
            trial_days: 14,
            trial_uploads_per_day: 3,
            default_daily_limit: 8,
            subscription_period_days: 30,
            max_batch_operations: crate::db::batch::MAX_BATCH_OPERATIONS,
            max_concurrency: 50,
            recommendation_time_zone: chrono_tz::America::Chicago,
        }
    }
}

impl Config {
    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            store_backend: StoreBackend::Memory,
            scheduler_enabled: false,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            trigger_token: "test_trigger_token".to_string(),
            jobs: JobSettings::default(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Reads a `.env` file first if one is present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let store_backend = match env::var("STORE_BACKEND").as_deref() {
            Ok("memory") => StoreBackend::Memory,
            Ok("firestore") | Err(_) => StoreBackend::Firestore,
            Ok(_) => return Err(ConfigError::Invalid("STORE_BACKEND")),
        };

        let mut jobs = JobSettings::default();
        if let Ok(raw) = env::var("JOB_MAX_CONCURRENCY") {
            jobs.max_concurrency = raw
                .parse()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::Invalid("JOB_MAX_CONCURRENCY"))?;
        }
        if let Ok(raw) = env::var("MAX_BATCH_OPERATIONS") {
            jobs.max_batch_operations = raw
                .parse()
                .ok()
                .filter(|n| (1..=crate::db::batch::MAX_BATCH_OPERATIONS).contains(n))
                .ok_or(ConfigError::Invalid("MAX_BATCH_OPERATIONS"))?;
        }
        if let Ok(raw) = env::var("RECOMMENDATION_TIME_ZONE") {
            jobs.recommendation_time_zone = raw
                .parse()
                .map_err(|_| ConfigError::Invalid("RECOMMENDATION_TIME_ZONE"))?;
        }

        Ok(Self {
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            store_backend,
            scheduler_enabled: env::var("SCHEDULER_ENABLED")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),

            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            trigger_token: env::var("TRIGGER_TOKEN")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("TRIGGER_TOKEN"))?,

            jobs,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
