// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod authz;
pub mod onboarding;
pub mod payments;
pub mod subscription;
pub mod usage;

pub use authz::Authorizer;
pub use onboarding::{OnboardingResult, OnboardingService};
pub use payments::{PaymentProcessor, RenewalOutcome, UnverifiedPayments};
pub use subscription::{SubscriptionAccess, SubscriptionService, UpgradeResult, UpgradeVerification};
pub use usage::{UploadGate, UploadStatus};
