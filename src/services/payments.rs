// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Payment processor boundary.
//!
//! Subscription changes and renewals go through [`PaymentProcessor`]; the
//! rest of the crate never talks to a payment provider directly.

use crate::error::{AppError, Result};
use crate::models::{Subscription, Tier};
use crate::time_utils::format_utc_rfc3339;
use async_trait::async_trait;

/// Result of attempting to charge a renewal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenewalOutcome {
    /// Charged; the subscription continues for another period.
    Renewed { payment_id: String },
    /// The charge was refused.
    Declined { reason: String },
    /// The processor cannot charge renewals.
    Unsupported,
}

/// Verifies purchases and charges renewals.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Confirm that `payment_id` paid for `tier` on behalf of `account_id`.
    async fn verify(&self, account_id: &str, tier: Tier, payment_id: &str) -> Result<()>;

    /// Try to charge the next period of an auto-renewing subscription.
    ///
    /// Calls for the same period carry the same `idempotency_key`; the
    /// processor must charge at most once per key.
    async fn renew(
        &self,
        account_id: &str,
        subscription: &Subscription,
        idempotency_key: &str,
    ) -> Result<RenewalOutcome>;
}

/// Idempotency key for renewing the period that ends at the subscription's
/// current end date. It changes only once a renewal has been recorded.
pub fn renewal_key(account_id: &str, subscription: &Subscription) -> String {
    let period_end = subscription
        .end_date
        .map(format_utc_rfc3339)
        .unwrap_or_else(|| "open".to_string());
    format!("renew:{account_id}:{period_end}")
}

/// Processor used when no payment provider is configured.
///
/// Accepts any non-empty payment reference and never renews, so expired
/// auto-renewing subscriptions are downgraded.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnverifiedPayments;

#[async_trait]
impl PaymentProcessor for UnverifiedPayments {
    async fn verify(&self, account_id: &str, tier: Tier, payment_id: &str) -> Result<()> {
        if payment_id.trim().is_empty() {
            return Err(AppError::InvalidArgument(
                "Payment reference is required".to_string(),
            ));
        }
        tracing::warn!(
            account_id,
            %tier,
            payment_id,
            "Accepting payment reference without processor verification"
        );
        Ok(())
    }

    async fn renew(
        &self,
        account_id: &str,
        _subscription: &Subscription,
        _idempotency_key: &str,
    ) -> Result<RenewalOutcome> {
        tracing::debug!(account_id, "Renewal charging not available");
        Ok(RenewalOutcome::Unsupported)
    }
}
