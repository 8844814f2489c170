// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (caller authentication and trigger secrets).

pub mod auth;
pub mod trigger;

pub use auth::require_auth;
pub use trigger::require_trigger_token;
