//! License verification and usage quota enforcement.
//!
//! A [`Verifier`] checks RSA-signed license tokens, a [`LicenseManager`]
//! owns the single active [`License`] and answers SaaS quota and on-prem cap
//! checks, and a [`UsageTracker`] keeps monthly per-tenant counters. HTTP
//! policy (what to do when a check fails) belongs to the caller.

pub mod error;
pub mod license;
pub mod manager;
pub mod usage;
pub mod verifier;

pub use error::{LicenseError, UsageError};
pub use license::{License, LicenseClaims, LicenseLimits, LicenseType, PlanTier, RegisteredClaims};
pub use manager::{LicenseManager, OnPremMetric, SaasMetric, UnknownMetric};
pub use usage::{
    api_usage_key, InMemoryUsageTracker, RedisUsageTracker, UsageTracker, USAGE_KEY_TTL,
};
pub use verifier::{Verifier, ACCEPTED_ALGORITHMS};
