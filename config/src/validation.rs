//! # Configuration Validation
//!
//! Startup-time validation. Any rule violation is fatal and surfaces as
//! `PortraitError::Configuration` naming every offending field.

use crate::config::Config;
use errors::PortraitError;
use validator::Validate;

/// Validate the full configuration tree.
///
/// ## Validation Rules
/// - `provider.base_url`: http(s) URL
/// - `provider.image_size`: `WIDTHxHEIGHT`, both non-zero
/// - `provider.timeout_seconds`: 1-600
/// - `rate_limit.requests_per_minute`, `rate_limit.burst_capacity`: 1-10000,
///   burst not above the per-minute rate
/// - `retry.max_retries`: 0-20, `retry.multiplier`: 1.0-10.0
/// - `generation.max_concurrency`: 1-64
/// - `observability.logging_level`: trace/debug/info/warn/error
pub fn validate(config: &Config) -> Result<(), PortraitError> {
    config
        .validate()
        .map_err(|errors| PortraitError::configuration(errors.to_string()))
}
