//! # Environment Variable Loader
//!
//! Applies environment variable overrides on top of an existing
//! configuration, following 12-factor app principles.
//!
//! # Naming Convention
//! - `PROVIDER_*`: upstream provider settings
//! - `RATE_LIMIT_*`: client-side token bucket
//! - `RETRY_*`: backoff policy
//! - `CACHE_*`: artifact cache
//! - `BACKUP_*`: snapshot backups
//! - `GENERATION_*`: batch generation
//! - `LOG_LEVEL`: logging level

use crate::config::{Config, ProviderKind, RateLimitMode};
use errors::PortraitError;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;

/// Load configuration from defaults plus environment variables.
///
/// ## Environment Variables
/// ### Provider (`PROVIDER_*`)
/// - `PROVIDER_KIND`: `open_ai` or `azure_open_ai`
/// - `PROVIDER_BASE_URL`, `PROVIDER_MODEL`, `PROVIDER_IMAGE_SIZE`,
///   `PROVIDER_API_VERSION`, `PROVIDER_TIMEOUT_SECONDS`
/// - `PROVIDER_API_KEY` (falls back to `OPENAI_API_KEY`)
///
/// ### Rate limiting (`RATE_LIMIT_*`)
/// - `RATE_LIMIT_REQUESTS_PER_MINUTE`, `RATE_LIMIT_BURST_CAPACITY`
/// - `RATE_LIMIT_MODE`: `wait` or `reject`
///
/// ### Retry (`RETRY_*`)
/// - `RETRY_MAX_RETRIES`, `RETRY_DELAY_MS`, `RETRY_MULTIPLIER`,
///   `RETRY_MAX_DELAY_MS`
///
/// ### Cache, backup and generation
/// - `CACHE_ENABLED`
/// - `BACKUP_DIR`, `BACKUP_AUTO`, `BACKUP_MAX_BACKUPS`,
///   `BACKUP_DEFAULT_OVERWRITE`
/// - `GENERATION_IMAGES_DIR`, `GENERATION_MAX_CONCURRENCY`
pub fn load_from_env() -> Result<Config, PortraitError> {
    let mut config = Config::default();
    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Overwrite every field whose environment variable is set.
///
/// Returns the names of the variables that were applied.
pub fn apply_env_overrides(config: &mut Config) -> Result<Vec<&'static str>, PortraitError> {
    let mut applied = Vec::new();

    override_parsed::<ProviderKind>("PROVIDER_KIND", &mut config.provider.kind, &mut applied)?;
    override_string("PROVIDER_BASE_URL", &mut config.provider.base_url, &mut applied);
    override_string("PROVIDER_MODEL", &mut config.provider.model, &mut applied);
    override_string("PROVIDER_IMAGE_SIZE", &mut config.provider.image_size, &mut applied);
    override_string("PROVIDER_API_VERSION", &mut config.provider.api_version, &mut applied);
    override_parsed(
        "PROVIDER_TIMEOUT_SECONDS",
        &mut config.provider.timeout_seconds,
        &mut applied
    )?;
    if !override_string("PROVIDER_API_KEY", &mut config.provider.api_key, &mut applied) {
        override_string("OPENAI_API_KEY", &mut config.provider.api_key, &mut applied);
    }

    override_parsed(
        "RATE_LIMIT_REQUESTS_PER_MINUTE",
        &mut config.rate_limit.requests_per_minute,
        &mut applied
    )?;
    override_parsed(
        "RATE_LIMIT_BURST_CAPACITY",
        &mut config.rate_limit.burst_capacity,
        &mut applied
    )?;
    override_parsed::<RateLimitMode>("RATE_LIMIT_MODE", &mut config.rate_limit.mode, &mut applied)?;

    override_parsed("RETRY_MAX_RETRIES", &mut config.retry.max_retries, &mut applied)?;
    override_parsed("RETRY_DELAY_MS", &mut config.retry.retry_delay_ms, &mut applied)?;
    override_parsed("RETRY_MULTIPLIER", &mut config.retry.multiplier, &mut applied)?;
    override_parsed("RETRY_MAX_DELAY_MS", &mut config.retry.max_delay_ms, &mut applied)?;

    override_parsed("CACHE_ENABLED", &mut config.cache.enabled, &mut applied)?;

    override_path("BACKUP_DIR", &mut config.backup.backup_dir, &mut applied);
    override_parsed("BACKUP_AUTO", &mut config.backup.auto_backup, &mut applied)?;
    override_parsed("BACKUP_MAX_BACKUPS", &mut config.backup.max_backups, &mut applied)?;
    override_parsed(
        "BACKUP_DEFAULT_OVERWRITE",
        &mut config.backup.default_overwrite,
        &mut applied
    )?;

    override_path(
        "GENERATION_IMAGES_DIR",
        &mut config.generation.images_dir,
        &mut applied
    );
    override_parsed(
        "GENERATION_MAX_CONCURRENCY",
        &mut config.generation.max_concurrency,
        &mut applied
    )?;

    override_string(
        "LOG_LEVEL",
        &mut config.observability.logging_level,
        &mut applied
    );

    Ok(applied)
}

fn read_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn override_string(name: &'static str, target: &mut String, applied: &mut Vec<&'static str>) -> bool {
    match read_var(name) {
        Some(value) => {
            debug!(variable = name, "Applying environment override");
            *target = value;
            applied.push(name);
            true
        }
        None => false
    }
}

fn override_path(name: &'static str, target: &mut PathBuf, applied: &mut Vec<&'static str>) {
    if let Some(value) = read_var(name) {
        debug!(variable = name, "Applying environment override");
        *target = PathBuf::from(value);
        applied.push(name);
    }
}

fn override_parsed<T>(
    name: &'static str,
    target: &mut T,
    applied: &mut Vec<&'static str>
) -> Result<(), PortraitError>
where
    T: FromStr,
    T::Err: std::fmt::Display
{
    if let Some(value) = read_var(name) {
        *target = value.trim().parse::<T>().map_err(|e| {
            PortraitError::configuration(format!("Invalid value for {}: {} ({})", name, value, e))
        })?;
        debug!(variable = name, "Applying environment override");
        applied.push(name);
    }
    Ok(())
}
