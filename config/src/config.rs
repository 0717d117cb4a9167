//! # Configuration Structures
//!
//! All configuration structures for the portrait generation workspace.
//!
//! Every structure:
//! - Uses `serde` with per-field defaults so partial files are accepted
//! - Uses `validator` for range and format checks
//! - Exposes `Duration`/`PathBuf` helpers so callers never convert units

use errors::PortraitError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

/// Top-level configuration aggregating every subsystem.
///
/// ## Usage
/// ```rust,no_run
/// use config::Config;
///
/// let config = Config::default();
/// println!("Generating {} images per minute", config.rate_limit.requests_per_minute);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default, PartialEq)]
pub struct Config {
    /// Upstream image-generation provider
    #[serde(default)]
    #[validate(nested)]
    pub provider: ProviderConfig,

    /// Client-side token bucket
    #[serde(default)]
    #[validate(nested)]
    pub rate_limit: RateLimitConfig,

    /// Backoff policy for transient provider failures
    #[serde(default)]
    #[validate(nested)]
    pub retry: RetryConfig,

    /// Filesystem artifact cache
    #[serde(default)]
    pub cache: CacheConfig,

    /// Snapshot backups of the artifact directory
    #[serde(default)]
    #[validate(nested)]
    pub backup: BackupConfig,

    /// Batch generation settings
    #[serde(default)]
    #[validate(nested)]
    pub generation: GenerationConfig,

    /// Logging settings
    #[serde(default)]
    #[validate(nested)]
    pub observability: ObservabilityConfig
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    OpenAi,
    AzureOpenAi
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::OpenAi => write!(f, "open_ai"),
            ProviderKind::AzureOpenAi => write!(f, "azure_open_ai")
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = PortraitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open_ai" | "openai" => Ok(ProviderKind::OpenAi),
            "azure_open_ai" | "azure_openai" | "azure" => Ok(ProviderKind::AzureOpenAi),
            _ => Err(PortraitError::configuration(format!(
                "Unknown provider kind: {}. Valid options: open_ai, azure_open_ai",
                s
            )))
        }
    }
}

/// Provider connection settings.
///
/// `api_key` is never printed by the `Debug` implementation.
#[derive(Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct ProviderConfig {
    #[serde(default)]
    pub kind: ProviderKind,

    #[serde(default = "default_base_url")]
    #[validate(custom(function = "validate_http_url"))]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_model")]
    #[validate(length(min = 1, max = 128))]
    pub model: String,

    /// Requested image dimensions as `WIDTHxHEIGHT`
    #[serde(default = "default_image_size")]
    #[validate(custom(function = "validate_image_size"))]
    pub image_size: String,

    /// API version query parameter, used by Azure deployments only
    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default = "default_timeout_seconds")]
    #[validate(range(min = 1, max = 600))]
    pub timeout_seconds: u64
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "dall-e-3".to_string()
}

fn default_image_size() -> String {
    "1024x1024".to_string()
}

fn default_api_version() -> String {
    "2024-02-01".to_string()
}

fn default_timeout_seconds() -> u64 {
    60
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            base_url: default_base_url(),
            api_key: String::new(),
            model: default_model(),
            image_size: default_image_size(),
            api_version: default_api_version(),
            timeout_seconds: default_timeout_seconds()
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("image_size", &self.image_size)
            .field("api_version", &self.api_version)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Parsed `(width, height)`, `None` when `image_size` is malformed.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        parse_image_size(&self.image_size)
    }

    /// Copy of this configuration safe to print.
    pub fn redacted(&self) -> Self {
        Self {
            api_key: redact(&self.api_key).to_string(),
            ..self.clone()
        }
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() { "" } else { "***" }
}

/// Parse `WIDTHxHEIGHT` (either `x` case), both dimensions non-zero.
pub fn parse_image_size(value: &str) -> Option<(u32, u32)> {
    let (width, height) = value.trim().split_once(['x', 'X'])?;
    let width: u32 = width.trim().parse().ok()?;
    let height: u32 = height.trim().parse().ok()?;
    if width == 0 || height == 0 {
        return None;
    }
    Some((width, height))
}

fn validate_image_size(value: &str) -> Result<(), validator::ValidationError> {
    match parse_image_size(value) {
        Some(_) => Ok(()),
        None => Err(validator::ValidationError::new("image_size must be WIDTHxHEIGHT"))
    }
}

fn validate_http_url(value: &str) -> Result<(), validator::ValidationError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(validator::ValidationError::new("base_url must be an http(s) URL"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitMode {
    /// Block until a token is available.
    #[default]
    Wait,
    /// Fail with `RateLimitExceeded` when no token is available.
    Reject
}

impl std::str::FromStr for RateLimitMode {
    type Err = PortraitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "wait" | "block" => Ok(RateLimitMode::Wait),
            "reject" | "fail" => Ok(RateLimitMode::Reject),
            _ => Err(PortraitError::configuration(format!(
                "Unknown rate limit mode: {}. Valid options: wait, reject",
                s
            )))
        }
    }
}

/// Token bucket settings.
///
/// `burst_capacity` may not exceed `requests_per_minute`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[validate(schema(function = "validate_burst_within_rate"))]
pub struct RateLimitConfig {
    #[serde(default = "default_requests_per_minute")]
    #[validate(range(min = 1, max = 10000))]
    pub requests_per_minute: u32,

    #[serde(default = "default_burst_capacity")]
    #[validate(range(min = 1, max = 10000))]
    pub burst_capacity: u32,

    #[serde(default)]
    pub mode: RateLimitMode
}

fn default_requests_per_minute() -> u32 {
    5
}

fn default_burst_capacity() -> u32 {
    5
}

fn validate_burst_within_rate(config: &RateLimitConfig) -> Result<(), validator::ValidationError> {
    if config.burst_capacity > config.requests_per_minute {
        return Err(validator::ValidationError::new(
            "burst_capacity must not exceed requests_per_minute"
        ));
    }
    Ok(())
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: default_requests_per_minute(),
            burst_capacity: default_burst_capacity(),
            mode: RateLimitMode::default()
        }
    }
}

/// Exponential backoff settings.
///
/// `max_retries` is the total number of provider attempts; `0` behaves like
/// `1` (a single attempt, no retry).
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    #[validate(range(max = 20))]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    #[serde(default = "default_multiplier")]
    #[validate(range(min = 1.0, max = 10.0))]
    pub multiplier: f64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_max_delay_ms() -> u64 {
    30000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            multiplier: default_multiplier(),
            max_delay_ms: default_max_delay_ms()
        }
    }
}

impl RetryConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct BackupConfig {
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,

    /// Snapshot the images directory after every batch
    #[serde(default = "default_true")]
    pub auto_backup: bool,

    /// Snapshots retained, `0` means unlimited
    #[serde(default = "default_max_backups")]
    #[validate(range(max = 10000))]
    pub max_backups: usize,

    /// Whether restores overwrite existing images by default
    #[serde(default)]
    pub default_overwrite: bool
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from("./backups")
}

fn default_max_backups() -> usize {
    10
}

fn default_true() -> bool {
    true
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            backup_dir: default_backup_dir(),
            auto_backup: true,
            max_backups: default_max_backups(),
            default_overwrite: false
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct GenerationConfig {
    #[serde(default = "default_images_dir")]
    pub images_dir: PathBuf,

    /// Profiles generated concurrently in batch mode
    #[serde(default = "default_max_concurrency")]
    #[validate(range(min = 1, max = 64))]
    pub max_concurrency: usize
}

fn default_images_dir() -> PathBuf {
    PathBuf::from("./images")
}

fn default_max_concurrency() -> usize {
    4
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            images_dir: default_images_dir(),
            max_concurrency: default_max_concurrency()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct ObservabilityConfig {
    #[serde(default = "default_logging_level")]
    #[validate(custom(function = "validate_logging_level"))]
    pub logging_level: String
}

fn default_logging_level() -> String {
    "info".to_string()
}

fn validate_logging_level(value: &str) -> Result<(), validator::ValidationError> {
    match value {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(validator::ValidationError::new("Invalid logging level"))
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            logging_level: default_logging_level()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.provider.kind, ProviderKind::OpenAi);
        assert_eq!(config.provider.image_size, "1024x1024");
        assert_eq!(config.rate_limit.requests_per_minute, 5);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.initial_delay(), Duration::from_millis(1000));
        assert_eq!(config.retry.max_delay(), Duration::from_millis(30000));
        assert!(config.cache.enabled);
        assert!(config.backup.auto_backup);
        assert_eq!(config.backup.max_backups, 10);
        assert!(!config.backup.default_overwrite);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_image_size_parsing() {
        assert_eq!(parse_image_size("1024x1792"), Some((1024, 1792)));
        assert_eq!(parse_image_size("512X512"), Some((512, 512)));
        assert_eq!(parse_image_size("0x512"), None);
        assert_eq!(parse_image_size("large"), None);
        assert_eq!(parse_image_size("1024x"), None);
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let provider = ProviderConfig {
            api_key: "sk-live-secret".to_string(),
            ..ProviderConfig::default()
        };
        let printed = format!("{:?}", provider);
        assert!(!printed.contains("sk-live-secret"));
        assert!(printed.contains("***"));
        assert_eq!(provider.redacted().api_key, "***");
    }

    #[test]
    fn test_provider_kind_from_str() {
        assert_eq!(ProviderKind::from_str("OpenAI").unwrap(), ProviderKind::OpenAi);
        assert_eq!(
            ProviderKind::from_str("azure").unwrap(),
            ProviderKind::AzureOpenAi
        );
        assert!(matches!(
            ProviderKind::from_str("midjourney"),
            Err(PortraitError::Configuration { .. })
        ));
    }

    #[test]
    fn test_rate_limit_mode_from_str() {
        assert_eq!(RateLimitMode::from_str("wait").unwrap(), RateLimitMode::Wait);
        assert_eq!(
            RateLimitMode::from_str("REJECT").unwrap(),
            RateLimitMode::Reject
        );
        assert!(RateLimitMode::from_str("sometimes").is_err());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str(
            "rate_limit:\n  requests_per_minute: 12\nprovider:\n  kind: azure_open_ai\n"
        )
        .unwrap();
        assert_eq!(config.rate_limit.requests_per_minute, 12);
        assert_eq!(config.rate_limit.burst_capacity, 5);
        assert_eq!(config.provider.kind, ProviderKind::AzureOpenAi);
        assert_eq!(config.provider.model, "dall-e-3");
    }
}
