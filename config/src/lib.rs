//! # Configuration System
//!
//! Centralized configuration for the portrait generation workspace.
//!
//! This crate provides:
//! - Configuration structures for every subsystem
//! - Environment variable overrides (12-factor app principles)
//! - Configuration file loading (TOML/YAML)
//! - Precedence resolution (env > file > defaults)
//! - Startup-time validation

pub mod config;
pub mod file_loader;
pub mod loader;
pub mod precedence;
pub mod validation;

pub use config::{
    BackupConfig, CacheConfig, Config, GenerationConfig, ObservabilityConfig, ProviderConfig,
    ProviderKind, RateLimitConfig, RateLimitMode, RetryConfig, parse_image_size
};
pub use file_loader::{ConfigFileError, load_from_file, load_from_toml, load_from_yaml};
pub use loader::{apply_env_overrides, load_from_env};
pub use precedence::load;
pub use validation::validate;
