//! # Configuration Precedence
//!
//! # Precedence Order
//! 1. Environment variables (highest priority)
//! 2. Configuration file
//! 3. Default values (lowest priority)

use crate::config::Config;
use crate::file_loader::load_from_file;
use crate::loader::apply_env_overrides;
use crate::validation::validate;
use errors::PortraitError;
use std::path::Path;
use tracing::{debug, info};

/// Resolve the effective configuration and validate it.
///
/// ## Usage
/// ```rust,no_run
/// use std::path::Path;
///
/// let config = config::load(Some(Path::new("portraits.toml"))).expect("invalid configuration");
/// println!("Images stored in {}", config.generation.images_dir.display());
/// ```
pub fn load(path: Option<&Path>) -> Result<Config, PortraitError> {
    let mut config = match path {
        Some(path) => {
            let config = load_from_file(path)?;
            info!(path = %path.display(), "Loaded configuration file");
            config
        }
        None => Config::default()
    };

    let applied = apply_env_overrides(&mut config)?;
    if !applied.is_empty() {
        debug!(overrides = ?applied, "Environment overrides applied");
    }

    validate(&config)?;
    Ok(config)
}
