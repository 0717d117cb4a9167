//! # Configuration File Loading
//!
//! Loads configuration from TOML or YAML files, detecting the format from the
//! file extension.

use crate::config::Config;
use errors::PortraitError;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(String),

    #[error("Failed to parse YAML: {0}")]
    YamlParse(String),

    #[error("Config file has no extension")]
    NoExtension,

    #[error("Unsupported config file format: {0}")]
    UnsupportedFormat(String)
}

impl From<ConfigFileError> for PortraitError {
    fn from(err: ConfigFileError) -> Self {
        PortraitError::configuration(err.to_string())
    }
}

pub fn load_from_toml(path: &Path) -> Result<Config, ConfigFileError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|_e| ConfigFileError::FileNotFound(path.display().to_string()))?;

    toml::from_str(&contents).map_err(|e| ConfigFileError::TomlParse(e.to_string()))
}

pub fn load_from_yaml(path: &Path) -> Result<Config, ConfigFileError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|_e| ConfigFileError::FileNotFound(path.display().to_string()))?;

    serde_yaml::from_str(&contents).map_err(|e| ConfigFileError::YamlParse(e.to_string()))
}

/// Load configuration from `.toml`, `.yaml` or `.yml` files.
pub fn load_from_file(path: &Path) -> Result<Config, ConfigFileError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or(ConfigFileError::NoExtension)?;

    match extension.to_lowercase().as_str() {
        "toml" => load_from_toml(path),
        "yaml" | "yml" => load_from_yaml(path),
        other => Err(ConfigFileError::UnsupportedFormat(other.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitMode;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_file(suffix: &str, contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_toml() {
        let file = temp_file(
            ".toml",
            r#"
[provider]
model = "gpt-image-1"
image_size = "1024x1536"

[rate_limit]
requests_per_minute = 20
burst_capacity = 4
mode = "reject"

[backup]
backup_dir = "/srv/backups"
max_backups = 3
"#
        );

        let config = load_from_file(file.path()).unwrap();
        assert_eq!(config.provider.model, "gpt-image-1");
        assert_eq!(config.provider.dimensions(), Some((1024, 1536)));
        assert_eq!(config.rate_limit.mode, RateLimitMode::Reject);
        assert_eq!(config.backup.max_backups, 3);
        assert_eq!(config.retry.max_retries, 3);
    }

    #[test]
    fn test_load_yaml() {
        let file = temp_file(
            ".yml",
            "retry:\n  max_retries: 5\n  retry_delay_ms: 250\ncache:\n  enabled: false\n"
        );

        let config = load_from_file(file.path()).unwrap();
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.retry_delay_ms, 250);
        assert!(!config.cache.enabled);
    }

    #[test]
    fn test_unsupported_extension() {
        let file = temp_file(".ini", "key=value");
        assert!(matches!(
            load_from_file(file.path()),
            Err(ConfigFileError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = load_from_file(Path::new("/nonexistent/portraits.toml")).unwrap_err();
        assert!(matches!(err, ConfigFileError::FileNotFound(_)));
        assert!(matches!(
            PortraitError::from(err),
            PortraitError::Configuration { .. }
        ));
    }

    #[test]
    fn test_invalid_toml() {
        let file = temp_file(".toml", "[rate_limit\nrequests_per_minute = ");
        assert!(matches!(
            load_from_file(file.path()),
            Err(ConfigFileError::TomlParse(_))
        ));
    }
}
