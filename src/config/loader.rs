//! Configuration loader
//!
//! Loading pipeline:
//! 1. Size check against [`LoaderOptions::max_config_size`]
//! 2. YAML parsing (an empty document means "all defaults")
//! 3. Deserialization to [`SignalConfig`]
//! 4. Validation of the cycle range

use std::path::{Path, PathBuf};

use serde_yaml::Value;
use tracing::debug;

use crate::config::schema::SignalConfig;
use crate::error::ConfigError;

/// Options for the configuration loader.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Maximum configuration file size in bytes.
    pub max_config_size: u64,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            max_config_size: env_or("TRAFFICLIGHT_MAX_CONFIG_SIZE", 64 * 1024),
        }
    }
}

/// Loads and validates `trafficlight` configuration files.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: LoaderOptions,
}

impl ConfigLoader {
    /// Creates a loader with the given options.
    #[must_use]
    pub const fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    /// Creates a loader with default options.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::default()
    }

    /// Loads, parses, and validates the file at `path`.
    ///
    /// # Errors
    ///
    /// - `ConfigError::MissingFile` if the file cannot be read.
    /// - `ConfigError::FileTooLarge` if it exceeds the size limit.
    /// - `ConfigError::ParseError` for malformed YAML or unknown fields.
    /// - `ConfigError::InvalidValue` for an invalid cycle range.
    pub fn load(&self, path: &Path) -> Result<SignalConfig, ConfigError> {
        let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;
        if metadata.len() > self.options.max_config_size {
            return Err(ConfigError::FileTooLarge {
                path: path.to_path_buf(),
                size: metadata.len(),
                limit: self.options.max_config_size,
            });
        }

        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;
        let config = parse(&raw, path)?;
        debug!(path = %path.display(), ?config, "configuration loaded");
        Ok(config)
    }

    /// Parses and validates configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load), minus the file errors.
    pub fn load_from_str(&self, yaml: &str) -> Result<SignalConfig, ConfigError> {
        parse(yaml, &PathBuf::from("<string>"))
    }
}

fn parse(raw: &str, path: &Path) -> Result<SignalConfig, ConfigError> {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);

    let root: Value = serde_yaml::from_str(raw).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        line: e.location().map(|l| l.line()),
        message: e.to_string(),
    })?;

    let config = if root.is_null() {
        SignalConfig::default()
    } else {
        serde_yaml::from_value(root).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            line: None,
            message: format!("failed to deserialize configuration: {e}"),
        })?
    };

    config.controller_config()?;
    Ok(config)
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::DeliveryOrder;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_valid_file() {
        let file = write_config("cycle:\n  min: 1s\n  max: 2s\norder: lifo\n");
        let config = ConfigLoader::with_defaults().load(file.path()).unwrap();
        assert_eq!(config.cycle.min, "1s");
        assert_eq!(config.order, DeliveryOrder::Lifo);
    }

    #[test]
    fn test_empty_file_is_defaults() {
        let file = write_config("# nothing configured\n");
        let config = ConfigLoader::with_defaults().load(file.path()).unwrap();
        assert_eq!(config, SignalConfig::default());
    }

    #[test]
    fn test_bom_is_stripped() {
        let config = ConfigLoader::with_defaults()
            .load_from_str("\u{feff}seed: 5\n")
            .unwrap();
        assert_eq!(config.seed, Some(5));
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigLoader::with_defaults()
            .load(Path::new("/definitely/not/here.yaml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile { .. }));
    }

    #[test]
    fn test_file_too_large() {
        let file = write_config("seed: 1\n# padding padding padding\n");
        let loader = ConfigLoader::new(LoaderOptions { max_config_size: 8 });
        let err = loader.load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::FileTooLarge { limit: 8, .. }));
    }

    #[test]
    fn test_malformed_yaml_reports_line() {
        let err = ConfigLoader::with_defaults()
            .load_from_str("cycle:\n  min: [4s\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { line: Some(_), .. }));
    }

    #[test]
    fn test_unknown_field_is_parse_error() {
        let err = ConfigLoader::with_defaults()
            .load_from_str("amber: true\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_invalid_range_rejected() {
        let err = ConfigLoader::with_defaults()
            .load_from_str("cycle:\n  min: 0s\n  max: 1s\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_invalid_duration_rejected() {
        let err = ConfigLoader::with_defaults()
            .load_from_str("cycle:\n  min: quickly\n")
            .unwrap_err();
        assert!(err.to_string().contains("cycle.min"));
    }
}
