//! Configuration management for locus.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration.
///
/// This is loaded from `~/.config/locus/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocusConfig {
    /// HTTP settings for network-backed services
    pub services: ServicesConfig,
    /// API keys for third-party providers
    pub credentials: CredentialsConfig,
    /// Defaults applied to new requests
    pub requests: RequestDefaults,
}

impl LocusConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path, falling back to defaults if
    /// the file does not exist.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            tracing::debug!("Loading config from {}", path.display());
            let contents = fs::read_to_string(path)?;
            let config: Self = toml::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `LOCUS_GOOGLE_API_KEY`: Google Geocoding/Places key
    /// - `LOCUS_IPSTACK_API_KEY`: ipstack access key
    /// - `LOCUS_HTTP_TIMEOUT_SECS`: Override HTTP timeout
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `LOCUS_*` environment overrides in place.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("LOCUS_GOOGLE_API_KEY") {
            if !key.is_empty() {
                self.credentials.google_api_key = Some(key);
                tracing::debug!("Override credentials.google_api_key from env");
            }
        }

        if let Ok(key) = std::env::var("LOCUS_IPSTACK_API_KEY") {
            if !key.is_empty() {
                self.credentials.ipstack_api_key = Some(key);
                tracing::debug!("Override credentials.ipstack_api_key from env");
            }
        }

        if let Ok(val) = std::env::var("LOCUS_HTTP_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                self.services.timeout_secs = secs;
                tracing::debug!("Override services.timeout_secs from env: {}", secs);
            }
        }
    }

    /// Reject values that cannot work at runtime.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.services.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "services.timeout_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.requests.heading_accuracy_degrees < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "requests.heading_accuracy_degrees".to_string(),
                reason: "must not be negative".to_string(),
            });
        }
        if self.requests.location_accuracy_meters <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "requests.location_accuracy_meters".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to an explicit path.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        let config_dir = path.parent().ok_or_else(|| ConfigError::InvalidValue {
            field: "config_path".to_string(),
            reason: "no parent directory".to_string(),
        })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/locus/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("rs", "locus", "locus").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/locus`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("rs", "locus", "locus").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.data_dir().to_path_buf())
    }
}

/// HTTP settings shared by network services.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    /// Per-call HTTP timeout in seconds
    pub timeout_secs: u64,
    /// User agent string
    pub user_agent: String,
    /// Preferred response language (e.g. `"en"`), if any
    pub locale: Option<String>,
}

impl ServicesConfig {
    /// HTTP timeout as a `Duration`.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: "locus/0.1.0 (+https://github.com/locus-rs/locus)".to_string(),
            locale: None,
        }
    }
}

/// API keys for providers that require them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Google Maps Platform key (Geocoding, Places)
    pub google_api_key: Option<String>,
    /// ipstack access key
    pub ipstack_api_key: Option<String>,
}

/// Defaults applied when a request is created without explicit options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestDefaults {
    /// Heading accuracy threshold in degrees
    pub heading_accuracy_degrees: f64,
    /// Minimum interval between headings in milliseconds (0 = none)
    pub heading_min_interval_ms: u64,
    /// Horizontal accuracy threshold for location requests in meters
    pub location_accuracy_meters: f64,
    /// Timeout applied to network requests in seconds (0 = never)
    pub network_timeout_secs: u64,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            heading_accuracy_degrees: 10.0,
            heading_min_interval_ms: 0,
            location_accuracy_meters: 100.0,
            network_timeout_secs: 15,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = LocusConfig::default();
        assert_eq!(config.services.timeout_secs, 10);
        assert!(config.credentials.google_api_key.is_none());
        assert!((config.requests.heading_accuracy_degrees - 10.0).abs() < f64::EPSILON);
        assert_eq!(config.requests.network_timeout_secs, 15);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = LocusConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("[services]"));
        assert!(toml_str.contains("[requests]"));

        let parsed: LocusConfig = toml::from_str(&toml_str).expect("parse serialized config");
        assert_eq!(parsed.services.user_agent, config.services.user_agent);
    }

    #[test]
    fn test_config_save_load() {
        let tmp = TempDir::new().expect("create temp dir");
        let config_path = tmp.path().join("nested").join("config.toml");

        let mut config = LocusConfig::default();
        config.services.timeout_secs = 30;
        config.credentials.google_api_key = Some("g-key".to_string());
        config.save_to(&config_path).expect("save config");

        let loaded = LocusConfig::load_from(&config_path).expect("load config");
        assert_eq!(loaded.services.timeout_secs, 30);
        assert_eq!(loaded.credentials.google_api_key.as_deref(), Some("g-key"));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let tmp = TempDir::new().expect("create temp dir");
        let loaded = LocusConfig::load_from(&tmp.path().join("absent.toml")).expect("load");
        assert_eq!(loaded.services.timeout_secs, 10);
    }

    #[test]
    fn test_invalid_value_rejected() {
        let tmp = TempDir::new().expect("create temp dir");
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[services]\ntimeout_secs = 0\n").expect("write config");

        let err = LocusConfig::load_from(&path).expect_err("zero timeout must fail");
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_env_overrides() {
        std::env::set_var("LOCUS_IPSTACK_API_KEY", "ip-key");
        std::env::set_var("LOCUS_HTTP_TIMEOUT_SECS", "42");

        let mut config = LocusConfig::default();
        config.apply_env_overrides();
        assert_eq!(config.credentials.ipstack_api_key.as_deref(), Some("ip-key"));
        assert_eq!(config.services.timeout_secs, 42);

        std::env::remove_var("LOCUS_IPSTACK_API_KEY");
        std::env::remove_var("LOCUS_HTTP_TIMEOUT_SECS");
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[credentials]
google_api_key = "abc"

[requests]
heading_accuracy_degrees = 5.0
"#;

        let config: LocusConfig = toml::from_str(toml_str).expect("parse partial config");
        assert_eq!(config.credentials.google_api_key.as_deref(), Some("abc"));
        assert!((config.requests.heading_accuracy_degrees - 5.0).abs() < f64::EPSILON);
        // These should be defaults
        assert_eq!(config.services.timeout_secs, 10);
        assert_eq!(config.requests.network_timeout_secs, 15);
    }
}
