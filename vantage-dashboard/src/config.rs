//! Configuration loading for the Vantage dashboard client.
//!
//! Connection fields are required. Only `auto_refresh` and the `[logging]`
//! table fall back to defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Shortest refresh interval accepted from configuration.
pub const MIN_REFRESH_INTERVAL_MS: u64 = 1_000;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DashboardConfig {
    pub api_base_url: String,
    pub request_timeout_ms: u64,
    pub refresh_interval_ms: u64,
    #[serde(default = "default_auto_refresh")]
    pub auto_refresh: bool,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directives; `RUST_LOG` takes precedence when set.
    #[serde(default = "default_filter")]
    pub filter: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
        }
    }
}

fn default_auto_refresh() -> bool {
    true
}

fn default_filter() -> String {
    "vantage_dashboard=info,vantage_storage=info,warn".to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or VANTAGE_DASHBOARD_CONFIG)")]
    MissingConfigPath,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl DashboardConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path_from_args().or_else(config_path_from_env);
        let path = path.ok_or(ConfigError::MissingConfigPath)?;
        Self::from_path(&path)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: DashboardConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.api_base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "api_base_url",
                reason: "must not be empty".to_string(),
            });
        }
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                field: "api_base_url",
                reason: "must start with http:// or https://".to_string(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.refresh_interval_ms < MIN_REFRESH_INTERVAL_MS {
            return Err(ConfigError::InvalidValue {
                field: "refresh_interval_ms",
                reason: format!("must be >= {}", MIN_REFRESH_INTERVAL_MS),
            });
        }
        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "logging.filter",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var("VANTAGE_DASHBOARD_CONFIG").ok().map(PathBuf::from)
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
api_base_url = "http://localhost:8000"
request_timeout_ms = 5000
refresh_interval_ms = 30000
"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = DashboardConfig::from_toml_str(MINIMAL).unwrap();
        assert!(config.auto_refresh);
        assert!(!config.logging.json);
        assert_eq!(config.logging.filter, default_filter());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let doc = format!("{}\ntheme = \"dark\"\n", MINIMAL);
        assert!(matches!(
            DashboardConfig::from_toml_str(&doc),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_required_field_rejected() {
        let doc = "api_base_url = \"http://localhost:8000\"\nrequest_timeout_ms = 5000\n";
        assert!(matches!(
            DashboardConfig::from_toml_str(doc),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_invalid_values_name_the_field() {
        let cases = [
            (MINIMAL.replace("http://localhost:8000", ""), "api_base_url"),
            (MINIMAL.replace("http://localhost:8000", "localhost:8000"), "api_base_url"),
            (MINIMAL.replace("5000", "0"), "request_timeout_ms"),
            (MINIMAL.replace("30000", "999"), "refresh_interval_ms"),
        ];
        for (doc, expected) in cases {
            match DashboardConfig::from_toml_str(&doc) {
                Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, expected),
                other => panic!("expected InvalidValue for {}, got {:?}", expected, other),
            }
        }
    }

    #[test]
    fn test_empty_logging_filter_rejected() {
        let doc = format!("{}\n[logging]\nfilter = \" \"\n", MINIMAL);
        assert!(matches!(
            DashboardConfig::from_toml_str(&doc),
            Err(ConfigError::InvalidValue {
                field: "logging.filter",
                ..
            })
        ));
    }
}
