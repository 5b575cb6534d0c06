//! Tracing subscriber setup.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::DashboardError;

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the configured filter. Fails if a subscriber is
/// already installed or the filter does not parse.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), DashboardError> {
    let env_filter = build_filter(config)?;
    let registry = tracing_subscriber::registry().with(env_filter);

    let result = if config.json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    };
    result.map_err(|e| DashboardError::Telemetry(e.to_string()))
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, DashboardError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .map_err(|e| DashboardError::Telemetry(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_filter_rejected() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = LoggingConfig {
            filter: "vantage_dashboard=notalevel".to_string(),
            json: false,
        };
        assert!(matches!(
            build_filter(&config),
            Err(DashboardError::Telemetry(_))
        ));
    }

    #[test]
    fn test_default_filter_parses() {
        assert!(build_filter(&LoggingConfig::default()).is_ok());
    }
}
