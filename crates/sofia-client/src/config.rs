//! Process configuration.
//!
//! Read once at startup from the command line and environment, then handed
//! to the runtime as explicit values.

use std::time::Duration;

use clap::Args;
use reqwest::Url;
use sofia_core::MonitorConfig;

use crate::error::ConfigError;

/// Process-wide settings.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Application origin room links are built against
    #[arg(long, env = "SOFIA_ORIGIN", default_value = "http://localhost:3000")]
    pub origin: String,

    /// Connection-details endpoint, absolute or relative to the origin
    #[arg(long, env = "CONN_DETAILS_ENDPOINT", default_value = "/api/connection-details")]
    pub conn_details_endpoint: String,

    /// Show the device settings panel
    #[arg(long, env = "SHOW_SETTINGS_MENU")]
    pub show_settings_menu: bool,

    /// Recording endpoint; recording controls are hidden when unset
    #[arg(long, env = "LK_RECORD_ENDPOINT")]
    pub record_endpoint: Option<String>,

    /// Seconds between publishing statistics samples
    #[arg(long, default_value = "2")]
    pub stats_interval_secs: u64,

    /// Consecutive constrained samples before entering low power mode
    #[arg(long, default_value = "3")]
    pub constrained_samples: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost:3000".to_string(),
            conn_details_endpoint: "/api/connection-details".to_string(),
            show_settings_menu: false,
            record_endpoint: None,
            stats_interval_secs: 2,
            constrained_samples: 3,
        }
    }
}

impl ClientConfig {
    /// Parsed application origin.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.origin)
            .map_err(|e| ConfigError::Origin { origin: self.origin.clone(), reason: e.to_string() })
    }

    /// Absolute connection-details endpoint.
    pub fn connection_details_url(&self) -> Result<Url, ConfigError> {
        self.resolve_endpoint(&self.conn_details_endpoint)
    }

    /// Absolute recording endpoint.
    pub fn recording_url(&self) -> Result<Url, ConfigError> {
        let endpoint = self.record_endpoint.as_deref().ok_or(ConfigError::NoRecordingEndpoint)?;
        self.resolve_endpoint(endpoint)
    }

    /// Performance monitor tuning.
    pub fn monitor(&self) -> MonitorConfig {
        MonitorConfig {
            poll_interval: Duration::from_secs(self.stats_interval_secs.max(1)),
            constrained_samples: self.constrained_samples.max(1),
            ..MonitorConfig::default()
        }
    }

    fn resolve_endpoint(&self, endpoint: &str) -> Result<Url, ConfigError> {
        if let Ok(absolute) = Url::parse(endpoint) {
            return Ok(absolute);
        }
        self.origin_url()?.join(endpoint).map_err(|e| ConfigError::Endpoint {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        config: ClientConfig,
    }

    #[test]
    fn defaults_match_default_impl() {
        let cli = Cli::try_parse_from(["sofia"]).expect("parse");
        // Environment may override; only compare when unset.
        if std::env::var_os("SOFIA_ORIGIN").is_none()
            && std::env::var_os("CONN_DETAILS_ENDPOINT").is_none()
            && std::env::var_os("SHOW_SETTINGS_MENU").is_none()
            && std::env::var_os("LK_RECORD_ENDPOINT").is_none()
        {
            assert_eq!(cli.config, ClientConfig::default());
        }
    }

    #[test]
    fn relative_endpoint_joins_origin() {
        let config = ClientConfig::default();
        let url = config.connection_details_url().expect("url");
        assert_eq!(url.as_str(), "http://localhost:3000/api/connection-details");
    }

    #[test]
    fn absolute_endpoint_kept() {
        let config = ClientConfig {
            conn_details_endpoint: "https://api.example/details".to_string(),
            ..ClientConfig::default()
        };
        let url = config.connection_details_url().expect("url");
        assert_eq!(url.as_str(), "https://api.example/details");
    }

    #[test]
    fn recording_requires_endpoint() {
        let config = ClientConfig::default();
        assert_eq!(config.recording_url(), Err(ConfigError::NoRecordingEndpoint));
    }

    #[test]
    fn bad_origin_reported() {
        let config = ClientConfig { origin: "not a url".to_string(), ..ClientConfig::default() };
        assert!(matches!(config.connection_details_url(), Err(ConfigError::Origin { .. })));
    }

    #[test]
    fn monitor_interval_from_flags() {
        let config = ClientConfig { stats_interval_secs: 5, ..ClientConfig::default() };
        assert_eq!(config.monitor().poll_interval, Duration::from_secs(5));
    }
}
