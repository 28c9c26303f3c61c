//! Configuration for the SmartThings exporter.

use serde::{Deserialize, Serialize};
use smartthings_common::config::{LoggingConfig, SmartThingsConfig};
use std::path::Path;
use thiserror::Error;

use crate::catalog::is_valid_metric_name;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete exporter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// SmartThings API settings.
    #[serde(default)]
    pub smartthings: SmartThingsConfig,

    /// Prometheus exporter settings.
    #[serde(default)]
    pub prometheus: PrometheusConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Prometheus HTTP endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrometheusConfig {
    /// Address to listen on (default: "0.0.0.0:9499").
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Path for metrics endpoint (default: "/metrics").
    #[serde(default = "default_path")]
    pub path: String,

    /// Metric name prefix (default: "smartthings").
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_listen() -> String {
    "0.0.0.0:9499".to_string()
}

fn default_path() -> String {
    "/metrics".to_string()
}

fn default_namespace() -> String {
    "smartthings".to_string()
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            path: default_path(),
            namespace: default_namespace(),
        }
    }
}

impl ExporterConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ExporterConfig = json5::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.smartthings.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "timeout_secs must be > 0".to_string(),
            ));
        }

        // Validate listen address format
        if self
            .prometheus
            .listen
            .parse::<std::net::SocketAddr>()
            .is_err()
        {
            return Err(ConfigError::Validation(format!(
                "Invalid listen address: {}",
                self.prometheus.listen
            )));
        }

        // Validate path starts with /
        if !self.prometheus.path.starts_with('/') {
            return Err(ConfigError::Validation(
                "Metrics path must start with /".to_string(),
            ));
        }

        // "/" and "/health" are served by the exporter itself
        if matches!(self.prometheus.path.as_str(), "/" | "/health") {
            return Err(ConfigError::Validation(format!(
                "Metrics path {} is reserved",
                self.prometheus.path
            )));
        }

        if !is_valid_metric_name(&self.prometheus.namespace) {
            return Err(ConfigError::Validation(format!(
                "Invalid metric namespace: {}",
                self.prometheus.namespace
            )));
        }

        Ok(())
    }
}
