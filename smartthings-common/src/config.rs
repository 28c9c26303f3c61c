use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// SmartThings API connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartThingsConfig {
    /// File containing the OAuth token (JSON, as produced by the registration flow).
    #[serde(default)]
    pub token_file: Option<PathBuf>,

    /// Base URL of the SmartThings API, used for endpoint discovery.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// SmartApp endpoint URI. Skips discovery when set.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://graph.api.smartthings.com".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for SmartThingsConfig {
    fn default() -> Self {
        Self {
            token_file: None,
            api_url: default_api_url(),
            endpoint: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format (default).
    #[default]
    Text,
    /// Structured JSON format.
    Json,
}

/// Common logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Load a configuration file in JSON5 format.
pub fn load_config<T: for<'de> Deserialize<'de>>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;

    json5::from_str(&content).map_err(|e| {
        Error::Config(format!(
            "Failed to parse config file '{}': {}",
            path.display(),
            e
        ))
    })
}

/// Load a configuration from a JSON5 string.
pub fn parse_config<T: for<'de> Deserialize<'de>>(content: &str) -> Result<T> {
    json5::from_str(content).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Deserialize)]
    struct TestConfig {
        #[serde(default)]
        smartthings: SmartThingsConfig,
        #[serde(default)]
        logging: LoggingConfig,
    }

    #[test]
    fn test_parse_smartthings_config() {
        let json5 = r#"
        {
            smartthings: {
                token_file: "/etc/smartthings/token.json",
                endpoint: "https://graph.api.smartthings.com/api/smartapps/installations/abc",
                timeout_secs: 30,
            },
            logging: {
                level: "debug",
            },
        }
        "#;

        let config: TestConfig = parse_config(json5).unwrap();

        assert_eq!(
            config.smartthings.token_file,
            Some(PathBuf::from("/etc/smartthings/token.json"))
        );
        assert_eq!(
            config.smartthings.endpoint.as_deref(),
            Some("https://graph.api.smartthings.com/api/smartapps/installations/abc")
        );
        assert_eq!(config.smartthings.timeout_secs, 30);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_default_config() {
        let config: TestConfig = parse_config("{}").unwrap();

        assert!(config.smartthings.token_file.is_none());
        assert!(config.smartthings.endpoint.is_none());
        assert_eq!(
            config.smartthings.api_url,
            "https://graph.api.smartthings.com"
        );
        assert_eq!(config.smartthings.timeout_secs, 10);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_json_logging_format() {
        let json5 = r#"
        {
            logging: {
                level: "debug",
                format: "json",
            },
        }
        "#;

        let config: TestConfig = parse_config(json5).unwrap();

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result: Result<TestConfig> = load_config("/nonexistent/config.json5");
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
