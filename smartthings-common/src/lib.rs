//! SmartThings Common Library
//!
//! This crate provides the shared types and the upstream API client used by the
//! SmartThings exporter:
//!
//! - [`device`] - Device data model (`Device`, `AttributeValue`)
//! - [`source`] - The `DeviceSource` abstraction over device listings
//! - [`client`] - SmartThings REST client (token loading, endpoint discovery)
//! - [`config`] - Configuration loading (JSON5 format)
//! - [`error`] - Error types

pub mod client;
pub mod config;
pub mod device;
pub mod error;
pub mod source;

// Re-export commonly used types at the crate root
pub use client::{OAuthToken, SmartThingsClient, discover_endpoint, load_token};
pub use config::{LogFormat, LoggingConfig, SmartThingsConfig, load_config, parse_config};
pub use device::{AttributeValue, Device};
pub use error::{Error, Result};
pub use source::DeviceSource;

/// Initialize tracing with the given configuration.
///
/// Supports two output formats:
/// - `LogFormat::Text` (default): Human-readable text format
/// - `LogFormat::Json`: Structured JSON format for log aggregation systems
///
/// `RUST_LOG` takes precedence over `config.level` when set.
///
/// # Example
///
/// ```ignore
/// use smartthings_common::{LoggingConfig, LogFormat, init_tracing};
///
/// let config = LoggingConfig {
///     level: "info".to_string(),
///     format: LogFormat::Json,
/// };
/// init_tracing(&config)?;
/// ```
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(fmt::layer())
                .with(filter)
                .try_init()
                .map_err(|e| Error::Config(format!("Failed to initialize tracing: {}", e)))?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(fmt::layer().json())
                .with(filter)
                .try_init()
                .map_err(|e| Error::Config(format!("Failed to initialize tracing: {}", e)))?;
        }
    }

    Ok(())
}
