//! serial2mqtt Common Library
//!
//! This crate provides the translation core shared by the serial2mqtt gateway:
//!
//! - [`record`] - Serial record codec (`SerialRecord`, `ParseError`)
//! - [`topic`] - Mapping between serial records and MQTT topics/payloads
//! - [`filter`] - Gateway message filter
//! - [`config`] - Logging configuration and JSON5 loading helpers
//! - [`error`] - Error types

pub mod config;
pub mod error;
pub mod filter;
pub mod record;
pub mod topic;

// Re-export commonly used types at the crate root
pub use config::{LogFormat, LoggingConfig, load_config, parse_config};
pub use error::{Error, Result};
pub use filter::{GATEWAY_NODE_ID, is_gateway_message};
pub use record::{FIELD_COUNT, FIELD_SEPARATOR, ParseError, SerialRecord, serialize};
pub use topic::{MqttPublication, TOPIC_SEPARATOR, from_mqtt, subscription_filter, to_mqtt};

/// Initialize tracing with the given configuration.
///
/// Supports two output formats:
/// - `LogFormat::Text` (default): Human-readable text format
/// - `LogFormat::Json`: Structured JSON format for log aggregation systems
///
/// `RUST_LOG` takes precedence over the configured level when it is set.
///
/// # Example
///
/// ```ignore
/// use serial2mqtt_common::{LoggingConfig, LogFormat, init_tracing};
///
/// let config = LoggingConfig {
///     level: "debug".to_string(),
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
