//! Error types for the bridge.

use thiserror::Error;

/// Result type alias using [`BridgeError`].
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Errors that can occur in the bridge.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Configuration file not found.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration file unreadable or malformed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    /// Configuration validation error.
    #[error("Configuration validation failed: {0}")]
    ConfigValidation(String),

    /// The serial device could not be opened.
    #[error("Failed to open serial device {device}: {message}")]
    SerialOpen { device: String, message: String },

    /// Read or write failure on an open serial device.
    #[error("Serial I/O error: {0}")]
    SerialIo(#[source] std::io::Error),

    /// The serial device reported end of stream.
    #[error("Serial device closed")]
    SerialClosed,

    /// Broker unreachable, refused the connection, or dropped it.
    #[error("MQTT connection error: {0}")]
    MqttConnection(String),

    /// The MQTT client request queue rejected a request.
    #[error("MQTT client error: {0}")]
    MqttClient(String),

    /// Operation not allowed in the current bridge state.
    #[error("Invalid bridge state: {0}")]
    InvalidState(String),
}

impl BridgeError {
    /// Create a configuration validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ConfigValidation(msg.into())
    }

    /// Create an invalid state error.
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }
}

impl From<serial2mqtt_common::Error> for BridgeError {
    fn from(err: serial2mqtt_common::Error) -> Self {
        match err {
            serial2mqtt_common::Error::Config(msg) => Self::ConfigParse(msg),
        }
    }
}

impl From<rumqttc::ClientError> for BridgeError {
    fn from(err: rumqttc::ClientError) -> Self {
        Self::MqttClient(err.to_string())
    }
}
