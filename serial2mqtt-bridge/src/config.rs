//! Bridge configuration.
//!
//! The configuration is built once at startup: defaults, then the optional
//! JSON5 file, then command line overrides. The result is validated and moved
//! into the [`Bridge`](crate::Bridge).

use serde::{Deserialize, Serialize};
use std::path::Path;

pub use serial2mqtt_common::LoggingConfig;

use crate::args::BridgeArgs;
use crate::error::{BridgeError, Result};

/// Complete bridge configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Serial gateway settings.
    #[serde(default)]
    pub serial: SerialConfig,

    /// MQTT broker settings.
    #[serde(default)]
    pub mqtt: MqttConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serial gateway settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Serial device path (e.g., "/dev/ttyUSB0" or "COM1")
    #[serde(default)]
    pub device: String,

    /// Baud rate (default: 38400)
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Data bits: 5, 6, 7 or 8 (default: 8)
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,

    /// Parity: "none", "even", or "odd" (default: "none")
    #[serde(default = "default_parity")]
    pub parity: String,

    /// Stop bits: 1 or 2 (default: 1)
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
}

fn default_baud_rate() -> u32 {
    38400
}

fn default_data_bits() -> u8 {
    8
}

fn default_parity() -> String {
    "none".to_string()
}

fn default_stop_bits() -> u8 {
    1
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: String::new(),
            baud_rate: default_baud_rate(),
            data_bits: default_data_bits(),
            parity: default_parity(),
            stop_bits: default_stop_bits(),
        }
    }
}

/// MQTT broker settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MqttConfig {
    /// Broker host name or address
    #[serde(default = "default_host")]
    pub host: String,

    /// Broker port (default: 1883)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Topic root for records read from the serial gateway
    #[serde(default = "default_publish_topic")]
    pub publish_topic: String,

    /// Topic root whose messages are written to the serial gateway
    #[serde(default = "default_subscribe_topic")]
    pub subscribe_topic: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Client identifier (default: generated "serial2mqtt-<random>")
    #[serde(default)]
    pub client_id: Option<String>,

    /// Keep-alive interval in seconds
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,

    /// Time allowed for the broker to acknowledge the connection
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// QoS for publications and the subscription: 0, 1 or 2
    #[serde(default)]
    pub qos: u8,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    1883
}

fn default_publish_topic() -> String {
    "mysensors-out".to_string()
}

fn default_subscribe_topic() -> String {
    "mysensors-in".to_string()
}

fn default_keep_alive_secs() -> u64 {
    60
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            publish_topic: default_publish_topic(),
            subscribe_topic: default_subscribe_topic(),
            username: None,
            password: None,
            client_id: None,
            keep_alive_secs: default_keep_alive_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            qos: 0,
        }
    }
}

impl BridgeConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(BridgeError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        Ok(serial2mqtt_common::load_config(path)?)
    }

    /// Parse configuration from a JSON5 string.
    #[cfg(test)]
    pub fn parse(content: &str) -> Result<Self> {
        Ok(serial2mqtt_common::parse_config(content)?)
    }

    /// Build the configuration from CLI arguments and the file they point to.
    pub fn from_args(args: &BridgeArgs) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };

        config.apply_args(args);
        config.validate()?;

        Ok(config)
    }

    /// Overlay values given on the command line.
    pub fn apply_args(&mut self, args: &BridgeArgs) {
        if let Some(device) = &args.device {
            self.serial.device = device.clone();
        }
        if let Some(baud_rate) = args.baudrate {
            self.serial.baud_rate = baud_rate;
        }
        if let Some(host) = &args.broker_host {
            self.mqtt.host = host.clone();
        }
        if let Some(port) = args.broker_port {
            self.mqtt.port = port;
        }
        if let Some(topic) = &args.mqtt_publish_topic {
            self.mqtt.publish_topic = topic.clone();
        }
        if let Some(topic) = &args.mqtt_subscribe_topic {
            self.mqtt.subscribe_topic = topic.clone();
        }
        if args.username.is_some() {
            self.mqtt.username = args.username.clone();
        }
        if args.password.is_some() {
            self.mqtt.password = args.password.clone();
        }
        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
        }
        if args.debug {
            self.logging.level = "debug".to_string();
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        let serial = &self.serial;

        if serial.device.trim().is_empty() {
            return Err(BridgeError::validation(
                "a serial device is required (--device or serial.device)",
            ));
        }
        if serial.baud_rate == 0 {
            return Err(BridgeError::validation("baud rate must be greater than 0"));
        }
        if !(5..=8).contains(&serial.data_bits) {
            return Err(BridgeError::validation(format!(
                "invalid data bits {}, expected 5-8",
                serial.data_bits
            )));
        }
        if !matches!(serial.parity.to_lowercase().as_str(), "none" | "even" | "odd") {
            return Err(BridgeError::validation(format!(
                "invalid parity '{}', expected 'none', 'even' or 'odd'",
                serial.parity
            )));
        }
        if !(1..=2).contains(&serial.stop_bits) {
            return Err(BridgeError::validation(format!(
                "invalid stop bits {}, expected 1 or 2",
                serial.stop_bits
            )));
        }

        let mqtt = &self.mqtt;

        if mqtt.host.trim().is_empty() {
            return Err(BridgeError::validation("broker host must not be empty"));
        }
        if mqtt.port == 0 {
            return Err(BridgeError::validation("broker port must be greater than 0"));
        }
        validate_topic_root("publish", &mqtt.publish_topic)?;
        validate_topic_root("subscribe", &mqtt.subscribe_topic)?;
        if mqtt.qos > 2 {
            return Err(BridgeError::validation(format!(
                "invalid QoS {}, expected 0, 1 or 2",
                mqtt.qos
            )));
        }
        if mqtt.keep_alive_secs < 5 {
            return Err(BridgeError::validation(
                "keep-alive must be at least 5 seconds",
            ));
        }
        if mqtt.connect_timeout_secs == 0 {
            return Err(BridgeError::validation(
                "connect timeout must be greater than 0",
            ));
        }
        if mqtt.password.is_some() && mqtt.username.is_none() {
            return Err(BridgeError::validation("a password requires a username"));
        }
        if let Some(client_id) = &mqtt.client_id {
            if client_id.trim().is_empty() {
                return Err(BridgeError::validation("client id must not be empty"));
            }
        }

        Ok(())
    }
}

/// A topic root is a single topic level without wildcards.
fn validate_topic_root(kind: &str, root: &str) -> Result<()> {
    if root.is_empty() {
        return Err(BridgeError::validation(format!(
            "{} topic must not be empty",
            kind
        )));
    }
    if root.contains(['/', '#', '+']) {
        return Err(BridgeError::validation(format!(
            "{} topic '{}' must be a single level without wildcards",
            kind, root
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn args_with_device() -> BridgeArgs {
        BridgeArgs {
            device: Some("/dev/ttyUSB0".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::from_args(&args_with_device()).unwrap();

        assert_eq!(config.serial.device, "/dev/ttyUSB0");
        assert_eq!(config.serial.baud_rate, 38400);
        assert_eq!(config.mqtt.host, "localhost");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.mqtt.publish_topic, "mysensors-out");
        assert_eq!(config.mqtt.subscribe_topic, "mysensors-in");
        assert_eq!(config.mqtt.username, None);
        assert_eq!(config.mqtt.qos, 0);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_device_required() {
        let result = BridgeConfig::from_args(&BridgeArgs::default());
        assert!(matches!(result, Err(BridgeError::ConfigValidation(_))));
    }

    #[test]
    fn test_parse_file() {
        let json = r#"{
            serial: { device: "/dev/ttyACM0", baud_rate: 115200, parity: "even" },
            mqtt: {
                host: "broker.lan",
                port: 1884,
                publish_topic: "gw-out",
                username: "gw",
                password: "secret",
                qos: 1,
            },
            logging: { level: "warn", format: "json" },
        }"#;

        let config = BridgeConfig::parse(json).unwrap();
        assert_eq!(config.serial.device, "/dev/ttyACM0");
        assert_eq!(config.serial.baud_rate, 115200);
        assert_eq!(config.serial.parity, "even");
        assert_eq!(config.serial.data_bits, 8);
        assert_eq!(config.mqtt.host, "broker.lan");
        assert_eq!(config.mqtt.port, 1884);
        assert_eq!(config.mqtt.publish_topic, "gw-out");
        assert_eq!(config.mqtt.subscribe_topic, "mysensors-in");
        assert_eq!(config.mqtt.password.as_deref(), Some("secret"));
        assert_eq!(config.mqtt.qos, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ serial: {{ device: "/dev/ttyS0" }}, mqtt: {{ host: "file-host", port: 1884 }} }}"#
        )
        .unwrap();

        let args = BridgeArgs {
            config: Some(file.path().to_path_buf()),
            broker_host: Some("cli-host".to_string()),
            debug: true,
            ..Default::default()
        };

        let config = BridgeConfig::from_args(&args).unwrap();
        assert_eq!(config.serial.device, "/dev/ttyS0");
        assert_eq!(config.mqtt.host, "cli-host");
        assert_eq!(config.mqtt.port, 1884);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_debug_wins_over_log_level() {
        let mut config = BridgeConfig::default();
        config.apply_args(&BridgeArgs {
            log_level: Some("trace".to_string()),
            ..Default::default()
        });
        assert_eq!(config.logging.level, "trace");

        config.apply_args(&BridgeArgs {
            log_level: Some("warn".to_string()),
            debug: true,
            ..Default::default()
        });
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_config_not_found() {
        let args = BridgeArgs {
            config: Some(PathBuf::from("/nonexistent/serial2mqtt.json5")),
            ..args_with_device()
        };
        let result = BridgeConfig::from_args(&args);
        assert!(matches!(result, Err(BridgeError::ConfigNotFound { .. })));
    }

    #[test]
    fn test_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ serial: {{ device: ").unwrap();

        let result = BridgeConfig::load_from_file(file.path());
        assert!(matches!(result, Err(BridgeError::ConfigParse(_))));
    }

    #[test]
    fn test_validate_topic_roots() {
        for root in ["", "a/b", "in/#", "+"] {
            let mut config = BridgeConfig::from_args(&args_with_device()).unwrap();
            config.mqtt.subscribe_topic = root.to_string();
            assert!(config.validate().is_err(), "root {:?}", root);
        }
    }

    #[test]
    fn test_validate_serial_framing() {
        let mut config = BridgeConfig::from_args(&args_with_device()).unwrap();
        config.serial.parity = "mark".to_string();
        assert!(config.validate().is_err());

        let mut config = BridgeConfig::from_args(&args_with_device()).unwrap();
        config.serial.data_bits = 9;
        assert!(config.validate().is_err());

        let mut config = BridgeConfig::from_args(&args_with_device()).unwrap();
        config.serial.stop_bits = 3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_mqtt() {
        let mut config = BridgeConfig::from_args(&args_with_device()).unwrap();
        config.mqtt.qos = 3;
        assert!(config.validate().is_err());

        let mut config = BridgeConfig::from_args(&args_with_device()).unwrap();
        config.mqtt.password = Some("secret".to_string());
        assert!(config.validate().is_err());

        let mut config = BridgeConfig::from_args(&args_with_device()).unwrap();
        config.mqtt.keep_alive_secs = 1;
        assert!(config.validate().is_err());
    }
}
