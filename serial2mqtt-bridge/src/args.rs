//! CLI argument parsing.

use std::path::PathBuf;

use clap::Parser;

/// Command line arguments.
///
/// Every option except `--config` overrides the matching value from the
/// configuration file.
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(name = "serial2mqtt")]
#[command(about = "Bridges a MySensors serial gateway to an MQTT broker")]
#[command(version)]
pub struct BridgeArgs {
    /// Path to an optional configuration file (JSON5 format).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Serial device path (e.g. /dev/ttyUSB0).
    #[arg(long)]
    pub device: Option<String>,

    /// Serial baud rate [default: 38400].
    #[arg(long)]
    pub baudrate: Option<u32>,

    /// MQTT broker host [default: localhost].
    #[arg(long)]
    pub broker_host: Option<String>,

    /// MQTT broker port [default: 1883].
    #[arg(long)]
    pub broker_port: Option<u16>,

    /// Topic root for messages read from the serial gateway [default: mysensors-out].
    #[arg(long)]
    pub mqtt_publish_topic: Option<String>,

    /// Topic root for messages written to the serial gateway [default: mysensors-in].
    #[arg(long)]
    pub mqtt_subscribe_topic: Option<String>,

    /// MQTT username.
    #[arg(long)]
    pub username: Option<String>,

    /// MQTT password.
    #[arg(long)]
    pub password: Option<String>,

    /// Enable debug logging.
    #[arg(long)]
    pub debug: bool,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,
}

impl BridgeArgs {
    /// Parse the process arguments.
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
