//! Bridge between a MySensors serial gateway and an MQTT broker.
//!
//! Lines read from the serial gateway are published to MQTT, and messages
//! received on the subscribed topic tree are written back as serial lines.
//!
//! # Topics
//!
//! ```text
//! serial -> MQTT:  {publish_root}/{node}/{sensor}/{command}/{ack}    payload = serial payload
//! MQTT -> serial:  {subscribe_root}/{node}/{sensor}/{command}/{ack}  -> "node;sensor;command;ack;payload\n"
//! ```
//!
//! Lines from the gateway node itself (node id `0`) are not republished.

pub mod args;
pub mod bridge;
pub mod config;
pub mod error;
pub mod mqtt;
pub mod serial;

pub use args::BridgeArgs;
pub use bridge::{Bridge, BridgeState};
pub use config::BridgeConfig;
pub use error::{BridgeError, Result};
