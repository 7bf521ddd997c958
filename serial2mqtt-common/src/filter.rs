//! Gateway message filter.
//!
//! Records sent by the gateway itself (node id `0`) are administrative and are
//! never republished to MQTT.

use crate::record::SerialRecord;

/// Node id reserved for the serial gateway.
pub const GATEWAY_NODE_ID: &str = "0";

/// Returns `true` if the record originates from the gateway node.
pub fn is_gateway_message(record: &SerialRecord) -> bool {
    record.node_id() == GATEWAY_NODE_ID
}
