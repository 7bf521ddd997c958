//! Mapping between serial records and MQTT topics.
//!
//! Topics follow the pattern:
//!
//! ```text
//! <root>/<node-id>/<child-sensor-id>/<command>/<ack>
//! ```
//!
//! Fields are not escaped: a field containing `/` produces extra topic levels.

use crate::record::{FIELD_SEPARATOR, SerialRecord};

/// Level separator in MQTT topic names.
pub const TOPIC_SEPARATOR: char = '/';

/// A topic and payload ready to be published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttPublication {
    pub topic: String,
    pub payload: String,
}

/// Map a serial record to the MQTT publication for it.
///
/// # Example
/// ```
/// use serial2mqtt_common::record::SerialRecord;
/// use serial2mqtt_common::topic::to_mqtt;
///
/// let record = SerialRecord::parse("5;1;2;0;0;temperature=21.5").unwrap();
/// let publication = to_mqtt(&record, "mysensors-out");
/// assert_eq!(publication.topic, "mysensors-out/5/1/2/0");
/// assert_eq!(publication.payload, "temperature=21.5");
/// ```
pub fn to_mqtt(record: &SerialRecord, publish_root: &str) -> MqttPublication {
    let topic = format!(
        "{}/{}/{}/{}/{}",
        publish_root,
        record.node_id(),
        record.sensor_id(),
        record.command(),
        record.ack()
    );

    MqttPublication {
        topic,
        payload: record.payload().to_string(),
    }
}

/// Build the serial line for a message received on the subscribed tree.
///
/// The first topic level is dropped whatever its value; the remaining levels
/// and the payload become the `;`-separated fields of the line.
///
/// # Example
/// ```
/// use serial2mqtt_common::topic::from_mqtt;
///
/// assert_eq!(from_mqtt("mysensors-in/5/1/2/0", "1"), "5;1;2;0;1");
/// ```
pub fn from_mqtt(topic: &str, payload: &str) -> String {
    let mut line = String::with_capacity(topic.len() + payload.len() + 1);

    for segment in topic.split(TOPIC_SEPARATOR).skip(1) {
        line.push_str(segment);
        line.push(FIELD_SEPARATOR);
    }
    line.push_str(payload);

    line
}

/// Topic filter covering every level below `subscribe_root`.
///
/// # Example
/// ```
/// use serial2mqtt_common::topic::subscription_filter;
///
/// assert_eq!(subscription_filter("mysensors-in"), "mysensors-in/#");
/// ```
pub fn subscription_filter(subscribe_root: &str) -> String {
    format!("{}/#", subscribe_root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_mqtt() {
        let record = SerialRecord::parse("5;1;2;0;0;temperature=21.5").unwrap();
        let publication = to_mqtt(&record, "mysensors-out");

        assert_eq!(publication.topic, "mysensors-out/5/1/2/0");
        assert_eq!(publication.payload, "temperature=21.5");
    }

    #[test]
    fn test_to_mqtt_payload_with_separators() {
        let record = SerialRecord::parse("7;3;1;1;2;on;off").unwrap();
        let publication = to_mqtt(&record, "out");

        assert_eq!(publication.topic, "out/7/3/1/1");
        assert_eq!(publication.payload, "on;off");
    }

    #[test]
    fn test_to_mqtt_does_not_escape_slash() {
        let record = SerialRecord::new("5", "a/b", "1", "0", "0", "x");
        assert_eq!(to_mqtt(&record, "out").topic, "out/5/a/b/1/0");
    }

    #[test]
    fn test_from_mqtt() {
        assert_eq!(from_mqtt("mysensors-in/5/1/2/0", "1"), "5;1;2;0;1");
    }

    #[test]
    fn test_from_mqtt_ignores_root_value() {
        assert_eq!(from_mqtt("elsewhere/5/1/2/0", "1"), "5;1;2;0;1");
    }

    #[test]
    fn test_from_mqtt_any_depth() {
        assert_eq!(from_mqtt("root/5/1", "x"), "5;1;x");
        assert_eq!(from_mqtt("root/5/1/2/0/9/9", "x"), "5;1;2;0;9;9;x");
        assert_eq!(from_mqtt("root", "x"), "x");
    }

    #[test]
    fn test_from_mqtt_empty_payload() {
        assert_eq!(from_mqtt("in/5/1/2/0", ""), "5;1;2;0;");
    }

    #[test]
    fn test_round_trip_drops_type() {
        let record = SerialRecord::parse("5;1;2;0;17;temperature=21.5").unwrap();
        let publication = to_mqtt(&record, "mysensors-out");

        let line = from_mqtt(&publication.topic, &publication.payload);
        assert_eq!(line, "5;1;2;0;temperature=21.5");
    }

    #[test]
    fn test_subscription_filter() {
        assert_eq!(subscription_filter("mysensors-in"), "mysensors-in/#");
    }
}
