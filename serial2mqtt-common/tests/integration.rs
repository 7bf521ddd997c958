//! Integration tests for the serial2mqtt-common translation path.

use serial2mqtt_common::{
    SerialRecord, from_mqtt, is_gateway_message, serialize, subscription_filter, to_mqtt,
};

/// Serial line to publication, the way the reader loop drives it.
fn translate(line: &str, root: &str) -> Option<(String, String)> {
    let record = SerialRecord::parse(line).ok()?;
    if is_gateway_message(&record) {
        return None;
    }
    let publication = to_mqtt(&record, root);
    Some((publication.topic, publication.payload))
}

#[test]
fn test_sensor_reading_is_published() {
    let (topic, payload) = translate("5;1;2;0;0;temperature=21.5", "mysensors-out").unwrap();
    assert_eq!(topic, "mysensors-out/5/1/2/0");
    assert_eq!(payload, "temperature=21.5");
}

#[test]
fn test_gateway_lines_are_suppressed() {
    let lines = [
        "0;255;3;0;14;Gateway startup complete.",
        "0;255;3;0;9;TSF:MSG:READ,5-5-0,s=1,c=1,t=0,pt=7,l=5,sg=0:21.5",
        "0;0;3;0;2;",
    ];
    for line in lines {
        assert_eq!(translate(line, "mysensors-out"), None, "line {:?}", line);
    }
}

#[test]
fn test_short_lines_are_dropped() {
    for line in ["", "5", "5;1;2;0", "5;1;2;0;0"] {
        assert_eq!(translate(line, "mysensors-out"), None, "line {:?}", line);
    }
}

#[test]
fn test_payload_with_separator_survives_both_directions() {
    let (topic, payload) = translate("9;4;1;0;47;hello;world", "out").unwrap();
    assert_eq!(topic, "out/9/4/1/0");
    assert_eq!(payload, "hello;world");

    let inbound_topic = topic.replacen("out", "in", 1);
    assert_eq!(from_mqtt(&inbound_topic, &payload), "9;4;1;0;hello;world");
}

#[test]
fn test_inbound_command_becomes_serial_line() {
    assert_eq!(from_mqtt("mysensors-in/5/1/2/0", "1"), "5;1;2;0;1");
    assert_eq!(subscription_filter("mysensors-in"), "mysensors-in/#");
}

#[test]
fn test_round_trip_is_five_fields() {
    let record = SerialRecord::new("21", "3", "1", "1", "2", "1");
    let publication = to_mqtt(&record, "mysensors-out");
    let line = from_mqtt(&publication.topic, &publication.payload);

    let expected = serialize([
        record.node_id(),
        record.sensor_id(),
        record.command(),
        record.ack(),
        record.payload(),
    ]);
    assert_eq!(line, expected);
    assert!(SerialRecord::parse(&line).is_err());
}
