//! Serial record codec for the MySensors serial gateway line format.
//!
//! Inbound lines carry six `;`-separated fields:
//!
//! ```text
//! node-id;child-sensor-id;command;ack;type;payload
//! ```
//!
//! The split stops after the sixth field, so the payload may itself contain `;`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Field delimiter on the serial line.
pub const FIELD_SEPARATOR: char = ';';

/// Number of fields in an inbound serial record.
pub const FIELD_COUNT: usize = 6;

/// Error returned when a serial line cannot be turned into a [`SerialRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },
}

/// One parsed line received from the serial gateway.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SerialRecord {
    node_id: String,
    sensor_id: String,
    command: String,
    ack: String,
    message_type: String,
    payload: String,
}

impl SerialRecord {
    /// Build a record from its six fields.
    pub fn new(
        node_id: impl Into<String>,
        sensor_id: impl Into<String>,
        command: impl Into<String>,
        ack: impl Into<String>,
        message_type: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            sensor_id: sensor_id.into(),
            command: command.into(),
            ack: ack.into(),
            message_type: message_type.into(),
            payload: payload.into(),
        }
    }

    /// Parse a serial line (without its terminator).
    ///
    /// # Example
    /// ```
    /// use serial2mqtt_common::record::SerialRecord;
    ///
    /// let record = SerialRecord::parse("5;1;1;0;0;a;b").unwrap();
    /// assert_eq!(record.node_id(), "5");
    /// assert_eq!(record.payload(), "a;b");
    /// ```
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let fields: Vec<&str> = line.splitn(FIELD_COUNT, FIELD_SEPARATOR).collect();

        match fields.as_slice() {
            [node_id, sensor_id, command, ack, message_type, payload] => Ok(Self::new(
                *node_id,
                *sensor_id,
                *command,
                *ack,
                *message_type,
                *payload,
            )),
            _ => Err(ParseError::FieldCount {
                expected: FIELD_COUNT,
                found: fields.len(),
            }),
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn sensor_id(&self) -> &str {
        &self.sensor_id
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn ack(&self) -> &str {
        &self.ack
    }

    /// The `type` field of the record.
    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// All six fields in wire order.
    pub fn fields(&self) -> [&str; FIELD_COUNT] {
        [
            self.node_id.as_str(),
            self.sensor_id.as_str(),
            self.command.as_str(),
            self.ack.as_str(),
            self.message_type.as_str(),
            self.payload.as_str(),
        ]
    }
}

impl FromStr for SerialRecord {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SerialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&serialize(self.fields()))
    }
}

/// Join fields into a serial line. The line terminator is left to the writer.
///
/// # Example
/// ```
/// use serial2mqtt_common::record::serialize;
///
/// assert_eq!(serialize(["5", "1", "1", "0", "42"]), "5;1;1;0;42");
/// ```
pub fn serialize<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut line = String::new();
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            line.push(FIELD_SEPARATOR);
        }
        line.push_str(field.as_ref());
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_line() {
        let record = SerialRecord::parse("5;1;2;0;0;temperature=21.5").unwrap();

        assert_eq!(record.node_id(), "5");
        assert_eq!(record.sensor_id(), "1");
        assert_eq!(record.command(), "2");
        assert_eq!(record.ack(), "0");
        assert_eq!(record.message_type(), "0");
        assert_eq!(record.payload(), "temperature=21.5");
    }

    #[test]
    fn test_payload_keeps_separators() {
        let record = SerialRecord::parse("12;6;1;0;24;a;b;;c").unwrap();
        assert_eq!(record.payload(), "a;b;;c");
    }

    #[test]
    fn test_empty_payload() {
        let record = SerialRecord::parse("0;0;3;0;9;").unwrap();
        assert_eq!(record.payload(), "");
    }

    #[test]
    fn test_too_few_fields() {
        assert_eq!(
            SerialRecord::parse("5;1;2;0;0"),
            Err(ParseError::FieldCount {
                expected: 6,
                found: 5
            })
        );
        assert_eq!(
            SerialRecord::parse(""),
            Err(ParseError::FieldCount {
                expected: 6,
                found: 1
            })
        );
    }

    #[test]
    fn test_parse_error_message() {
        let err = SerialRecord::parse("garbage").unwrap_err();
        assert_eq!(err.to_string(), "expected 6 fields, found 1");
    }

    #[test]
    fn test_from_str() {
        let record: SerialRecord = "3;255;3;0;11;Relay".parse().unwrap();
        assert_eq!(record.payload(), "Relay");
        assert!("3;255".parse::<SerialRecord>().is_err());
    }

    #[test]
    fn test_display_reproduces_line() {
        let line = "12;6;1;0;24;a;b";
        let record = SerialRecord::parse(line).unwrap();
        assert_eq!(record.to_string(), line);
    }

    #[test]
    fn test_serialize() {
        assert_eq!(serialize(Vec::<String>::new()), "");
        assert_eq!(serialize(["only"]), "only");
        assert_eq!(
            serialize(vec!["5".to_string(), "1".to_string(), "x;y".to_string()]),
            "5;1;x;y"
        );
    }
}
