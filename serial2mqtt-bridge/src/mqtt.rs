//! MQTT transport built on `rumqttc`.

use std::future::Future;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, Publish, QoS};
use serial2mqtt_common::{MqttPublication, from_mqtt, subscription_filter};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::MqttConfig;
use crate::error::{BridgeError, Result};

/// Capacity of the client request queue.
const REQUEST_CAPACITY: usize = 64;

/// Map a configured QoS level to the `rumqttc` value.
pub fn qos(level: u8) -> Result<QoS> {
    match level {
        0 => Ok(QoS::AtMostOnce),
        1 => Ok(QoS::AtLeastOnce),
        2 => Ok(QoS::ExactlyOnce),
        other => Err(BridgeError::validation(format!(
            "invalid QoS {}, expected 0, 1 or 2",
            other
        ))),
    }
}

/// Client identifier used when none is configured.
fn generated_client_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("serial2mqtt-{}", &id[..8])
}

/// Build the client options for `config`.
pub fn mqtt_options(config: &MqttConfig) -> MqttOptions {
    let client_id = config
        .client_id
        .clone()
        .unwrap_or_else(generated_client_id);

    let mut options = MqttOptions::new(client_id, &config.host, config.port);
    options
        .set_keep_alive(Duration::from_secs(config.keep_alive_secs))
        .set_clean_session(true);

    if let Some(username) = &config.username {
        options.set_credentials(username, config.password.clone().unwrap_or_default());
    }

    options
}

/// Connect to the broker and subscribe to the inbound topic tree.
///
/// Waits until the broker acknowledges the connection; the subscription is
/// only requested after that. An unreachable broker, a refused connection or
/// a missing acknowledgement within `connect_timeout_secs` is an error.
pub async fn connect(config: &MqttConfig) -> Result<(AsyncClient, EventLoop)> {
    let options = mqtt_options(config);
    let client_id = options.client_id();
    let (client, mut eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);

    let broker = format!("{}:{}", config.host, config.port);
    info!(broker = %broker, client_id = %client_id, "Connecting to MQTT broker");

    let wait_for_connack = async {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => return Ok(ack),
                Ok(_) => continue,
                Err(e) => return Err(e),
            }
        }
    };

    let ack = tokio::time::timeout(
        Duration::from_secs(config.connect_timeout_secs),
        wait_for_connack,
    )
    .await
    .map_err(|_| {
        BridgeError::MqttConnection(format!("{}: no connection acknowledgement", broker))
    })?
    .map_err(|e| BridgeError::MqttConnection(format!("{}: {}", broker, e)))?;

    info!(
        broker = %broker,
        session_present = ack.session_present,
        "Connected to MQTT broker"
    );

    let filter = subscription_filter(&config.subscribe_topic);
    client.subscribe(&filter, qos(config.qos)?).await?;
    info!(filter = %filter, "Subscribed");

    Ok((client, eventloop))
}

/// Destination for publications produced from serial lines.
pub trait PublicationSink: Send + Sync + 'static {
    fn publish(&self, publication: MqttPublication) -> impl Future<Output = Result<()>> + Send;
}

/// Publishes to the broker through a [`AsyncClient`] handle.
#[derive(Clone, Debug)]
pub struct MqttPublisher {
    client: AsyncClient,
    qos: QoS,
}

impl MqttPublisher {
    pub fn new(client: AsyncClient, qos: QoS) -> Self {
        Self { client, qos }
    }
}

impl PublicationSink for MqttPublisher {
    async fn publish(&self, publication: MqttPublication) -> Result<()> {
        self.client
            .publish(
                publication.topic,
                self.qos,
                false,
                publication.payload.into_bytes(),
            )
            .await?;
        Ok(())
    }
}

/// Serial line for a message received on the subscribed tree.
///
/// Returns `None` (and logs a warning) when the payload is not UTF-8.
pub fn inbound_line(publish: &Publish) -> Option<String> {
    let payload = match std::str::from_utf8(&publish.payload) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(topic = %publish.topic, error = %e, "Dropping MQTT message with non UTF-8 payload");
            return None;
        }
    };

    info!(topic = %publish.topic, payload = %payload, "Received MQTT message");
    Some(from_mqtt(&publish.topic, payload))
}
