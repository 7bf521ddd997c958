//! Bridge controller.
//!
//! Owns the serial and MQTT connections and runs one task per direction:
//!
//! - serial reader: line -> [`SerialRecord`] -> gateway filter -> [`to_mqtt`] -> publish
//! - MQTT network loop: incoming publish -> [`from_mqtt`](serial2mqtt_common::from_mqtt) -> serial line
//!
//! Each task handles one message completely before taking the next, so order is
//! preserved within a direction.

use std::future::Future;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, Outgoing, Packet};
use serial2mqtt_common::{MqttPublication, SerialRecord, is_gateway_message, to_mqtt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::mqtt::{self, MqttPublisher, PublicationSink};
use crate::serial::{self, LineReader, LineWriter};

/// How long `stop` waits for each loop before aborting it.
const STOP_GRACE: Duration = Duration::from_secs(2);

/// How long the MQTT loop keeps polling to flush the disconnect request.
const DISCONNECT_GRACE: Duration = Duration::from_millis(500);

/// Lifecycle state of a [`Bridge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Idle,
    Running,
    /// Terminal, a stopped bridge cannot be started again.
    Stopped,
}

/// A running loop and the signal that stops it.
struct Worker {
    name: &'static str,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Bidirectional serial/MQTT bridge.
///
/// # Example
///
/// ```ignore
/// let mut bridge = Bridge::new(config);
/// bridge.start().await?;
///
/// tokio::select! {
///     _ = tokio::signal::ctrl_c() => {}
///     Some(e) = bridge.wait_fatal() => tracing::error!(error = %e, "Bridge failed"),
/// }
///
/// bridge.stop().await;
/// ```
pub struct Bridge {
    config: BridgeConfig,
    state: BridgeState,
    client: Option<AsyncClient>,
    /// MQTT loop first, serial reader second: the order they are stopped in.
    workers: Vec<Worker>,
    fatal_tx: mpsc::Sender<BridgeError>,
    fatal_rx: mpsc::Receiver<BridgeError>,
    /// Set when `stop` begins; loop failures after that are not fatal.
    stopping: watch::Sender<bool>,
}

impl Bridge {
    /// Create an idle bridge.
    pub fn new(config: BridgeConfig) -> Self {
        let (fatal_tx, fatal_rx) = mpsc::channel(2);

        Self {
            config,
            state: BridgeState::Idle,
            client: None,
            workers: Vec::new(),
            fatal_tx,
            fatal_rx,
            stopping: watch::Sender::new(false),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> BridgeState {
        self.state
    }

    /// The configuration the bridge was created with.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Open the serial device and the broker connection, then start both loops.
    pub async fn start(&mut self) -> Result<()> {
        self.ensure_idle()?;

        let stream = serial::open(&self.config.serial)?;
        self.start_with_serial(stream).await
    }

    /// Start the bridge on an already open serial stream.
    pub async fn start_with_serial<S>(&mut self, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        self.ensure_idle()?;

        let qos = mqtt::qos(self.config.mqtt.qos)?;
        let (client, eventloop) = mqtt::connect(&self.config.mqtt).await?;
        let (reader, writer) = serial::split(stream);

        let (mqtt_shutdown, mqtt_shutdown_rx) = watch::channel(false);
        self.spawn_worker(
            "mqtt",
            mqtt_shutdown,
            mqtt_to_serial(eventloop, client.clone(), writer, mqtt_shutdown_rx),
        );

        let (serial_shutdown, serial_shutdown_rx) = watch::channel(false);
        self.spawn_worker(
            "serial",
            serial_shutdown,
            serial_to_mqtt(
                reader,
                MqttPublisher::new(client.clone(), qos),
                self.config.mqtt.publish_topic.clone(),
                serial_shutdown_rx,
            ),
        );

        self.client = Some(client);
        self.state = BridgeState::Running;

        info!(
            device = %self.config.serial.device,
            publish_topic = %self.config.mqtt.publish_topic,
            subscribe_topic = %self.config.mqtt.subscribe_topic,
            "Bridge running"
        );

        Ok(())
    }

    /// Stop both loops, MQTT first.
    ///
    /// Each loop gets a short grace period to finish the message it is handling
    /// and is aborted after that. Never fails; calling it again is a no-op.
    ///
    /// Safe while messages are flowing: once the MQTT loop is gone the serial
    /// reader may fail to publish, which is logged but not reported through
    /// [`wait_fatal`](Self::wait_fatal).
    pub async fn stop(&mut self) {
        match self.state {
            BridgeState::Stopped => return,
            BridgeState::Idle => {
                self.state = BridgeState::Stopped;
                return;
            }
            BridgeState::Running => {}
        }

        info!("Stopping bridge");
        self.stopping.send_replace(true);

        for worker in self.workers.drain(..) {
            let Worker {
                name,
                shutdown,
                mut handle,
            } = worker;

            let _ = shutdown.send(true);

            match tokio::time::timeout(STOP_GRACE, &mut handle).await {
                Ok(Ok(())) => debug!(worker = name, "Loop stopped"),
                Ok(Err(e)) => warn!(worker = name, error = %e, "Loop ended abnormally"),
                Err(_) => {
                    warn!(worker = name, "Loop did not stop in time, aborting");
                    handle.abort();
                }
            }
        }

        self.client = None;
        self.state = BridgeState::Stopped;

        info!("Bridge stopped");
    }

    /// Wait for a loop to fail.
    ///
    /// Resolves with the first error that terminated the serial reader or the
    /// MQTT loop. Never resolves while both loops are healthy.
    pub async fn wait_fatal(&mut self) -> Option<BridgeError> {
        self.fatal_rx.recv().await
    }

    fn ensure_idle(&self) -> Result<()> {
        match self.state {
            BridgeState::Idle => Ok(()),
            BridgeState::Running => Err(BridgeError::invalid_state("bridge is already running")),
            BridgeState::Stopped => Err(BridgeError::invalid_state(
                "bridge has been stopped and cannot be restarted",
            )),
        }
    }

    fn spawn_worker<F>(&mut self, name: &'static str, shutdown: watch::Sender<bool>, future: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let fatal_tx = self.fatal_tx.clone();
        let stopping = self.stopping.subscribe();
        let handle = tokio::spawn(async move {
            if let Err(e) = future.await {
                if *stopping.borrow() {
                    debug!(worker = name, error = %e, "Loop ended while stopping");
                } else {
                    error!(worker = name, error = %e, "Loop failed");
                    let _ = fatal_tx.try_send(e);
                }
            }
        });

        self.workers.push(Worker {
            name,
            shutdown,
            handle,
        });
    }
}

/// Translate one serial line into the publication for it.
///
/// Returns `None` for lines that do not parse, for gateway messages and for
/// lines whose fields produce a topic the broker would reject (`+` or `#`).
pub fn route_serial_line(line: &str, publish_root: &str) -> Option<MqttPublication> {
    debug!(line = %line, "Serial line received");

    let record = match SerialRecord::parse(line) {
        Ok(record) => record,
        Err(e) => {
            warn!(line = %line, error = %e, "Can't parse serial message");
            return None;
        }
    };

    if is_gateway_message(&record) {
        debug!(line = %line, "Skipping gateway message");
        return None;
    }

    let publication = to_mqtt(&record, publish_root);
    if !rumqttc::valid_topic(&publication.topic) {
        warn!(
            line = %line,
            topic = %publication.topic,
            "Dropping serial message with wildcard in topic"
        );
        return None;
    }

    info!(
        topic = %publication.topic,
        payload = %publication.payload,
        "Publishing to MQTT"
    );

    Some(publication)
}

/// Serial reader loop.
///
/// Returns `Ok` when shut down, and an error when the serial device fails or
/// closes or the publication cannot be queued.
pub async fn serial_to_mqtt<R, P>(
    mut reader: LineReader<R>,
    publisher: P,
    publish_root: String,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    P: PublicationSink,
{
    loop {
        let line = tokio::select! {
            _ = shutdown.changed() => break,
            line = reader.next_line() => line.map_err(BridgeError::SerialIo)?,
        };

        let Some(line) = line else {
            return Err(BridgeError::SerialClosed);
        };

        if let Some(publication) = route_serial_line(&line, &publish_root) {
            publisher.publish(publication).await?;
        }
    }

    debug!("Serial reader stopped");
    Ok(())
}

/// MQTT network loop.
///
/// Drives the `rumqttc` event loop and writes every message received on the
/// subscribed tree to the serial device. Any connection error ends the loop;
/// there is no reconnect.
pub async fn mqtt_to_serial<W>(
    mut eventloop: EventLoop,
    client: AsyncClient,
    mut writer: LineWriter<W>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    loop {
        let event = tokio::select! {
            _ = shutdown.changed() => break,
            event = eventloop.poll() => {
                event.map_err(|e| BridgeError::MqttConnection(e.to_string()))?
            }
        };

        if let Event::Incoming(Packet::Publish(publish)) = event {
            if let Some(line) = mqtt::inbound_line(&publish) {
                info!(line = %line, "Writing serial line");
                writer
                    .write_line(&line)
                    .await
                    .map_err(BridgeError::SerialIo)?;
            }
        }
    }

    debug!("Disconnecting from MQTT broker");
    if client.try_disconnect().is_ok() {
        let flush = async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        };
        let _ = tokio::time::timeout(DISCONNECT_GRACE, flush).await;
    }

    Ok(())
}
