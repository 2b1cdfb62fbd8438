//! Outbound message seam for the bridge publisher.
//!
//! The publisher only ever sees [`MessageSink`]; the production
//! implementation wraps an MQTT client, tests substitute a recorder. All
//! publishes are fire-and-forget QoS 0, non-retained.

use crate::shutdown::ShutdownFlag;
use rumqttc::{Client, ClientError, Connection, Event, MqttOptions, Packet, QoS};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

/// Outbound queue depth tolerated while the broker is unreachable.
const PUBLISH_QUEUE_CAPACITY: usize = 65_536;

/// Error types for publish attempts.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The client-side queue is full; the message was dropped.
    #[error("publish queue full")]
    QueueFull,
    /// Any other client rejection.
    #[error("publish failed: {0}")]
    Publish(String),
}

/// Non-blocking publish endpoint.
pub trait MessageSink: Send + Sync {
    /// Queues one message for delivery. Must never block the caller.
    fn try_publish(&self, topic: &str, payload: &[u8]) -> Result<(), SinkError>;
}

/// MQTT-backed sink. Publishes are queued on the client and shipped by a
/// background connection-driver thread.
pub struct MqttSink {
    client: Client,
}

impl MqttSink {
    /// Creates the client and spawns the thread that drives its network
    /// connection until shutdown.
    ///
    /// Broker unavailability is not an error here: publishes queue up to
    /// [`PUBLISH_QUEUE_CAPACITY`] and the driver reconnects with backoff.
    pub fn connect(
        host: &str,
        port: u16,
        client_id: &str,
        flag: &ShutdownFlag,
    ) -> (Self, JoinHandle<()>) {
        let mut options = MqttOptions::new(client_id, host, port);
        options.set_keep_alive(Duration::from_secs(30));
        options.set_clean_session(true);

        let (client, connection) = Client::new(options, PUBLISH_QUEUE_CAPACITY);
        let driver = {
            let flag = flag.clone();
            thread::spawn(move || drive_connection(connection, &flag))
        };

        (Self { client }, driver)
    }
}

impl MessageSink for MqttSink {
    fn try_publish(&self, topic: &str, payload: &[u8]) -> Result<(), SinkError> {
        self.client
            .try_publish(topic, QoS::AtMostOnce, false, payload.to_vec())
            .map_err(|e| match e {
                ClientError::TryRequest(_) => SinkError::QueueFull,
                other => SinkError::Publish(other.to_string()),
            })
    }
}

/// Polls the event loop, reconnecting with 1-10s backoff on errors, until
/// the running flag clears.
pub(crate) fn drive_connection(mut connection: Connection, flag: &ShutdownFlag) {
    let mut backoff_secs = 1u64;

    while flag.is_running() {
        match connection.recv_timeout(Duration::from_secs(1)) {
            Ok(Ok(event)) => {
                if let Event::Incoming(Packet::ConnAck(_)) = event {
                    tracing::info!("MQTT connected");
                }
                backoff_secs = 1;
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, retry_in_secs = backoff_secs, "MQTT connection error");
                thread::sleep(Duration::from_secs(backoff_secs));
                backoff_secs = (backoff_secs * 2).min(10);
            }
            // Timeout: nothing happened this second, loop to re-check the flag.
            Err(_) => {}
        }
    }
    tracing::info!("MQTT connection driver stopped");
}
