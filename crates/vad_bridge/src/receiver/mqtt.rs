//! MQTT ingest: a QoS 0 subscription feeding the shared ring.
//!
//! The client library owns reconnection; this loop's jobs are to reissue the
//! subscription on every CONNACK (a fresh session has no state), back off
//! when the broker is unreachable, and push message payloads into the ring.

use crate::receiver::push_raw;
use crate::shutdown::ShutdownFlag;
use crate::stats::Stats;
use sensorring::MpmcRing;
use rumqttc::{Client, Event, MqttOptions, Packet, QoS};
use std::thread;
use std::time::Duration;

const CLIENT_ID: &str = "vad-processor";

/// Subscribe-and-receive loop. Runs until the flag clears.
///
/// Connection failures never abort: the subscription is re-requested after
/// every reconnect and errors back off from one to ten seconds.
pub fn run_ingest(
    host: &str,
    mqtt_port: u16,
    topic: &str,
    ring: &MpmcRing,
    stats: &Stats,
    flag: &ShutdownFlag,
) {
    let mut options = MqttOptions::new(CLIENT_ID, host, mqtt_port);
    options.set_keep_alive(Duration::from_secs(30));
    options.set_clean_session(true);

    let (client, mut connection) = Client::new(options, 1024);
    if let Err(e) = client.subscribe(topic, QoS::AtMostOnce) {
        tracing::warn!(error = %e, topic, "initial subscribe request failed");
    }
    tracing::info!(topic, "MQTT receiver started");

    let mut backoff_secs = 1u64;
    while flag.is_running() {
        match connection.recv_timeout(Duration::from_secs(1)) {
            Ok(Ok(Event::Incoming(Packet::Publish(publish)))) => {
                backoff_secs = 1;
                if publish.payload.is_empty() {
                    continue;
                }
                stats.record_recv(publish.payload.len() as u64);
                push_raw(ring, stats, &publish.payload);
            }
            Ok(Ok(Event::Incoming(Packet::ConnAck(_)))) => {
                backoff_secs = 1;
                tracing::info!(topic, "MQTT connected, subscribing");
                if let Err(e) = client.subscribe(topic, QoS::AtMostOnce) {
                    tracing::warn!(error = %e, topic, "subscribe request failed");
                }
            }
            Ok(Ok(Event::Incoming(Packet::SubAck(_)))) => {
                tracing::info!(topic, "MQTT subscribed");
            }
            Ok(Ok(_)) => {
                backoff_secs = 1;
            }
            Ok(Err(e)) => {
                stats.record_recv_error();
                tracing::warn!(error = %e, retry_in_secs = backoff_secs, "MQTT connection error");
                thread::sleep(Duration::from_secs(backoff_secs));
                backoff_secs = (backoff_secs * 2).min(10);
            }
            // Timeout: idle second, loop to re-check the flag.
            Err(_) => {}
        }
    }

    tracing::info!("MQTT receiver stopped");
}
