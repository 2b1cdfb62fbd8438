//! UDP receivers.
//!
//! Many threads bind the same port; the kernel's reuse-port hashing load
//! balances datagrams across them. Datagram atomicity means one `recv` is
//! one whole packet, so there is no framing to do.

use crate::config::{DEFAULT_RECV_BUF, MAX_DATAGRAM};
use crate::envelope::Envelope;
use crate::receiver::push_raw;
use crate::shutdown::ShutdownFlag;
use crate::stats::Stats;
use sensorring::{MpmcRing, SpscRing};
use sensorwire::SensorPacket;
use socket2::{Domain, Protocol, Socket, Type};
use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::time::Duration;

/// Builds a reuse-port datagram socket bound to `0.0.0.0:port`.
///
/// The one-second receive timeout is what lets the run loops notice the
/// shutdown flag while idle.
pub fn bind(port: u16, recv_buf: usize) -> std::io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_reuse_port(true)?;
    socket.set_recv_buffer_size(recv_buf)?;
    socket.set_read_timeout(Some(Duration::from_secs(1)))?;

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    socket.bind(&addr.into())?;
    Ok(socket.into())
}

/// Builds a socket with the default 4 MiB kernel buffer.
pub fn bind_default(port: u16) -> std::io::Result<UdpSocket> {
    bind(port, DEFAULT_RECV_BUF)
}

/// Processor-mode receive loop: every datagram goes into the shared ring as
/// raw bytes; the VAD workers parse later.
pub fn run_ingest(
    thread_id: usize,
    socket: &UdpSocket,
    ring: &MpmcRing,
    stats: &Stats,
    flag: &ShutdownFlag,
) {
    tracing::info!(thread = thread_id, "UDP receiver listening");
    let mut buf = vec![0u8; MAX_DATAGRAM];

    while flag.is_running() {
        match socket.recv_from(&mut buf) {
            Ok((n, _)) => {
                stats.record_recv(n as u64);
                push_raw(ring, stats, &buf[..n]);
            }
            Err(e) if is_retryable(&e) => {}
            Err(e) => {
                stats.record_recv_error();
                tracing::error!(thread = thread_id, error = %e, "UDP receive failed");
                break;
            }
        }
    }

    tracing::info!(thread = thread_id, "UDP receiver stopped");
}

/// Bridge-mode receive loop: parse here, queue (topic, JSON envelope) records
/// on this receiver's private ring for the publisher.
pub fn run_bridge(
    thread_id: usize,
    socket: &UdpSocket,
    ring: &SpscRing,
    stats: &Stats,
    flag: &ShutdownFlag,
    topic_prefix: &str,
) {
    tracing::info!(thread = thread_id, "UDP bridge receiver listening");
    let mut buf = vec![0u8; MAX_DATAGRAM];

    while flag.is_running() {
        match socket.recv_from(&mut buf) {
            Ok((n, _)) => {
                stats.record_recv(n as u64);

                let packet = match SensorPacket::parse(&buf[..n]) {
                    Ok(packet) => packet,
                    Err(_) => {
                        stats.record_parse_error();
                        continue;
                    }
                };

                let topic = format!("{topic_prefix}/{}", packet.sensor_id);
                let Ok(body) = serde_json::to_vec(&Envelope::from(&packet)) else {
                    stats.record_parse_error();
                    continue;
                };

                if ring.try_push(topic.as_bytes(), &body).is_err() {
                    stats.record_channel_drop();
                }
            }
            Err(e) if is_retryable(&e) => {}
            Err(e) => {
                stats.record_recv_error();
                tracing::error!(thread = thread_id, error = %e, "UDP receive failed");
                break;
            }
        }
    }

    tracing::info!(thread = thread_id, "UDP bridge receiver stopped");
}

/// Receive-timeout expiry and signal interruption are part of normal
/// operation; anything else is a real socket error.
pub(crate) fn is_retryable(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
    )
}
