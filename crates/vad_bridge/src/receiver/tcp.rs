//! TCP receiver.
//!
//! One accept loop serving one client at a time, as the deployment expects a
//! single upstream feeder. The stream carries length-prefixed packets:
//! `[ total_len: u32 LE ][ packet: total_len bytes ]`. A malformed length
//! leaves the stream unframed, so the only safe recovery is dropping the
//! connection.

use crate::config::MAX_DATAGRAM;
use crate::receiver::{push_raw, udp::is_retryable};
use crate::shutdown::ShutdownFlag;
use crate::stats::Stats;
use sensorring::MpmcRing;
use sensorwire::HEADER_LEN;
use socket2::{Domain, Protocol, Socket, Type};
use std::io::Read;
use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::time::Duration;

const ACCEPT_BACKLOG: i32 = 128;

/// Builds a listener on `0.0.0.0:port` with a one-second accept timeout so
/// the loop can poll the shutdown flag.
pub fn bind(port: u16) -> std::io::Result<TcpListener> {
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    // SO_RCVTIMEO on the listening socket bounds accept(2) as well.
    socket.set_read_timeout(Some(Duration::from_secs(1)))?;

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    socket.bind(&addr.into())?;
    socket.listen(ACCEPT_BACKLOG)?;
    Ok(socket.into())
}

/// Accept loop: serve each client to completion, then take the next.
pub fn run_ingest(listener: &TcpListener, ring: &MpmcRing, stats: &Stats, flag: &ShutdownFlag) {
    tracing::info!("TCP receiver listening");

    while flag.is_running() {
        let (stream, peer) = match listener.accept() {
            Ok(accepted) => accepted,
            Err(e) if is_retryable(&e) => continue,
            Err(e) => {
                stats.record_recv_error();
                tracing::error!(error = %e, "TCP accept failed");
                break;
            }
        };

        tracing::info!(%peer, "TCP client connected");
        if let Err(e) = stream.set_nodelay(true) {
            tracing::warn!(error = %e, "failed to disable Nagle");
        }
        let _ = stream.set_read_timeout(Some(Duration::from_secs(1)));

        serve_client(stream, ring, stats, flag);
        tracing::info!(%peer, "TCP client disconnected");
    }

    tracing::info!("TCP receiver stopped");
}

/// Reads length-prefixed packets until EOF, error, bad framing or shutdown.
fn serve_client(mut stream: TcpStream, ring: &MpmcRing, stats: &Stats, flag: &ShutdownFlag) {
    let mut len_buf = [0u8; 4];
    let mut packet = vec![0u8; MAX_DATAGRAM];

    while flag.is_running() {
        if !read_full(&mut stream, &mut len_buf, flag) {
            return;
        }

        let msg_len = u32::from_le_bytes(len_buf) as usize;
        if msg_len < HEADER_LEN || msg_len > MAX_DATAGRAM {
            // The prefix cannot be trusted, so neither can anything after it.
            stats.record_parse_error();
            tracing::warn!(msg_len, "invalid length prefix, dropping connection");
            return;
        }

        if !read_full(&mut stream, &mut packet[..msg_len], flag) {
            return;
        }

        stats.record_recv((msg_len + 4) as u64);
        push_raw(ring, stats, &packet[..msg_len]);
    }
}

/// Fills `buf` completely. Returns false on EOF, connection error, or
/// shutdown during a read timeout; the caller closes the client either way.
fn read_full(stream: &mut TcpStream, buf: &mut [u8], flag: &ShutdownFlag) -> bool {
    let mut filled = 0;
    while filled < buf.len() {
        match stream.read(&mut buf[filled..]) {
            Ok(0) => return false,
            Ok(n) => filled += n,
            Err(e) if is_retryable(&e) => {
                if !flag.is_running() {
                    return false;
                }
            }
            Err(_) => return false,
        }
    }
    true
}
