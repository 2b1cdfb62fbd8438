//! End-to-end pipeline tests over real sockets on the loopback interface.
//!
//! Every test binds port 0 and reads back the kernel-assigned port, so tests
//! can run in parallel without colliding.

use sensorring::{Frame, MpmcRing, SpscRing};
use sensorwire::{SensorPacket, DATA_TYPE_AUDIO, HEADER_LEN};
use std::io::Write;
use std::net::{TcpStream, UdpSocket};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use vad_bridge::processor::{self, Worker};
use vad_bridge::{publisher, receiver, MessageSink, ShutdownFlag, SinkError, Stats};

const RECV_BUF: usize = 4 * 1024 * 1024;

fn audio_packet_wire(sensor_id: u32, seq: u64, payload: &[u8]) -> Vec<u8> {
    SensorPacket {
        sensor_id,
        timestamp_us: 1_000 + seq,
        data_type: DATA_TYPE_AUDIO,
        seq,
        payload,
    }
    .encode()
}

/// Polls `condition` until it holds or the deadline passes.
fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}

#[test]
fn udp_pipeline_processes_every_datagram() {
    let socket = receiver::udp::bind(0, RECV_BUF).unwrap();
    let port = socket.local_addr().unwrap().port();

    let ring = Arc::new(MpmcRing::with_capacity(1024));
    let stats = Arc::new(Stats::new());
    let flag = ShutdownFlag::new();

    let receiver_thread = {
        let ring = Arc::clone(&ring);
        let stats = Arc::clone(&stats);
        let flag = flag.clone();
        thread::spawn(move || receiver::udp::run_ingest(0, &socket, &ring, &stats, &flag))
    };
    let worker_thread = {
        let worker = Worker {
            id: 0,
            ring: Arc::clone(&ring),
            stats: Arc::clone(&stats),
            flag: flag.clone(),
            stats_interval: Duration::ZERO,
            transport_label: "UDP",
        };
        thread::spawn(move || processor::run(&worker))
    };

    let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
    let payload = [0u8; 320];
    for seq in 0..1000u64 {
        let wire = audio_packet_wire(7, seq, &payload);
        sender.send_to(&wire, ("127.0.0.1", port)).unwrap();
    }

    assert!(
        wait_for(Duration::from_secs(5), || stats.peek().processed == 1000),
        "pipeline stalled: {:?}",
        stats.peek()
    );

    let snap = stats.peek();
    assert_eq!(snap.recv_packets, 1000);
    assert_eq!(snap.recv_bytes, 1000 * (HEADER_LEN as u64 + 320));
    assert_eq!(snap.processed, 1000);
    assert_eq!(snap.vad_active, 0, "silence must not trigger VAD");
    assert_eq!(snap.parse_errors, 0);
    assert_eq!(snap.channel_drops, 0);

    flag.trigger();
    receiver_thread.join().unwrap();
    worker_thread.join().unwrap();
}

#[test]
fn oversize_datagram_counts_as_parse_error() {
    let socket = receiver::udp::bind(0, RECV_BUF).unwrap();
    let port = socket.local_addr().unwrap().port();

    let ring = Arc::new(MpmcRing::with_capacity(1024));
    let stats = Arc::new(Stats::new());
    let flag = ShutdownFlag::new();

    let receiver_thread = {
        let ring = Arc::clone(&ring);
        let stats = Arc::clone(&stats);
        let flag = flag.clone();
        thread::spawn(move || receiver::udp::run_ingest(0, &socket, &ring, &stats, &flag))
    };

    // Hand-rolled header declaring a 4097-byte payload (beyond the protocol
    // maximum), followed by those 4097 bytes.
    let mut wire = vec![0u8; HEADER_LEN];
    wire[0..4].copy_from_slice(&7u32.to_le_bytes());
    wire[12] = DATA_TYPE_AUDIO;
    wire[16..18].copy_from_slice(&4097u16.to_le_bytes());
    wire.extend_from_slice(&vec![0u8; 4097]);

    let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
    sender.send_to(&wire, ("127.0.0.1", port)).unwrap();

    assert!(wait_for(Duration::from_secs(3), || {
        stats.peek().parse_errors == 1
    }));
    let snap = stats.peek();
    assert_eq!(snap.recv_packets, 1);
    assert_eq!(snap.processed, 0);
    assert_eq!(snap.channel_drops, 0);
    assert!(ring.is_empty());

    flag.trigger();
    receiver_thread.join().unwrap();
}

#[test]
fn slow_consumer_overflows_into_channel_drops() {
    let socket = receiver::udp::bind(0, RECV_BUF).unwrap();
    let port = socket.local_addr().unwrap().port();

    let ring = Arc::new(MpmcRing::with_capacity(1024));
    let stats = Arc::new(Stats::new());
    let flag = ShutdownFlag::new();

    // No consumer at all: the ring must fill and then shed load.
    let receiver_thread = {
        let ring = Arc::clone(&ring);
        let stats = Arc::clone(&stats);
        let flag = flag.clone();
        thread::spawn(move || receiver::udp::run_ingest(0, &socket, &ring, &stats, &flag))
    };

    let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
    let payload = [0u8; 320];
    for seq in 0..10_000u64 {
        let wire = audio_packet_wire(1, seq, &payload);
        sender.send_to(&wire, ("127.0.0.1", port)).unwrap();
    }

    assert!(
        wait_for(Duration::from_secs(5), || stats.peek().channel_drops > 0),
        "expected drops once the ring filled: {:?}",
        stats.peek()
    );

    // Drops only accumulate, and occupancy stays bounded.
    let first = stats.peek().channel_drops;
    thread::sleep(Duration::from_millis(50));
    let second = stats.peek().channel_drops;
    assert!(second >= first);
    assert!(ring.len() <= ring.capacity());

    flag.trigger();
    receiver_thread.join().unwrap();
}

#[test]
fn tcp_reassembles_two_packets_from_one_write() {
    let listener = receiver::tcp::bind(0).unwrap();
    let port = listener.local_addr().unwrap().port();

    let ring = Arc::new(MpmcRing::with_capacity(1024));
    let stats = Arc::new(Stats::new());
    let flag = ShutdownFlag::new();

    let receiver_thread = {
        let ring = Arc::clone(&ring);
        let stats = Arc::clone(&stats);
        let flag = flag.clone();
        thread::spawn(move || receiver::tcp::run_ingest(&listener, &ring, &stats, &flag))
    };

    let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
    let mut combined = Vec::new();
    for seq in 0..2u64 {
        let packet = audio_packet_wire(3, seq, &[0u8; 64]);
        combined.extend_from_slice(&(packet.len() as u32).to_le_bytes());
        combined.extend_from_slice(&packet);
    }
    stream.write_all(&combined).unwrap();
    stream.flush().unwrap();

    assert!(wait_for(Duration::from_secs(3), || ring.len() == 2));

    // Both packets delivered, in write order.
    let mut frame = Frame::new();
    for expected_seq in 0..2u64 {
        assert!(ring.try_pop(&mut frame));
        let packet = SensorPacket::parse(frame.as_slice()).unwrap();
        assert_eq!(packet.sensor_id, 3);
        assert_eq!(packet.seq, expected_seq);
    }

    let snap = stats.peek();
    assert_eq!(snap.recv_packets, 2);
    assert_eq!(snap.parse_errors, 0);

    drop(stream);
    flag.trigger();
    receiver_thread.join().unwrap();
}

#[test]
fn tcp_invalid_length_prefix_drops_the_connection() {
    let listener = receiver::tcp::bind(0).unwrap();
    let port = listener.local_addr().unwrap().port();

    let ring = Arc::new(MpmcRing::with_capacity(1024));
    let stats = Arc::new(Stats::new());
    let flag = ShutdownFlag::new();

    let receiver_thread = {
        let ring = Arc::clone(&ring);
        let stats = Arc::clone(&stats);
        let flag = flag.clone();
        thread::spawn(move || receiver::tcp::run_ingest(&listener, &ring, &stats, &flag))
    };

    // A length below the fixed header size is unframeable garbage.
    let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
    stream.write_all(&8u32.to_le_bytes()).unwrap();
    stream.flush().unwrap();

    assert!(wait_for(Duration::from_secs(3), || {
        stats.peek().parse_errors == 1
    }));
    assert!(ring.is_empty());

    flag.trigger();
    receiver_thread.join().unwrap();
}

#[derive(Default)]
struct MockSink {
    messages: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MockSink {
    fn count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    fn messages(&self) -> Vec<(String, Vec<u8>)> {
        self.messages.lock().unwrap().clone()
    }
}

impl MessageSink for MockSink {
    fn try_publish(&self, topic: &str, payload: &[u8]) -> Result<(), SinkError> {
        self.messages
            .lock()
            .unwrap()
            .push((topic.to_string(), payload.to_vec()));
        Ok(())
    }
}

#[test]
fn bridge_publishes_envelopes_to_per_sensor_topics() {
    let socket = receiver::udp::bind(0, RECV_BUF).unwrap();
    let port = socket.local_addr().unwrap().port();

    let ring = Arc::new(SpscRing::with_capacity(1024));
    let stats = Arc::new(Stats::new());
    let flag = ShutdownFlag::new();
    let sink = Arc::new(MockSink::default());

    let receiver_thread = {
        let ring = Arc::clone(&ring);
        let stats = Arc::clone(&stats);
        let flag = flag.clone();
        thread::spawn(move || {
            receiver::udp::run_bridge(0, &socket, &ring, &stats, &flag, "vad/sensors")
        })
    };
    let publisher_thread = {
        let rings = vec![Arc::clone(&ring)];
        let stats = Arc::clone(&stats);
        let flag = flag.clone();
        let sink = Arc::clone(&sink);
        thread::spawn(move || publisher::run(&rings, sink.as_ref(), &stats, &flag))
    };

    let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
    for seq in 0..100u64 {
        let wire = audio_packet_wire((seq % 10) as u32, seq, &[0u8; 32]);
        sender.send_to(&wire, ("127.0.0.1", port)).unwrap();
    }

    assert!(
        wait_for(Duration::from_secs(5), || sink.count() == 100),
        "published {} of 100",
        sink.count()
    );

    for (topic, payload) in sink.messages() {
        let body: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        let object = body.as_object().unwrap();
        for key in ["sensor_id", "timestamp_us", "data_type", "seq", "payload_len"] {
            assert!(object.contains_key(key), "envelope missing {key}");
        }
        assert_eq!(object.len(), 5);
        assert_eq!(
            topic,
            format!("vad/sensors/{}", object["sensor_id"].as_u64().unwrap())
        );
        assert_eq!(object["payload_len"].as_u64().unwrap(), 32);
    }

    let snap = stats.peek();
    assert_eq!(snap.published, 100);
    assert_eq!(snap.publish_errors, 0);

    flag.trigger();
    receiver_thread.join().unwrap();
    publisher_thread.join().unwrap();
}

#[test]
fn shutdown_joins_all_threads_within_two_seconds() {
    let socket = receiver::udp::bind(0, RECV_BUF).unwrap();

    let ring = Arc::new(MpmcRing::with_capacity(1024));
    let stats = Arc::new(Stats::new());
    let flag = ShutdownFlag::new();

    let receiver_thread = {
        let ring = Arc::clone(&ring);
        let stats = Arc::clone(&stats);
        let flag = flag.clone();
        thread::spawn(move || receiver::udp::run_ingest(0, &socket, &ring, &stats, &flag))
    };
    let workers: Vec<_> = (0..2)
        .map(|id| {
            let worker = Worker {
                id,
                ring: Arc::clone(&ring),
                stats: Arc::clone(&stats),
                flag: flag.clone(),
                stats_interval: Duration::ZERO,
                transport_label: "UDP",
            };
            thread::spawn(move || processor::run(&worker))
        })
        .collect();

    // Let everything block in its receive/pop loop first.
    thread::sleep(Duration::from_millis(300));
    flag.trigger();

    let started = Instant::now();
    receiver_thread.join().unwrap();
    for worker in workers {
        worker.join().unwrap();
    }
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "threads took {:?} to exit",
        started.elapsed()
    );
}
