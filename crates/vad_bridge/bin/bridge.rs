//! UDP to MQTT sensor bridge.
//!
//! N reuse-port UDP receivers parse datagrams and queue (topic, JSON)
//! records on private SPSC rings; one publisher thread drains them all into
//! fire-and-forget MQTT publishes. The main thread owns the periodic stats
//! report and the shutdown sequence.

use anyhow::Context;
use clap::Parser;
use sensorring::SpscRing;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;
use vad_bridge::stats::emit;
use vad_bridge::{affinity, publisher, receiver, shutdown, BridgeArgs, MqttSink, ShutdownFlag, Stats};

fn main() -> anyhow::Result<()> {
    let args = BridgeArgs::parse().clamped();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== sensor-bridge ===");
    println!("Port:            {}", args.port);
    println!("Recv threads:    {}", args.threads);
    println!("MQTT broker:     {}:{}", args.mqtt_host, args.mqtt_port);
    println!("Topic prefix:    {}", args.topic_prefix);
    println!("Ring capacity:   {}", args.ring_cap);
    println!("Stats interval:  {}s", args.stats_interval);

    let flag = ShutdownFlag::new();
    shutdown::install_signal_handler(&flag).context("install signal handler")?;
    let stats = Arc::new(Stats::new());

    let rings: Vec<Arc<SpscRing>> = (0..args.threads)
        .map(|_| Arc::new(SpscRing::with_capacity(args.ring_cap)))
        .collect();

    // The client queues publishes while disconnected; broker availability is
    // the driver thread's problem, not a setup failure.
    let (sink, mqtt_driver) =
        MqttSink::connect(&args.mqtt_host, args.mqtt_port, "vad-sensor-bridge", &flag);

    let mut receivers = Vec::with_capacity(args.threads);
    for (i, ring) in rings.iter().enumerate() {
        let socket = receiver::udp::bind_default(args.port)
            .with_context(|| format!("bind UDP port {}", args.port))?;
        let ring = Arc::clone(ring);
        let stats = Arc::clone(&stats);
        let flag = flag.clone();
        let prefix = args.topic_prefix.clone();
        receivers.push(thread::spawn(move || {
            affinity::pin_current_thread(i);
            receiver::udp::run_bridge(i, &socket, &ring, &stats, &flag, &prefix);
        }));
    }

    let publisher_thread = {
        let rings = rings.clone();
        let stats = Arc::clone(&stats);
        let flag = flag.clone();
        let publisher_slot = args.threads;
        thread::spawn(move || {
            affinity::pin_current_thread(publisher_slot);
            publisher::run(&rings, &sink, &stats, &flag);
        })
    };

    println!("All systems go, forwarding sensor data from UDP to MQTT");

    let interval = Duration::from_secs(args.stats_interval);
    let mut last_report = Instant::now();
    while flag.is_running() {
        thread::sleep(Duration::from_millis(200));
        if interval.is_zero() {
            continue;
        }
        let elapsed = last_report.elapsed();
        if elapsed >= interval {
            emit(&stats.snapshot_and_reset().bridge_line(elapsed.as_secs_f64()));
            last_report = Instant::now();
        }
    }

    for handle in receivers {
        if handle.join().is_err() {
            tracing::error!("receiver thread panicked");
        }
    }
    if publisher_thread.join().is_err() {
        tracing::error!("publisher thread panicked");
    }
    if mqtt_driver.join().is_err() {
        tracing::error!("MQTT driver thread panicked");
    }

    println!("Shutdown complete.");
    Ok(())
}
