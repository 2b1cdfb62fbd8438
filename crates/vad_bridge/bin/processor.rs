//! Multi-transport sensor processor with VAD computation.
//!
//! One transport (UDP, TCP or an MQTT subscription) feeds raw datagrams into
//! a shared MPMC ring; M worker threads parse and run VAD. Worker 0 owns the
//! periodic stats report.

use anyhow::Context;
use clap::Parser;
use sensorring::MpmcRing;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use vad_bridge::{affinity, processor, receiver, shutdown, ProcessorArgs, ShutdownFlag, Stats, Transport};

fn main() -> anyhow::Result<()> {
    let args = ProcessorArgs::parse().clamped();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let recv_threads = match args.transport {
        Transport::Udp => args.recv_threads,
        Transport::Tcp | Transport::Mqtt => 1,
    };

    println!("=== vad-processor ===");
    println!("Transport:       {}", args.transport.label());
    println!("Port:            {}", args.port);
    if args.transport == Transport::Mqtt {
        println!("MQTT broker:     {}:{}", args.mqtt_host, args.mqtt_port);
        println!("MQTT topic:      {}", args.mqtt_topic);
    }
    println!("Recv threads:    {recv_threads}");
    println!("Proc threads:    {}", args.proc_threads);
    println!("Ring capacity:   {}", args.ring_cap);
    println!("Stats interval:  {}s", args.stats_interval);

    let flag = ShutdownFlag::new();
    shutdown::install_signal_handler(&flag).context("install signal handler")?;
    let stats = Arc::new(Stats::new());
    let ring = Arc::new(MpmcRing::with_capacity(args.ring_cap));

    // Workers first so a bursty start does not fill the ring unattended.
    let mut processors = Vec::with_capacity(args.proc_threads);
    for id in 0..args.proc_threads {
        let worker = processor::Worker {
            id,
            ring: Arc::clone(&ring),
            stats: Arc::clone(&stats),
            flag: flag.clone(),
            stats_interval: Duration::from_secs(args.stats_interval),
            transport_label: args.transport.label(),
        };
        processors.push(thread::spawn(move || {
            affinity::pin_current_thread(worker.id);
            processor::run(&worker);
        }));
    }

    let mut receivers = Vec::with_capacity(recv_threads);
    match args.transport {
        Transport::Udp => {
            for i in 0..recv_threads {
                let socket = receiver::udp::bind_default(args.port)
                    .with_context(|| format!("bind UDP port {}", args.port))?;
                let ring = Arc::clone(&ring);
                let stats = Arc::clone(&stats);
                let flag = flag.clone();
                let slot = args.proc_threads + i;
                receivers.push(thread::spawn(move || {
                    affinity::pin_current_thread(slot);
                    receiver::udp::run_ingest(i, &socket, &ring, &stats, &flag);
                }));
            }
        }
        Transport::Tcp => {
            let listener = receiver::tcp::bind(args.port)
                .with_context(|| format!("bind TCP port {}", args.port))?;
            let ring = Arc::clone(&ring);
            let stats = Arc::clone(&stats);
            let flag = flag.clone();
            let slot = args.proc_threads;
            receivers.push(thread::spawn(move || {
                affinity::pin_current_thread(slot);
                receiver::tcp::run_ingest(&listener, &ring, &stats, &flag);
            }));
        }
        Transport::Mqtt => {
            let host = args.mqtt_host.clone();
            let topic = args.mqtt_topic.clone();
            let mqtt_port = args.mqtt_port;
            let ring = Arc::clone(&ring);
            let stats = Arc::clone(&stats);
            let flag = flag.clone();
            let slot = args.proc_threads;
            receivers.push(thread::spawn(move || {
                affinity::pin_current_thread(slot);
                receiver::mqtt::run_ingest(&host, mqtt_port, &topic, &ring, &stats, &flag);
            }));
        }
    }

    println!(
        "All systems go, listening for sensor data via {}",
        args.transport.label()
    );

    for handle in receivers {
        if handle.join().is_err() {
            tracing::error!("receiver thread panicked");
        }
    }

    // Receivers are gone (signal or fatal socket error); stop the workers too.
    flag.trigger();
    for handle in processors {
        if handle.join().is_err() {
            tracing::error!("processor thread panicked");
        }
    }

    println!("Shutdown complete.");
    Ok(())
}
