//! Multi-transport sensor ingestion bridge.
//!
//! Two deployment topologies share the ring-buffer core from `sensorring`:
//!
//! - **Bridge** (`sensor-bridge` binary): N UDP receiver threads share one
//!   port via kernel reuse-port load balancing, each owning a private SPSC
//!   ring of (topic, JSON) records; a single publisher thread drains all
//!   rings round-robin into fire-and-forget MQTT publishes.
//! - **Processor** (`vad-processor` binary): one transport (UDP, TCP or MQTT
//!   subscription) feeds raw datagrams into a shared MPMC ring; M worker
//!   threads pop, parse and run VAD, counting results into the shared
//!   statistics block.
//!
//! All hot-path failures (parse errors, full rings, socket hiccups, publish
//! rejections) are counted and dropped, never propagated; only setup failures
//! abort the process. A single process-wide running flag, flipped by
//! SIGINT/SIGTERM, winds every loop down.

pub mod affinity;
pub mod config;
pub mod envelope;
pub mod processor;
pub mod publisher;
pub mod receiver;
pub mod shutdown;
pub mod sink;
pub mod stats;

pub use config::{BridgeArgs, ProcessorArgs, Transport};
pub use envelope::Envelope;
pub use shutdown::ShutdownFlag;
pub use sink::{MessageSink, MqttSink, SinkError};
pub use stats::{Stats, StatsSnapshot};
