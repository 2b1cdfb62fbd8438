//! Command-line configuration for the two binaries.

use clap::{Parser, ValueEnum};

pub const DEFAULT_PORT: u16 = 9000;
pub const DEFAULT_MQTT_HOST: &str = "127.0.0.1";
pub const DEFAULT_MQTT_PORT: u16 = 1883;
/// Subscribe filter for MQTT ingest.
pub const DEFAULT_SUBSCRIBE_TOPIC: &str = "vad/sensors/+";
/// Publish prefix for bridge egress; the sensor id is appended per message.
pub const DEFAULT_TOPIC_PREFIX: &str = "vad/sensors";
pub const DEFAULT_RING_CAPACITY: usize = 262_144;
pub const DEFAULT_BRIDGE_RING_CAPACITY: usize = 65_536;
/// Kernel receive buffer requested per socket.
pub const DEFAULT_RECV_BUF: usize = 4 * 1024 * 1024;
pub const DEFAULT_STATS_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_RECV_THREADS: usize = 4;
pub const DEFAULT_PROC_THREADS: usize = 2;

pub const MAX_RECV_THREADS: usize = 32;
pub const MAX_PROC_THREADS: usize = 16;
/// Largest message accepted from any transport.
pub const MAX_DATAGRAM: usize = 65_535;
/// Rings smaller than this thrash on contention; capacities are floored here.
pub const MIN_RING_CAPACITY: usize = 1024;

/// Ingest transport for the processor topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Transport {
    Udp,
    Tcp,
    Mqtt,
}

impl Transport {
    /// Uppercase label used in the stats line.
    pub fn label(self) -> &'static str {
        match self {
            Self::Udp => "UDP",
            Self::Tcp => "TCP",
            Self::Mqtt => "MQTT",
        }
    }
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Udp => "udp",
            Self::Tcp => "tcp",
            Self::Mqtt => "mqtt",
        })
    }
}

/// Arguments for the `vad-processor` binary.
#[derive(Debug, Parser)]
#[command(name = "vad-processor", about = "Multi-transport sensor processor with VAD computation")]
pub struct ProcessorArgs {
    /// Ingest transport.
    #[arg(long, value_enum, default_value_t = Transport::Udp)]
    pub transport: Transport,

    /// Listen port for UDP/TCP.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// MQTT broker host (mqtt transport only).
    #[arg(long, default_value = DEFAULT_MQTT_HOST)]
    pub mqtt_host: String,

    /// MQTT broker port.
    #[arg(long, default_value_t = DEFAULT_MQTT_PORT)]
    pub mqtt_port: u16,

    /// MQTT subscribe topic filter.
    #[arg(long, default_value = DEFAULT_SUBSCRIBE_TOPIC)]
    pub mqtt_topic: String,

    /// Receiver threads (UDP only; TCP and MQTT use one).
    #[arg(long, default_value_t = DEFAULT_RECV_THREADS)]
    pub recv_threads: usize,

    /// VAD processor threads.
    #[arg(long, default_value_t = DEFAULT_PROC_THREADS)]
    pub proc_threads: usize,

    /// Shared ring buffer capacity (rounded up to a power of two).
    #[arg(long, default_value_t = DEFAULT_RING_CAPACITY)]
    pub ring_cap: usize,

    /// Seconds between stats reports; 0 disables them.
    #[arg(long, default_value_t = DEFAULT_STATS_INTERVAL_SECS)]
    pub stats_interval: u64,
}

impl ProcessorArgs {
    /// Clamps thread counts and ring capacity into their supported ranges.
    pub fn clamped(mut self) -> Self {
        self.recv_threads = self.recv_threads.clamp(1, MAX_RECV_THREADS);
        self.proc_threads = self.proc_threads.clamp(1, MAX_PROC_THREADS);
        self.ring_cap = self.ring_cap.max(MIN_RING_CAPACITY);
        self
    }
}

/// Arguments for the `sensor-bridge` binary.
#[derive(Debug, Parser)]
#[command(name = "sensor-bridge", about = "UDP to MQTT sensor bridge")]
pub struct BridgeArgs {
    /// UDP listen port (shared across receiver threads via reuse-port).
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// UDP receiver threads, one SPSC ring each.
    #[arg(long, default_value_t = DEFAULT_RECV_THREADS)]
    pub threads: usize,

    /// MQTT broker host.
    #[arg(long, default_value = DEFAULT_MQTT_HOST)]
    pub mqtt_host: String,

    /// MQTT broker port.
    #[arg(long, default_value_t = DEFAULT_MQTT_PORT)]
    pub mqtt_port: u16,

    /// Topic prefix; messages publish to `<prefix>/<sensor_id>`.
    #[arg(long, default_value = DEFAULT_TOPIC_PREFIX)]
    pub topic_prefix: String,

    /// Per-receiver ring capacity (rounded up to a power of two).
    #[arg(long, default_value_t = DEFAULT_BRIDGE_RING_CAPACITY)]
    pub ring_cap: usize,

    /// Seconds between stats reports; 0 disables them.
    #[arg(long, default_value_t = DEFAULT_STATS_INTERVAL_SECS)]
    pub stats_interval: u64,
}

impl BridgeArgs {
    /// Clamps thread count and ring capacity into their supported ranges.
    pub fn clamped(mut self) -> Self {
        self.threads = self.threads.clamp(1, MAX_RECV_THREADS);
        self.ring_cap = self.ring_cap.max(MIN_RING_CAPACITY);
        self
    }
}
