//! Sensor datagram wire format and the VAD kernel that consumes it.
//!
//! The wire format is a fixed 32-byte little-endian header followed by up to
//! 4096 payload bytes; [`SensorPacket::parse`] is a zero-copy view over a
//! caller-provided buffer. [`vad::process`] routes a parsed packet to one of
//! two detectors based on its `data_type` byte: RMS energy over 16-bit PCM
//! audio, or a linear valence/arousal/dominance projection of a 10-channel
//! environment vector.

mod packet;
pub mod vad;
mod vector;

pub use packet::{SensorPacket, WireError, DATA_TYPE_AUDIO, DATA_TYPE_SENSOR_VECTOR, HEADER_LEN, MAX_PAYLOAD};
pub use vad::VadResult;
pub use vector::{SensorVector, SENSOR_VECTOR_CHANNELS, SENSOR_VECTOR_LEN};
