//! Voice Activity Detection over parsed sensor packets.
//!
//! Two detectors share one entry point, [`process`]:
//!
//! - **Audio** (`data_type = 1`, and the fallback for unknown types): RMS
//!   energy over signed 16-bit little-endian PCM samples against a fixed
//!   threshold.
//! - **Emotional** (`data_type = 2`): linear projection of the 10-channel
//!   sensor vector onto valence / arousal / dominance axes. Each axis is a
//!   weighted sum plus bias, clamped to `[0, 1]`; activity is decided on
//!   arousal alone.
//!
//! Both detectors are pure: no allocation, no I/O, output fully determined by
//! the packet.

use crate::packet::{SensorPacket, DATA_TYPE_SENSOR_VECTOR};
use crate::vector::{SensorVector, SENSOR_VECTOR_CHANNELS};

/// RMS energy above which audio counts as voice activity.
pub const AUDIO_ENERGY_THRESHOLD: f64 = 30.0;

/// Arousal above which the emotional projection counts as activity.
pub const EMOTIONAL_ACTIVE_THRESHOLD: f32 = 0.35;

// Per-axis weights over the 10 vector channels, plus a trailing bias term.
// Channel order: battery_low, people_count, known_face, unknown_face,
// fall_event, lifted, idle_time, sound_energy, voice_rate, motion_energy.
//
// Valence rewards familiarity and company, penalises threats; arousal tracks
// overall activation minus passivity; dominance tracks control and
// familiarity minus vulnerability.
const VALENCE_W: [f32; 11] = [
    -0.05, 0.15, 0.30, -0.20, -0.20, -0.15, -0.10, 0.05, 0.15, 0.00, 0.30,
];
const AROUSAL_W: [f32; 11] = [
    0.00, 0.10, 0.00, 0.10, 0.20, 0.15, -0.25, 0.25, 0.10, 0.25, 0.10,
];
const DOMINANCE_W: [f32; 11] = [
    -0.15, 0.10, 0.25, -0.20, -0.15, -0.15, -0.05, 0.05, 0.15, 0.05, 0.35,
];

/// Outcome of running a packet through a detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VadResult {
    /// Acoustic RMS detection.
    Audio {
        sensor_id: u32,
        seq: u64,
        is_active: bool,
        /// RMS over the packet's samples; 0 for an empty payload.
        energy: f64,
        /// The decision threshold, echoed for consumers.
        threshold: f64,
    },
    /// Emotional valence/arousal/dominance projection.
    Emotional {
        sensor_id: u32,
        seq: u64,
        is_active: bool,
        valence: f32,
        arousal: f32,
        dominance: f32,
    },
}

impl VadResult {
    /// Whether the detector judged the packet active.
    #[inline]
    pub fn is_active(&self) -> bool {
        match self {
            Self::Audio { is_active, .. } | Self::Emotional { is_active, .. } => *is_active,
        }
    }

    /// Producer identity carried through from the packet.
    #[inline]
    pub fn sensor_id(&self) -> u32 {
        match self {
            Self::Audio { sensor_id, .. } | Self::Emotional { sensor_id, .. } => *sensor_id,
        }
    }

    /// Sequence number carried through from the packet.
    #[inline]
    pub fn seq(&self) -> u64 {
        match self {
            Self::Audio { seq, .. } | Self::Emotional { seq, .. } => *seq,
        }
    }
}

/// Routes a packet to the detector selected by its `data_type`.
///
/// Sensor-vector packets go to the emotional projection; audio and any
/// unrecognised type go to the RMS detector.
pub fn process(packet: &SensorPacket<'_>) -> VadResult {
    if packet.data_type == DATA_TYPE_SENSOR_VECTOR {
        compute_emotional(packet)
    } else {
        compute_audio(packet)
    }
}

/// RMS energy detection over signed 16-bit little-endian samples.
///
/// A trailing odd byte is ignored; an empty payload yields zero energy.
pub fn compute_audio(packet: &SensorPacket<'_>) -> VadResult {
    let n_samples = packet.payload.len() / 2;

    let energy = if n_samples > 0 {
        let mut sum_sq = 0.0f64;
        for chunk in packet.payload.chunks_exact(2) {
            let sample = f64::from(i16::from_le_bytes([chunk[0], chunk[1]]));
            sum_sq += sample * sample;
        }
        (sum_sq / n_samples as f64).sqrt()
    } else {
        0.0
    };

    VadResult::Audio {
        sensor_id: packet.sensor_id,
        seq: packet.seq,
        is_active: energy > AUDIO_ENERGY_THRESHOLD,
        energy,
        threshold: AUDIO_ENERGY_THRESHOLD,
    }
}

/// Valence/arousal/dominance projection of the sensor vector.
///
/// An undecodable payload produces all-zero axes and an inactive result;
/// the caller still counts the packet as processed.
pub fn compute_emotional(packet: &SensorPacket<'_>) -> VadResult {
    let (valence, arousal, dominance) = match SensorVector::parse(packet.payload) {
        Ok(vector) => {
            let channels = vector.as_array();
            (
                weighted_sum(&channels, &VALENCE_W),
                weighted_sum(&channels, &AROUSAL_W),
                weighted_sum(&channels, &DOMINANCE_W),
            )
        }
        Err(_) => (0.0, 0.0, 0.0),
    };

    VadResult::Emotional {
        sensor_id: packet.sensor_id,
        seq: packet.seq,
        is_active: arousal > EMOTIONAL_ACTIVE_THRESHOLD,
        valence,
        arousal,
        dominance,
    }
}

fn weighted_sum(channels: &[f32; SENSOR_VECTOR_CHANNELS], weights: &[f32; 11]) -> f32 {
    let mut sum = weights[10]; // bias
    for (channel, weight) in channels.iter().zip(weights) {
        sum += channel * weight;
    }
    sum.clamp(0.0, 1.0)
}
