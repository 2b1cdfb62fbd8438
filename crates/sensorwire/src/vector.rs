use crate::packet::WireError;

/// Number of channels in a sensor vector.
pub const SENSOR_VECTOR_CHANNELS: usize = 10;

/// Minimum payload bytes for a decodable vector (10 little-endian f32).
pub const SENSOR_VECTOR_LEN: usize = SENSOR_VECTOR_CHANNELS * 4;

/// A 10-channel environment snapshot, each channel logically in `[0, 1]`.
///
/// Channel order is fixed by the wire format and mirrored by
/// [`as_array`](SensorVector::as_array).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorVector {
    pub battery_low: f32,
    pub people_count: f32,
    pub known_face: f32,
    pub unknown_face: f32,
    pub fall_event: f32,
    pub lifted: f32,
    pub idle_time: f32,
    pub sound_energy: f32,
    pub voice_rate: f32,
    pub motion_energy: f32,
}

impl SensorVector {
    /// Decodes a vector from a packet payload.
    ///
    /// Requires at least [`SENSOR_VECTOR_LEN`] bytes; anything after the
    /// tenth float is ignored.
    pub fn parse(payload: &[u8]) -> Result<Self, WireError> {
        if payload.len() < SENSOR_VECTOR_LEN {
            return Err(WireError::TooShort {
                len: payload.len(),
                min: SENSOR_VECTOR_LEN,
            });
        }

        let mut channels = [0f32; SENSOR_VECTOR_CHANNELS];
        for (i, channel) in channels.iter_mut().enumerate() {
            *channel = f32::from_le_bytes(payload[i * 4..i * 4 + 4].try_into().unwrap());
        }

        Ok(Self {
            battery_low: channels[0],
            people_count: channels[1],
            known_face: channels[2],
            unknown_face: channels[3],
            fall_event: channels[4],
            lifted: channels[5],
            idle_time: channels[6],
            sound_energy: channels[7],
            voice_rate: channels[8],
            motion_energy: channels[9],
        })
    }

    /// Channels in wire order, for weight-vector arithmetic.
    pub fn as_array(&self) -> [f32; SENSOR_VECTOR_CHANNELS] {
        [
            self.battery_low,
            self.people_count,
            self.known_face,
            self.unknown_face,
            self.fall_event,
            self.lifted,
            self.idle_time,
            self.sound_energy,
            self.voice_rate,
            self.motion_energy,
        ]
    }

    /// Wire form of this vector (40 little-endian float bytes).
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(SENSOR_VECTOR_LEN);
        for value in self.as_array() {
            out.extend_from_slice(&value.to_le_bytes());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_parse_round_trip() {
        let vector = SensorVector {
            battery_low: 0.1,
            people_count: 0.2,
            known_face: 0.3,
            unknown_face: 0.4,
            fall_event: 0.5,
            lifted: 0.6,
            idle_time: 0.7,
            sound_energy: 0.8,
            voice_rate: 0.9,
            motion_energy: 1.0,
        };
        let wire = vector.encode();
        assert_eq!(wire.len(), SENSOR_VECTOR_LEN);
        assert_eq!(SensorVector::parse(&wire).unwrap(), vector);
    }

    #[test]
    fn short_payload_is_rejected() {
        let wire = SensorVector::default().encode();
        assert!(matches!(
            SensorVector::parse(&wire[..SENSOR_VECTOR_LEN - 1]),
            Err(WireError::TooShort { .. })
        ));
    }

    #[test]
    fn extra_bytes_are_ignored() {
        let vector = SensorVector {
            motion_energy: 0.75,
            ..SensorVector::default()
        };
        let mut wire = vector.encode();
        wire.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(SensorVector::parse(&wire).unwrap(), vector);
    }
}
