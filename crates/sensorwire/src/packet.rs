use thiserror::Error;

/// Fixed header size in bytes.
pub const HEADER_LEN: usize = 32;

/// Maximum payload a packet may carry.
pub const MAX_PAYLOAD: usize = 4096;

/// `data_type` for 16-bit PCM audio payloads.
pub const DATA_TYPE_AUDIO: u8 = 1;

/// `data_type` for 10-channel float32 sensor vector payloads.
pub const DATA_TYPE_SENSOR_VECTOR: u8 = 2;

// Wire layout, all little-endian:
//   [ sensor_id: u32 ][ timestamp_us: u64 ][ data_type: u8 ][ reserved: 3 ]
//   [ payload_len: u16 ][ reserved: 2 ][ seq: u64 ][ padding: 4 ]
//   [ payload: payload_len bytes ]
// For TCP the packet is preceded by a u32 LE total length.

/// Error types for wire decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WireError {
    /// Buffer is smaller than the fixed header (or vector minimum).
    #[error("buffer of {len} bytes is shorter than the required {min}")]
    TooShort {
        /// Bytes available.
        len: usize,
        /// Bytes required.
        min: usize,
    },
    /// Declared payload length exceeds the protocol maximum.
    #[error("declared payload of {len} bytes exceeds maximum {MAX_PAYLOAD}")]
    Oversize {
        /// Declared payload length.
        len: usize,
    },
    /// Buffer ends before the declared payload does.
    #[error("buffer truncated: header declares {expected} payload bytes, {actual} present")]
    Truncated {
        /// Bytes the header declares.
        expected: usize,
        /// Bytes actually present after the header.
        actual: usize,
    },
}

/// A parsed sensor packet borrowing its payload from the receive buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorPacket<'a> {
    /// Opaque producer identity.
    pub sensor_id: u32,
    /// Monotonic microseconds at the producer.
    pub timestamp_us: u64,
    /// Payload discriminator; see [`DATA_TYPE_AUDIO`] and
    /// [`DATA_TYPE_SENSOR_VECTOR`].
    pub data_type: u8,
    /// Per-sensor monotonic sequence number.
    pub seq: u64,
    /// Payload bytes, borrowed from the parse buffer.
    pub payload: &'a [u8],
}

impl<'a> SensorPacket<'a> {
    /// Parses a packet from `buf` without copying the payload.
    ///
    /// Reserved and padding bytes are ignored. The buffer may extend past the
    /// declared payload; trailing bytes are not part of the packet.
    pub fn parse(buf: &'a [u8]) -> Result<Self, WireError> {
        if buf.len() < HEADER_LEN {
            return Err(WireError::TooShort {
                len: buf.len(),
                min: HEADER_LEN,
            });
        }

        let payload_len = u16::from_le_bytes([buf[16], buf[17]]) as usize;
        if payload_len > MAX_PAYLOAD {
            return Err(WireError::Oversize { len: payload_len });
        }
        if buf.len() < HEADER_LEN + payload_len {
            return Err(WireError::Truncated {
                expected: payload_len,
                actual: buf.len() - HEADER_LEN,
            });
        }

        Ok(Self {
            sensor_id: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            timestamp_us: u64::from_le_bytes(buf[4..12].try_into().unwrap()),
            data_type: buf[12],
            seq: u64::from_le_bytes(buf[20..28].try_into().unwrap()),
            payload: &buf[HEADER_LEN..HEADER_LEN + payload_len],
        })
    }

    /// Appends the wire form of this packet to `out`. Reserved and padding
    /// bytes are written as zero.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        debug_assert!(self.payload.len() <= MAX_PAYLOAD);

        out.reserve(HEADER_LEN + self.payload.len());
        out.extend_from_slice(&self.sensor_id.to_le_bytes());
        out.extend_from_slice(&self.timestamp_us.to_le_bytes());
        out.push(self.data_type);
        out.extend_from_slice(&[0u8; 3]);
        out.extend_from_slice(&(self.payload.len() as u16).to_le_bytes());
        out.extend_from_slice(&[0u8; 2]);
        out.extend_from_slice(&self.seq.to_le_bytes());
        out.extend_from_slice(&[0u8; 4]);
        out.extend_from_slice(self.payload);
    }

    /// Wire form as a fresh buffer. Convenience over [`encode_into`].
    ///
    /// [`encode_into`]: SensorPacket::encode_into
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.payload.len());
        self.encode_into(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_packet(payload: &[u8]) -> SensorPacket<'_> {
        SensorPacket {
            sensor_id: 7,
            timestamp_us: 1_700_000_000_123_456,
            data_type: DATA_TYPE_AUDIO,
            seq: 42,
            payload,
        }
    }

    #[test]
    fn encode_parse_round_trip() {
        let payload = [1u8, 2, 3, 4, 5];
        let packet = sample_packet(&payload);
        let wire = packet.encode();

        assert_eq!(wire.len(), HEADER_LEN + payload.len());
        let parsed = SensorPacket::parse(&wire).unwrap();
        assert_eq!(parsed, packet);
    }

    #[test]
    fn parse_ignores_trailing_bytes() {
        let payload = [9u8; 8];
        let mut wire = sample_packet(&payload).encode();
        wire.extend_from_slice(b"junk");

        let parsed = SensorPacket::parse(&wire).unwrap();
        assert_eq!(parsed.payload, &payload);
    }

    #[test]
    fn short_buffer_fails_too_short() {
        let wire = sample_packet(&[0u8; 4]).encode();
        assert!(matches!(
            SensorPacket::parse(&wire[..HEADER_LEN - 1]),
            Err(WireError::TooShort { .. })
        ));
    }

    #[test]
    fn oversize_payload_len_is_rejected() {
        let mut wire = sample_packet(&[]).encode();
        wire[16..18].copy_from_slice(&4097u16.to_le_bytes());
        assert_eq!(
            SensorPacket::parse(&wire),
            Err(WireError::Oversize { len: 4097 })
        );
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let payload = [0u8; 16];
        let mut wire = sample_packet(&payload).encode();
        // Declare one byte more than the buffer carries.
        wire[16..18].copy_from_slice(&17u16.to_le_bytes());
        assert_eq!(
            SensorPacket::parse(&wire),
            Err(WireError::Truncated {
                expected: 17,
                actual: 16
            })
        );
    }

    #[test]
    fn reserved_bytes_are_ignored_on_decode() {
        let payload = [5u8; 2];
        let mut wire = sample_packet(&payload).encode();
        wire[13] = 0xff;
        wire[14] = 0xff;
        wire[18] = 0xaa;
        wire[28] = 0x55;

        let parsed = SensorPacket::parse(&wire).unwrap();
        assert_eq!(parsed.sensor_id, 7);
        assert_eq!(parsed.seq, 42);
        assert_eq!(parsed.payload, &payload);
    }
}
