//! JSON envelope the bridge publishes in place of raw packet bytes.
//!
//! Deliberately header-only: consumers get identity, timing and sizing but
//! never the payload itself.

use sensorwire::SensorPacket;
use serde::Serialize;

/// Compact JSON body for one forwarded packet.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Envelope {
    pub sensor_id: u32,
    pub timestamp_us: u64,
    pub data_type: u8,
    pub seq: u64,
    pub payload_len: u16,
}

impl From<&SensorPacket<'_>> for Envelope {
    fn from(packet: &SensorPacket<'_>) -> Self {
        Self {
            sensor_id: packet.sensor_id,
            timestamp_us: packet.timestamp_us,
            data_type: packet.data_type,
            seq: packet.seq,
            payload_len: packet.payload.len() as u16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensorwire::DATA_TYPE_AUDIO;

    #[test]
    fn serializes_to_the_five_declared_keys() {
        let packet = SensorPacket {
            sensor_id: 7,
            timestamp_us: 123,
            data_type: DATA_TYPE_AUDIO,
            seq: 9,
            payload: &[0u8; 320],
        };
        let json = serde_json::to_string(&Envelope::from(&packet)).unwrap();
        assert_eq!(
            json,
            "{\"sensor_id\":7,\"timestamp_us\":123,\"data_type\":1,\"seq\":9,\"payload_len\":320}"
        );
    }
}
