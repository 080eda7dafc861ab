//! Static CAN signal mapping and the bit-packing encoder that turns a VSS
//! actuator write into raw frame bytes.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::Deserialize;
use tracing::{info, warn};
use vep_core::Value;

fn default_message_length() -> u8 {
    8
}

fn default_factor() -> f64 {
    1.0
}

/// One statically configured VSS-path-to-CAN-signal mapping. Multiple
/// mappings may share `can_id`; [`CanFrameEncoder`] keys its frame buffers
/// by that id so composite messages are emitted atomically per write.
#[derive(Debug, Clone, Deserialize)]
pub struct CanSignalMapping {
    pub vss_path: String,
    pub datatype: String,
    pub message_name: String,
    pub can_id: u32,
    /// Message length in bytes; 8 for classic CAN, clamped there per the
    /// external CAN interface's DLC limit.
    #[serde(default = "default_message_length")]
    pub message_length: u8,
    #[serde(default)]
    pub cycle_time_ms: u32,
    pub signal_name: String,
    pub bit_start: u16,
    pub bit_length: u16,
    #[serde(default)]
    pub offset: f64,
    #[serde(default = "default_factor")]
    pub factor: f64,
    #[serde(default)]
    pub value_mapping: HashMap<String, i32>,
    #[serde(default)]
    pub min_value: f64,
    #[serde(default)]
    pub max_value: f64,
}

impl CanSignalMapping {
    pub fn has_value_mapping(&self) -> bool {
        !self.value_mapping.is_empty()
    }
}

/// `raw = (vss_value - offset) / factor`. Returns 0.0 (and logs) if
/// `factor` is zero rather than dividing.
fn inverse_transform(vss_value: f64, offset: f64, factor: f64) -> f64 {
    if factor == 0.0 {
        warn!("CAN signal factor is zero, cannot apply inverse transform");
        return 0.0;
    }
    (vss_value - offset) / factor
}

fn max_for_bits(bit_length: u16) -> u64 {
    if bit_length >= 64 {
        u64::MAX
    } else {
        (1u64 << bit_length) - 1
    }
}

/// Packs `raw_value`'s low `bit_length` bits into `frame` starting at
/// `bit_start`, Intel (little-endian) order: `bit_start` is the LSB
/// position, bits are written LSB to MSB, spanning byte boundaries as
/// needed. Bits past the end of `frame` are silently dropped.
fn pack_bits(frame: &mut [u8], raw_value: u64, bit_start: u16, bit_length: u16) {
    for i in 0..bit_length {
        let bit_pos = bit_start + i;
        let byte_idx = (bit_pos / 8) as usize;
        let bit_in_byte = bit_pos % 8;
        if byte_idx >= frame.len() {
            break;
        }
        let bit = (raw_value >> i) & 1;
        if bit != 0 {
            frame[byte_idx] |= 1 << bit_in_byte;
        } else {
            frame[byte_idx] &= !(1 << bit_in_byte);
        }
    }
}

/// Holds one frame buffer per arbitration id, shared across every mapping
/// targeting that id, so that a write to one signal does not clobber bits
/// already packed by a sibling signal in the same frame.
pub struct CanFrameEncoder {
    frames: Mutex<HashMap<u32, Vec<u8>>>,
}

impl Default for CanFrameEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl CanFrameEncoder {
    pub fn new() -> Self {
        Self {
            frames: Mutex::new(HashMap::new()),
        }
    }

    /// Encodes `value` into the frame buffer bound to `mapping.can_id`,
    /// allocating or growing that buffer to `message_length` first.
    /// Returns `false` (after a per-path warning, not an error) if `value`
    /// cannot be interpreted under `mapping` -- wrong type, or an unmapped
    /// enum string.
    pub fn encode_signal(&self, mapping: &CanSignalMapping, value: &Value) -> bool {
        let mut frames = self.frames.lock().expect("CAN frame mutex poisoned");
        let frame = frames
            .entry(mapping.can_id)
            .or_insert_with(|| vec![0u8; mapping.message_length as usize]);
        if frame.len() < mapping.message_length as usize {
            frame.resize(mapping.message_length as usize, 0);
        }

        let raw_value: u64 = if mapping.has_value_mapping() {
            let Some(s) = value.as_str() else {
                warn!(path = %mapping.vss_path, "expected string value for enum-mapped CAN signal");
                return false;
            };
            match mapping.value_mapping.get(s) {
                Some(v) => *v as u64,
                None => {
                    warn!(path = %mapping.vss_path, value = s, "unknown enum string for CAN signal");
                    return false;
                }
            }
        } else {
            let Some(numeric) = value.as_numeric() else {
                warn!(path = %mapping.vss_path, "could not extract numeric value for CAN signal");
                return false;
            };

            let mut raw = inverse_transform(numeric, mapping.offset, mapping.factor);
            if mapping.min_value != mapping.max_value {
                let mut raw_min = inverse_transform(mapping.min_value, mapping.offset, mapping.factor);
                let mut raw_max = inverse_transform(mapping.max_value, mapping.offset, mapping.factor);
                if raw_min > raw_max {
                    std::mem::swap(&mut raw_min, &mut raw_max);
                }
                raw = raw.clamp(raw_min, raw_max);
            }
            raw = raw.round();

            let bound = max_for_bits(mapping.bit_length);
            if raw < 0.0 {
                0
            } else if raw > bound as f64 {
                bound
            } else {
                raw as u64
            }
        };

        pack_bits(frame, raw_value, mapping.bit_start, mapping.bit_length);
        true
    }

    /// Snapshot of the frame buffer currently accumulated for `can_id`, for
    /// a CAN transmitter to send. `None` if no signal has targeted that id
    /// yet.
    pub fn snapshot_frame(&self, can_id: u32) -> Option<Vec<u8>> {
        self.frames.lock().expect("CAN frame mutex poisoned").get(&can_id).cloned()
    }
}

/// Hands a fully packed frame off to the CAN bus. The real binding (SocketCAN,
/// a vendor driver, etc.) is outside this crate's scope -- this is the seam.
pub trait CanTransmitter: Send + Sync {
    fn transmit(&self, can_id: u32, frame: &[u8]);
}

/// Reference transmitter that only logs -- useful when no CAN interface is
/// attached (development, CI).
#[derive(Default)]
pub struct LoggingCanTransmitter;

impl CanTransmitter for LoggingCanTransmitter {
    fn transmit(&self, can_id: u32, frame: &[u8]) {
        info!(can_id = format!("0x{can_id:03X}"), frame = ?frame, "transmitting CAN frame");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping() -> CanSignalMapping {
        CanSignalMapping {
            vss_path: "Vehicle.Speed".into(),
            datatype: "float".into(),
            message_name: "SpeedMsg".into(),
            can_id: 0x100,
            message_length: 8,
            cycle_time_ms: 100,
            signal_name: "Speed".into(),
            bit_start: 8,
            bit_length: 12,
            offset: 0.0,
            factor: 0.1,
            value_mapping: HashMap::new(),
            min_value: 0.0,
            max_value: 0.0,
        }
    }

    #[test]
    fn numeric_signal_round_trips_through_the_affine_transform() {
        let encoder = CanFrameEncoder::new();
        assert!(encoder.encode_signal(&mapping(), &Value::Double(25.5)));
        let frame = encoder.snapshot_frame(0x100).unwrap();

        // raw = 25.5 / 0.1 = 255, packed at bit 8 (byte 1) for 12 bits.
        let raw = (frame[1] as u16) | ((frame[2] as u16 & 0x0f) << 8);
        assert_eq!(raw, 255);
    }

    #[test]
    fn out_of_range_values_clamp_to_the_bit_width() {
        let mut m = mapping();
        m.bit_length = 4; // max representable raw value is 15
        let encoder = CanFrameEncoder::new();
        assert!(encoder.encode_signal(&m, &Value::Double(1000.0)));
        let frame = encoder.snapshot_frame(m.can_id).unwrap();
        assert_eq!(frame[1] & 0x0f, 15);
    }

    #[test]
    fn sibling_signals_on_the_same_arbitration_id_share_one_frame() {
        let mut speed = mapping();
        speed.bit_start = 0;
        speed.bit_length = 8;
        speed.factor = 1.0;
        let mut flag = mapping();
        flag.bit_start = 8;
        flag.bit_length = 1;
        flag.factor = 1.0;

        let encoder = CanFrameEncoder::new();
        encoder.encode_signal(&speed, &Value::Double(10.0));
        encoder.encode_signal(&flag, &Value::Double(1.0));

        let frame = encoder.snapshot_frame(speed.can_id).unwrap();
        assert_eq!(frame[0], 10);
        assert_eq!(frame[1] & 0x01, 1);
    }

    #[test]
    fn unknown_enum_string_is_a_warning_not_an_error() {
        let mut m = mapping();
        m.value_mapping.insert("OPEN".into(), 1);
        m.value_mapping.insert("CLOSED".into(), 0);
        let encoder = CanFrameEncoder::new();
        assert!(!encoder.encode_signal(&m, &Value::String("AJAR".into())));
    }
}
