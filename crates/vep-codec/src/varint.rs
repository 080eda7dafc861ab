//! LEB128 varints and zigzag encoding for signed fields, the width scheme
//! this codec uses in place of fixed-width integer tags.

use bytes::{Buf, BufMut};
use vep_core::VepError;

pub fn put_varint(buf: &mut impl BufMut, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.put_u8(byte);
            break;
        }
        buf.put_u8(byte | 0x80);
    }
}

pub fn get_varint(buf: &mut impl Buf) -> Result<u64, VepError> {
    let mut result: u64 = 0;
    let mut shift = 0u32;
    loop {
        if !buf.has_remaining() {
            return Err(VepError::MalformedFrame("truncated varint".to_string()));
        }
        if shift >= 64 {
            return Err(VepError::MalformedFrame("varint too long".to_string()));
        }
        let byte = buf.get_u8();
        result |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    Ok(result)
}

pub fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

pub fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

pub fn put_zigzag(buf: &mut impl BufMut, value: i64) {
    put_varint(buf, zigzag_encode(value));
}

pub fn get_zigzag(buf: &mut impl Buf) -> Result<i64, VepError> {
    Ok(zigzag_decode(get_varint(buf)?))
}

pub fn put_string(buf: &mut impl BufMut, s: &str) {
    put_varint(buf, s.len() as u64);
    buf.put_slice(s.as_bytes());
}

pub fn get_string(buf: &mut impl Buf) -> Result<String, VepError> {
    let len = get_varint(buf)? as usize;
    if buf.remaining() < len {
        return Err(VepError::MalformedFrame("truncated string".to_string()));
    }
    let mut bytes = vec![0u8; len];
    buf.copy_to_slice(&mut bytes);
    String::from_utf8(bytes).map_err(|e| VepError::MalformedFrame(e.to_string()))
}

/// Bounds-checked single-byte read. `bytes::Buf::get_u8` asserts
/// `remaining() >= 1` and panics on a truncated frame; every tag/flag byte
/// in this codec must instead fail fast with `MalformedFrame`.
pub fn get_u8(buf: &mut impl Buf) -> Result<u8, VepError> {
    if !buf.has_remaining() {
        return Err(VepError::MalformedFrame("truncated byte".to_string()));
    }
    Ok(buf.get_u8())
}

/// Bounds-checked little-endian `f64` read, for the same reason as
/// [`get_u8`] -- `bytes::Buf::get_f64_le` panics rather than erroring when
/// fewer than 8 bytes remain.
pub fn get_f64_le(buf: &mut impl Buf) -> Result<f64, VepError> {
    if buf.remaining() < 8 {
        return Err(VepError::MalformedFrame("truncated f64".to_string()));
    }
    Ok(buf.get_f64_le())
}

/// Bounds-checked little-endian `f32` read; see [`get_f64_le`].
pub fn get_f32_le(buf: &mut impl Buf) -> Result<f32, VepError> {
    if buf.remaining() < 4 {
        return Err(VepError::MalformedFrame("truncated f32".to_string()));
    }
    Ok(buf.get_f32_le())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn varint_round_trips() {
        for v in [0u64, 1, 127, 128, 300, u32::MAX as u64, u64::MAX] {
            let mut buf = BytesMut::new();
            put_varint(&mut buf, v);
            let mut frozen = buf.freeze();
            assert_eq!(get_varint(&mut frozen).unwrap(), v);
        }
    }

    #[test]
    fn zigzag_round_trips_negative_and_positive() {
        for v in [0i64, 1, -1, 2, -2, i32::MIN as i64, i32::MAX as i64] {
            let mut buf = BytesMut::new();
            put_zigzag(&mut buf, v);
            let mut frozen = buf.freeze();
            assert_eq!(get_zigzag(&mut frozen).unwrap(), v);
        }
    }

    #[test]
    fn string_round_trips_including_empty() {
        for s in ["", "hello", "with unicode é"] {
            let mut buf = BytesMut::new();
            put_string(&mut buf, s);
            let mut frozen = buf.freeze();
            assert_eq!(get_string(&mut frozen).unwrap(), s);
        }
    }
}
