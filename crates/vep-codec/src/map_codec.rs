//! Parallel key/value sequence encoding for attribute, context, and label
//! maps, with `"service"` injected as the first pair when `source_id` is
//! non-empty.

use std::collections::HashMap;

use bytes::{Buf, BufMut, BytesMut};
use vep_core::VepError;

use crate::varint::{get_string, get_varint, put_string, put_varint};

pub fn encode_map(buf: &mut BytesMut, map: &HashMap<String, String>, service_id: Option<&str>) {
    let injected = service_id.filter(|id| !id.is_empty());
    let len = map.len() + injected.is_some() as usize;

    put_varint(buf, len as u64);
    if let Some(id) = injected {
        put_string(buf, "service");
    }
    for k in map.keys() {
        put_string(buf, k);
    }

    put_varint(buf, len as u64);
    if let Some(id) = injected {
        put_string(buf, id);
    }
    for v in map.values() {
        put_string(buf, v);
    }
}

/// Decodes the two parallel arrays, tolerating a length mismatch by taking
/// the shorter of the two.
pub fn decode_map(buf: &mut impl Buf) -> Result<HashMap<String, String>, VepError> {
    let key_count = get_varint(buf)? as usize;
    let mut keys = Vec::with_capacity(key_count);
    for _ in 0..key_count {
        keys.push(get_string(buf)?);
    }

    let value_count = get_varint(buf)? as usize;
    let mut values = Vec::with_capacity(value_count);
    for _ in 0..value_count {
        values.push(get_string(buf)?);
    }

    let n = keys.len().min(values.len());
    let mut map = HashMap::with_capacity(n);
    for i in 0..n {
        map.insert(keys[i].clone(), values[i].clone());
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_is_injected_first() {
        let mut map = HashMap::new();
        map.insert("region".to_string(), "eu-west".to_string());
        let mut buf = BytesMut::new();
        encode_map(&mut buf, &map, Some("telemetry-gw-1"));

        let mut frozen = buf.freeze();
        let decoded = decode_map(&mut frozen).unwrap();
        assert_eq!(decoded.get("service").map(String::as_str), Some("telemetry-gw-1"));
        assert_eq!(decoded.get("region").map(String::as_str), Some("eu-west"));
    }

    #[test]
    fn empty_source_id_is_not_injected() {
        let map = HashMap::new();
        let mut buf = BytesMut::new();
        encode_map(&mut buf, &map, Some(""));
        let mut frozen = buf.freeze();
        assert!(decode_map(&mut frozen).unwrap().is_empty());
    }
}
