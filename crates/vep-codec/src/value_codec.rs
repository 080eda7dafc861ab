//! Encode/decode for [`Value`] and the depth-one struct nesting rule.

use bytes::{Buf, BufMut, BytesMut};
use vep_core::{StructField, StructValue, Value, VepError};

use crate::tag;
use crate::varint::{get_f32_le, get_f64_le, get_string, get_u8, get_varint, put_string, put_varint};

/// Encodes `value` onto `buf`. `depth` is 0 at the top level (a signal
/// sample's value, or an array element) and 1 inside a [`StructField`].
/// A `Struct` or `StructArray` encountered at `depth >= 1` is dropped --
/// written as `Empty` -- and `drops` is incremented, per the depth-one
/// restriction: struct fields may not themselves carry struct variants.
pub fn encode_value(buf: &mut BytesMut, value: &Value, depth: u32, drops: &mut u64) {
    if depth >= 1 && matches!(value, Value::Struct(_) | Value::StructArray(_)) {
        *drops += 1;
        buf.put_u8(tag::VALUE_EMPTY);
        return;
    }

    match value {
        Value::Empty => buf.put_u8(tag::VALUE_EMPTY),
        Value::Bool(b) => {
            buf.put_u8(tag::VALUE_BOOL);
            buf.put_u8(if *b { 1 } else { 0 });
        }
        // Small integer widths are widened to 32-bit containers on the wire.
        Value::Int8(v) => {
            buf.put_u8(tag::VALUE_INT32);
            put_varint(buf, crate::varint::zigzag_encode(*v as i64));
        }
        Value::Int16(v) => {
            buf.put_u8(tag::VALUE_INT32);
            put_varint(buf, crate::varint::zigzag_encode(*v as i64));
        }
        Value::Int32(v) => {
            buf.put_u8(tag::VALUE_INT32);
            put_varint(buf, crate::varint::zigzag_encode(*v as i64));
        }
        Value::Int64(v) => {
            buf.put_u8(tag::VALUE_INT64);
            put_varint(buf, crate::varint::zigzag_encode(*v));
        }
        Value::UInt8(v) => {
            buf.put_u8(tag::VALUE_UINT32);
            put_varint(buf, *v as u64);
        }
        Value::UInt16(v) => {
            buf.put_u8(tag::VALUE_UINT32);
            put_varint(buf, *v as u64);
        }
        Value::UInt32(v) => {
            buf.put_u8(tag::VALUE_UINT32);
            put_varint(buf, *v as u64);
        }
        Value::UInt64(v) => {
            buf.put_u8(tag::VALUE_UINT64);
            put_varint(buf, *v);
        }
        Value::Float(v) => {
            buf.put_u8(tag::VALUE_FLOAT);
            buf.put_f32_le(*v);
        }
        Value::Double(v) => {
            buf.put_u8(tag::VALUE_DOUBLE);
            buf.put_f64_le(*v);
        }
        Value::String(s) => {
            buf.put_u8(tag::VALUE_STRING);
            put_string(buf, s);
        }
        Value::BoolArray(items) => {
            buf.put_u8(tag::VALUE_BOOL_ARRAY);
            put_varint(buf, items.len() as u64);
            for v in items {
                buf.put_u8(if *v { 1 } else { 0 });
            }
        }
        Value::Int8Array(items) => encode_int_array(buf, items.iter().map(|v| *v as i64)),
        Value::Int16Array(items) => encode_int_array(buf, items.iter().map(|v| *v as i64)),
        Value::Int32Array(items) => encode_int_array(buf, items.iter().map(|v| *v as i64)),
        Value::Int64Array(items) => {
            buf.put_u8(tag::VALUE_INT64_ARRAY);
            put_varint(buf, items.len() as u64);
            for v in items {
                put_varint(buf, crate::varint::zigzag_encode(*v));
            }
        }
        Value::UInt8Array(items) => encode_uint_array(buf, items.iter().map(|v| *v as u64)),
        Value::UInt16Array(items) => encode_uint_array(buf, items.iter().map(|v| *v as u64)),
        Value::UInt32Array(items) => encode_uint_array(buf, items.iter().map(|v| *v as u64)),
        Value::UInt64Array(items) => {
            buf.put_u8(tag::VALUE_UINT64_ARRAY);
            put_varint(buf, items.len() as u64);
            for v in items {
                put_varint(buf, *v);
            }
        }
        Value::FloatArray(items) => {
            buf.put_u8(tag::VALUE_FLOAT_ARRAY);
            put_varint(buf, items.len() as u64);
            for v in items {
                buf.put_f32_le(*v);
            }
        }
        Value::DoubleArray(items) => {
            buf.put_u8(tag::VALUE_DOUBLE_ARRAY);
            put_varint(buf, items.len() as u64);
            for v in items {
                buf.put_f64_le(*v);
            }
        }
        Value::StringArray(items) => {
            buf.put_u8(tag::VALUE_STRING_ARRAY);
            put_varint(buf, items.len() as u64);
            for s in items {
                put_string(buf, s);
            }
        }
        Value::Struct(s) => {
            buf.put_u8(tag::VALUE_STRUCT);
            encode_struct(buf, s, drops);
        }
        Value::StructArray(items) => {
            buf.put_u8(tag::VALUE_STRUCT_ARRAY);
            put_varint(buf, items.len() as u64);
            for s in items {
                encode_struct(buf, s, drops);
            }
        }
    }
}

fn encode_int_array(buf: &mut BytesMut, items: impl ExactSizeIterator<Item = i64>) {
    buf.put_u8(tag::VALUE_INT32_ARRAY);
    put_varint(buf, items.len() as u64);
    for v in items {
        put_varint(buf, crate::varint::zigzag_encode(v));
    }
}

fn encode_uint_array(buf: &mut BytesMut, items: impl ExactSizeIterator<Item = u64>) {
    buf.put_u8(tag::VALUE_UINT32_ARRAY);
    put_varint(buf, items.len() as u64);
    for v in items {
        put_varint(buf, v);
    }
}

fn encode_struct(buf: &mut BytesMut, s: &StructValue, drops: &mut u64) {
    put_string(buf, &s.type_name);
    put_varint(buf, s.fields.len() as u64);
    for field in &s.fields {
        put_string(buf, &field.name);
        encode_value(buf, &field.value, 1, drops);
    }
}

/// Decodes a `Value`. Never fails: an unrecognized tag, or a truncated
/// payload for a recognized tag, produces [`Value::Empty`].
pub fn decode_value(buf: &mut impl Buf) -> Value {
    decode_value_inner(buf).unwrap_or(Value::Empty)
}

fn decode_value_inner(buf: &mut impl Buf) -> Result<Value, VepError> {
    let t = get_u8(buf)?;
    Ok(match t {
        tag::VALUE_EMPTY => Value::Empty,
        tag::VALUE_BOOL => Value::Bool(get_u8(buf)? != 0),
        tag::VALUE_INT32 => Value::Int32(crate::varint::get_zigzag(buf)? as i32),
        tag::VALUE_INT64 => Value::Int64(crate::varint::get_zigzag(buf)?),
        tag::VALUE_UINT32 => Value::UInt32(get_varint(buf)? as u32),
        tag::VALUE_UINT64 => Value::UInt64(get_varint(buf)?),
        tag::VALUE_FLOAT => Value::Float(get_f32_le(buf)?),
        tag::VALUE_DOUBLE => Value::Double(get_f64_le(buf)?),
        tag::VALUE_STRING => Value::String(get_string(buf)?),
        tag::VALUE_BOOL_ARRAY => {
            let len = get_varint(buf)? as usize;
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                items.push(get_u8(buf)? != 0);
            }
            Value::BoolArray(items)
        }
        tag::VALUE_INT32_ARRAY => {
            Value::Int32Array(decode_zigzag_array(buf)?.into_iter().map(|v| v as i32).collect())
        }
        tag::VALUE_INT64_ARRAY => Value::Int64Array(decode_zigzag_array(buf)?),
        tag::VALUE_UINT32_ARRAY => {
            Value::UInt32Array(decode_varint_array(buf)?.into_iter().map(|v| v as u32).collect())
        }
        tag::VALUE_UINT64_ARRAY => Value::UInt64Array(decode_varint_array(buf)?),
        tag::VALUE_FLOAT_ARRAY => {
            let len = get_varint(buf)? as usize;
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                items.push(get_f32_le(buf)?);
            }
            Value::FloatArray(items)
        }
        tag::VALUE_DOUBLE_ARRAY => {
            let len = get_varint(buf)? as usize;
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                items.push(get_f64_le(buf)?);
            }
            Value::DoubleArray(items)
        }
        tag::VALUE_STRING_ARRAY => {
            let len = get_varint(buf)? as usize;
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                items.push(get_string(buf)?);
            }
            Value::StringArray(items)
        }
        tag::VALUE_STRUCT => Value::Struct(decode_struct(buf)?),
        tag::VALUE_STRUCT_ARRAY => {
            let len = get_varint(buf)? as usize;
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                items.push(decode_struct(buf)?);
            }
            Value::StructArray(items)
        }
        _ => Value::Empty,
    })
}

fn decode_zigzag_array(buf: &mut impl Buf) -> Result<Vec<i64>, VepError> {
    let len = get_varint(buf)? as usize;
    let mut items = Vec::with_capacity(len);
    for _ in 0..len {
        items.push(crate::varint::get_zigzag(buf)?);
    }
    Ok(items)
}

fn decode_varint_array(buf: &mut impl Buf) -> Result<Vec<u64>, VepError> {
    let len = get_varint(buf)? as usize;
    let mut items = Vec::with_capacity(len);
    for _ in 0..len {
        items.push(get_varint(buf)?);
    }
    Ok(items)
}

fn decode_struct(buf: &mut impl Buf) -> Result<StructValue, VepError> {
    let type_name = get_string(buf)?;
    let field_count = get_varint(buf)? as usize;
    let mut fields = Vec::with_capacity(field_count);
    for _ in 0..field_count {
        let name = get_string(buf)?;
        let value = decode_value(buf);
        fields.push(StructField { name, value });
    }
    Ok(StructValue { type_name, fields })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: Value) -> Value {
        let mut buf = BytesMut::new();
        let mut drops = 0;
        encode_value(&mut buf, &value, 0, &mut drops);
        let mut frozen = buf.freeze();
        decode_value(&mut frozen)
    }

    #[test]
    fn scalars_round_trip() {
        assert_eq!(round_trip(Value::Bool(true)), Value::Bool(true));
        assert_eq!(round_trip(Value::Double(3.25)), Value::Double(3.25));
        assert_eq!(
            round_trip(Value::String("hello".into())),
            Value::String("hello".into())
        );
        assert_eq!(
            round_trip(Value::Int64(-1234567890123)),
            Value::Int64(-1234567890123)
        );
    }

    #[test]
    fn narrow_ints_widen_on_the_wire() {
        // Int8/Int16/UInt8/UInt16 widen to the 32-bit container and decode
        // reconstructs the widened type, not the original narrow one.
        assert_eq!(round_trip(Value::Int8(-5)), Value::Int32(-5));
        assert_eq!(round_trip(Value::UInt16(500)), Value::UInt32(500));
    }

    #[test]
    fn empty_string_is_present_not_absent() {
        assert_eq!(round_trip(Value::String(String::new())), Value::String(String::new()));
    }

    #[test]
    fn unknown_tag_decodes_to_empty() {
        let mut buf = BytesMut::new();
        buf.put_u8(250);
        let mut frozen = buf.freeze();
        assert_eq!(decode_value(&mut frozen), Value::Empty);
    }

    #[test]
    fn struct_fields_drop_nested_struct_variants() {
        let inner = StructValue {
            type_name: "Inner".into(),
            fields: vec![StructField {
                name: "nested".into(),
                value: Value::Struct(StructValue::default()),
            }],
        };
        let mut buf = BytesMut::new();
        let mut drops = 0;
        encode_value(&mut buf, &Value::Struct(inner), 0, &mut drops);
        assert_eq!(drops, 1);

        let mut frozen = buf.freeze();
        let decoded = decode_value(&mut frozen);
        match decoded {
            Value::Struct(s) => {
                assert_eq!(s.fields.len(), 1);
                assert_eq!(s.fields[0].value, Value::Empty);
            }
            other => panic!("expected struct, got {other:?}"),
        }
    }
}
