//! Outer `TransferBatch` framing: a 4-byte little-endian length prefix
//! around a format tag, envelope fields, and the item list.
//!
//! Two item-list shapes are supported on decode: the unified, arrival-order
//! list every current producer writes, and a legacy per-kind grouping
//! (signals, then events, then metrics, then logs) kept for batches
//! produced before the unified pipeline existed.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use vep_core::{Event, IngestRecord, LogEntry, MetricSample, SignalSample, TransferBatch, VepError};

use crate::item_codec::{decode_item, encode_item};
use crate::varint::{get_string, get_u8, get_varint, get_zigzag, put_string, put_varint, put_zigzag};

const FORMAT_UNIFIED: u8 = 1;
const FORMAT_LEGACY: u8 = 2;

#[derive(Debug, Default, Clone, Copy)]
pub struct EncodeStats {
    pub items_encoded: usize,
    pub struct_fields_dropped: u64,
}

/// `timestamp_delta_ms` for `record` against `base_timestamp_ms`, clamped to
/// `[0, u32::MAX]`. A record older than the base (negative delta) clamps to
/// 0 -- callers track that case separately as an age-dropped count.
pub fn item_delta_ms(record: &IngestRecord, base_timestamp_ms: i64) -> u32 {
    record
        .timestamp_ms()
        .saturating_sub(base_timestamp_ms)
        .clamp(0, u32::MAX as i64) as u32
}

/// Assembles a unified-format frame from items already encoded by
/// [`crate::item_codec::encode_item_bytes`] at `add()` time. The batch
/// builder holds only these pre-encoded buffers, never the original
/// records, between `add` and `build`.
pub fn assemble_unified_frame(
    source_id: &str,
    sequence: u64,
    base_timestamp_ms: i64,
    encoded_items: &[Bytes],
) -> Bytes {
    let mut inner = BytesMut::new();
    inner.put_u8(FORMAT_UNIFIED);
    put_string(&mut inner, source_id);
    put_varint(&mut inner, sequence);
    put_zigzag(&mut inner, base_timestamp_ms);
    put_varint(&mut inner, encoded_items.len() as u64);
    for item in encoded_items {
        inner.extend_from_slice(item);
    }
    frame(inner)
}

/// Encodes the unified, arrival-order batch shape. Returns the
/// length-prefixed frame ready to hand to the compressor.
pub fn encode_batch(
    source_id: &str,
    sequence: u64,
    base_timestamp_ms: i64,
    items: &[IngestRecord],
) -> (Bytes, EncodeStats) {
    let mut inner = BytesMut::new();
    inner.put_u8(FORMAT_UNIFIED);
    put_string(&mut inner, source_id);
    put_varint(&mut inner, sequence);
    put_zigzag(&mut inner, base_timestamp_ms);
    put_varint(&mut inner, items.len() as u64);

    let mut stats = EncodeStats::default();
    for item in items {
        let delta = item_delta_ms(item, base_timestamp_ms);
        encode_item(&mut inner, item, delta, source_id, &mut stats.struct_fields_dropped);
        stats.items_encoded += 1;
    }

    (frame(inner), stats)
}

/// Encodes the legacy per-kind sub-batch shape, grouping records by kind
/// rather than interleaving them in arrival order.
pub fn encode_legacy_batch(
    source_id: &str,
    sequence: u64,
    base_timestamp_ms: i64,
    signals: &[SignalSample],
    events: &[Event],
    metrics: &[MetricSample],
    logs: &[LogEntry],
) -> (Bytes, EncodeStats) {
    let mut inner = BytesMut::new();
    inner.put_u8(FORMAT_LEGACY);
    put_string(&mut inner, source_id);
    put_varint(&mut inner, sequence);
    put_zigzag(&mut inner, base_timestamp_ms);
    put_varint(&mut inner, signals.len() as u64);
    put_varint(&mut inner, events.len() as u64);
    put_varint(&mut inner, metrics.len() as u64);
    put_varint(&mut inner, logs.len() as u64);

    let mut stats = EncodeStats::default();
    let mut encode_one = |inner: &mut BytesMut, record: IngestRecord| {
        let delta = item_delta_ms(&record, base_timestamp_ms);
        encode_item(inner, &record, delta, source_id, &mut stats.struct_fields_dropped);
        stats.items_encoded += 1;
    };
    for s in signals {
        encode_one(&mut inner, IngestRecord::Signal(s.clone()));
    }
    for e in events {
        encode_one(&mut inner, IngestRecord::Event(e.clone()));
    }
    for m in metrics {
        encode_one(&mut inner, IngestRecord::Metric(m.clone()));
    }
    for l in logs {
        encode_one(&mut inner, IngestRecord::Log(l.clone()));
    }

    (frame(inner), stats)
}

fn frame(inner: BytesMut) -> Bytes {
    let mut framed = BytesMut::with_capacity(inner.len() + 4);
    framed.put_u32_le(inner.len() as u32);
    framed.extend_from_slice(&inner);
    framed.freeze()
}

/// Decodes a length-prefixed `TransferBatch` frame. Fails fast on a
/// truncated or malformed outer frame -- per the "no item recovered on
/// outer failure" contract, no partial batch is ever returned.
pub fn decode_batch(mut frame: impl Buf) -> Result<TransferBatch, VepError> {
    if frame.remaining() < 4 {
        return Err(VepError::MalformedFrame("frame shorter than length prefix".to_string()));
    }
    let declared_len = frame.get_u32_le() as usize;
    if frame.remaining() < declared_len {
        return Err(VepError::MalformedFrame(
            "frame body shorter than declared length".to_string(),
        ));
    }

    let format = get_u8(&mut frame)?;
    let source_id = get_string(&mut frame)?;
    let sequence = get_varint(&mut frame)?;
    let base_timestamp_ms = get_zigzag(&mut frame)?;

    let items = match format {
        FORMAT_UNIFIED => {
            let count = get_varint(&mut frame)? as usize;
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                items.push(decode_item(&mut frame, base_timestamp_ms)?);
            }
            items
        }
        FORMAT_LEGACY => {
            let signal_count = get_varint(&mut frame)? as usize;
            let event_count = get_varint(&mut frame)? as usize;
            let metric_count = get_varint(&mut frame)? as usize;
            let log_count = get_varint(&mut frame)? as usize;
            let total = signal_count + event_count + metric_count + log_count;
            let mut items = Vec::with_capacity(total);
            for _ in 0..total {
                items.push(decode_item(&mut frame, base_timestamp_ms)?);
            }
            items
        }
        other => {
            return Err(VepError::MalformedFrame(format!("unknown batch format tag {other}")));
        }
    };

    Ok(TransferBatch {
        source_id,
        sequence,
        base_timestamp_ms,
        items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vep_core::{MessageHeader, Quality, TransferItem, Value};

    fn sample(path: &str, ts_ns: u64) -> IngestRecord {
        IngestRecord::Signal(SignalSample {
            header: MessageHeader::new("ecu-1", ts_ns, 0),
            path: path.into(),
            quality: Quality::Valid,
            value: Value::Double(1.0),
        })
    }

    #[test]
    fn unified_batch_round_trips_in_arrival_order() {
        let items = vec![sample("a", 1_000_000_000), sample("b", 1_000_500_000)];
        let (frame, stats) = encode_batch("ecu-1", 42, 1_000, &items);
        assert_eq!(stats.items_encoded, 2);

        let decoded = decode_batch(frame).unwrap();
        assert_eq!(decoded.source_id, "ecu-1");
        assert_eq!(decoded.sequence, 42);
        assert_eq!(decoded.items.len(), 2);
        match &decoded.items[0] {
            TransferItem::Signal(s) => assert_eq!(s.path, "a"),
            _ => panic!("expected signal"),
        }
    }

    #[test]
    fn truncated_frame_fails_fast_with_no_partial_batch() {
        let items = vec![sample("a", 1_000_000_000)];
        let (frame, _) = encode_batch("ecu-1", 1, 0, &items);
        let truncated = frame.slice(0..frame.len() - 2);
        assert!(decode_batch(truncated).is_err());
    }
}
