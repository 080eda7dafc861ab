//! Per-kind encode/decode for the four ingestable record kinds.

use bytes::{Buf, BufMut, BytesMut};
use vep_core::{
    DecodedEvent, DecodedLog, DecodedMetric, DecodedMetricKind, DecodedSignal, Event, IngestRecord,
    LogEntry, LogLevel, MetricKind, MetricSample, Quality, Severity, SignalSample, TransferItem,
    VepError,
};

use crate::map_codec::{decode_map, encode_map};
use crate::tag;
use crate::value_codec::{decode_value, encode_value};
use crate::varint::{get_f64_le, get_string, get_u8, get_varint, put_string, put_varint};

fn quality_tag(q: Quality) -> u8 {
    match q {
        Quality::Valid => tag::QUALITY_VALID,
        Quality::Invalid => tag::QUALITY_INVALID,
        Quality::NotAvailable => tag::QUALITY_NOT_AVAILABLE,
    }
}

fn quality_from_tag(t: u8) -> Quality {
    match t {
        tag::QUALITY_VALID => Quality::Valid,
        tag::QUALITY_INVALID => Quality::Invalid,
        _ => Quality::NotAvailable,
    }
}

fn severity_tag(s: Severity) -> u8 {
    match s {
        Severity::Info => tag::SEVERITY_INFO,
        Severity::Warn => tag::SEVERITY_WARN,
        Severity::Error => tag::SEVERITY_ERROR,
        Severity::Critical => tag::SEVERITY_CRITICAL,
    }
}

fn severity_from_tag(t: u8) -> Severity {
    match t {
        tag::SEVERITY_WARN => Severity::Warn,
        tag::SEVERITY_ERROR => Severity::Error,
        tag::SEVERITY_CRITICAL => Severity::Critical,
        _ => Severity::Info,
    }
}

fn log_level_tag(l: LogLevel) -> u8 {
    match l {
        LogLevel::Debug => tag::LOG_DEBUG,
        LogLevel::Info => tag::LOG_INFO,
        LogLevel::Warn => tag::LOG_WARN,
        LogLevel::Error => tag::LOG_ERROR,
    }
}

fn log_level_from_tag(t: u8) -> LogLevel {
    match t {
        tag::LOG_DEBUG => LogLevel::Debug,
        tag::LOG_WARN => LogLevel::Warn,
        tag::LOG_ERROR => LogLevel::Error,
        _ => LogLevel::Info,
    }
}

fn put_optional_string(buf: &mut BytesMut, value: &Option<String>) {
    match value {
        Some(s) => {
            buf.put_u8(1);
            put_string(buf, s);
        }
        None => buf.put_u8(0),
    }
}

fn get_optional_string(buf: &mut impl Buf) -> Result<Option<String>, VepError> {
    if get_u8(buf)? == 0 {
        Ok(None)
    } else {
        Ok(Some(get_string(buf)?))
    }
}

/// Encodes `record` to its own standalone byte buffer, independent of any
/// batch. This is what the batch builder calls at `add()` time so that the
/// caller's input record can be released immediately, before the batch is
/// ever flushed.
pub fn encode_item_bytes(record: &IngestRecord, delta_ms: u32, source_id: &str) -> (bytes::Bytes, u64) {
    let mut buf = BytesMut::new();
    let mut drops = 0u64;
    encode_item(&mut buf, record, delta_ms, source_id, &mut drops);
    (buf.freeze(), drops)
}

/// Encodes one record's kind tag, `timestamp_delta_ms`, and body. `source_id`
/// drives the `"service"` label/attribute injection for kinds that carry a
/// map. Unrecognized `Value` variants cannot occur for well-typed input, so
/// this never fails; `drops` counts any depth-one struct fields dropped.
pub fn encode_item(buf: &mut BytesMut, record: &IngestRecord, delta_ms: u32, source_id: &str, drops: &mut u64) {
    match record {
        IngestRecord::Signal(s) => {
            buf.put_u8(tag::ITEM_SIGNAL);
            put_varint(buf, delta_ms as u64);
            encode_signal(buf, s, drops);
        }
        IngestRecord::Event(e) => {
            buf.put_u8(tag::ITEM_EVENT);
            put_varint(buf, delta_ms as u64);
            encode_event(buf, e, source_id);
        }
        IngestRecord::Metric(m) => {
            buf.put_u8(tag::ITEM_METRIC);
            put_varint(buf, delta_ms as u64);
            encode_metric(buf, m, source_id);
        }
        IngestRecord::Log(l) => {
            buf.put_u8(tag::ITEM_LOG);
            put_varint(buf, delta_ms as u64);
            encode_log(buf, l, source_id);
        }
    }
}

fn encode_signal(buf: &mut BytesMut, s: &SignalSample, drops: &mut u64) {
    put_string(buf, &s.path);
    buf.put_u8(quality_tag(s.quality));
    encode_value(buf, &s.value, 0, drops);
}

fn encode_event(buf: &mut BytesMut, e: &Event, source_id: &str) {
    put_string(buf, &e.event_id);
    put_string(buf, &e.category);
    put_string(buf, &e.event_type);
    buf.put_u8(severity_tag(e.severity));
    encode_map(buf, e.attributes.as_ref().unwrap_or(&Default::default()), Some(source_id));
    encode_map(buf, e.context.as_ref().unwrap_or(&Default::default()), None);
}

fn encode_metric(buf: &mut BytesMut, m: &MetricSample, source_id: &str) {
    put_string(buf, &m.name);
    match &m.kind {
        MetricKind::Gauge(v) => {
            buf.put_u8(tag::METRIC_GAUGE);
            buf.put_f64_le(*v);
        }
        MetricKind::Counter(v) => {
            buf.put_u8(tag::METRIC_COUNTER);
            buf.put_f64_le(*v);
        }
        MetricKind::Histogram {
            sample_count,
            sample_sum,
            buckets,
        } => {
            buf.put_u8(tag::METRIC_HISTOGRAM);
            put_varint(buf, *sample_count);
            buf.put_f64_le(*sample_sum);
            put_varint(buf, buckets.len() as u64);
            for (bound, _) in buckets {
                buf.put_f64_le(*bound);
            }
            put_varint(buf, buckets.len() as u64);
            for (_, count) in buckets {
                put_varint(buf, *count);
            }
        }
    }
    encode_map(buf, &m.labels, Some(source_id));
}

fn encode_log(buf: &mut BytesMut, l: &LogEntry, source_id: &str) {
    buf.put_u8(log_level_tag(l.level));
    put_string(buf, &l.component);
    put_string(buf, &l.message);
    encode_map(buf, l.attributes.as_ref().unwrap_or(&Default::default()), Some(source_id));
    put_optional_string(buf, &l.trace_id);
    put_optional_string(buf, &l.span_id);
}

/// Decodes one item. Fails only if the outer kind tag or `timestamp_delta_ms`
/// varint cannot be read; an unrecognized kind tag is treated as a malformed
/// frame (the outer batch decoder stops there, per the fail-fast-at-the-
/// frame-boundary contract -- individual value tags still fall back silently).
pub fn decode_item(buf: &mut impl Buf, base_timestamp_ms: i64) -> Result<TransferItem, VepError> {
    if !buf.has_remaining() {
        return Err(VepError::MalformedFrame("missing item kind tag".to_string()));
    }
    let kind = get_u8(buf)?;
    let delta_ms = get_varint(buf)?;
    let timestamp_ms = base_timestamp_ms + delta_ms as i64;

    Ok(match kind {
        tag::ITEM_SIGNAL => {
            let path = get_string(buf)?;
            let quality = quality_from_tag(get_u8(buf)?);
            let value = decode_value(buf);
            TransferItem::Signal(DecodedSignal {
                path,
                quality,
                value,
                timestamp_ms,
            })
        }
        tag::ITEM_EVENT => {
            let event_id = get_string(buf)?;
            let category = get_string(buf)?;
            let event_type = get_string(buf)?;
            let severity = severity_from_tag(get_u8(buf)?);
            let attributes = decode_map(buf)?;
            let context = decode_map(buf)?;
            TransferItem::Event(DecodedEvent {
                event_id,
                category,
                event_type,
                severity,
                attributes,
                context,
                timestamp_ms,
            })
        }
        tag::ITEM_METRIC => {
            let name = get_string(buf)?;
            let metric_kind = match get_u8(buf)? {
                tag::METRIC_COUNTER => DecodedMetricKind::Counter(get_f64_le(buf)?),
                tag::METRIC_HISTOGRAM => {
                    let sample_count = get_varint(buf)?;
                    let sample_sum = get_f64_le(buf)?;
                    let bound_count = get_varint(buf)? as usize;
                    let mut bounds = Vec::with_capacity(bound_count);
                    for _ in 0..bound_count {
                        bounds.push(get_f64_le(buf)?);
                    }
                    let count_count = get_varint(buf)? as usize;
                    let mut counts = Vec::with_capacity(count_count);
                    for _ in 0..count_count {
                        counts.push(get_varint(buf)?);
                    }
                    let n = bounds.len().min(counts.len());
                    let buckets = bounds.into_iter().zip(counts).take(n).collect();
                    DecodedMetricKind::Histogram {
                        sample_count,
                        sample_sum,
                        buckets,
                    }
                }
                _ => DecodedMetricKind::Gauge(get_f64_le(buf)?),
            };
            let labels = decode_map(buf)?;
            TransferItem::Metric(DecodedMetric {
                name,
                kind: metric_kind,
                labels,
                timestamp_ms,
            })
        }
        tag::ITEM_LOG => {
            let level = log_level_from_tag(get_u8(buf)?);
            let component = get_string(buf)?;
            let message = get_string(buf)?;
            let attributes = decode_map(buf)?;
            let trace_id = get_optional_string(buf)?;
            let span_id = get_optional_string(buf)?;
            TransferItem::Log(DecodedLog {
                level,
                component,
                message,
                attributes,
                trace_id,
                span_id,
                timestamp_ms,
            })
        }
        other => {
            return Err(VepError::MalformedFrame(format!("unknown item kind tag {other}")));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use vep_core::{MessageHeader, Value};

    #[test]
    fn signal_round_trips_with_timestamp_resolved_against_base() {
        let header = MessageHeader::new("ecu-7", 5_123_000_000, 1);
        let sample = SignalSample {
            header,
            path: "Vehicle.Speed".into(),
            quality: Quality::Valid,
            value: Value::Double(87.5),
        };
        let mut buf = BytesMut::new();
        let mut drops = 0;
        encode_item(&mut buf, &IngestRecord::Signal(sample), 123, "ecu-7", &mut drops);

        let mut frozen = buf.freeze();
        let decoded = decode_item(&mut frozen, 5_000_000).unwrap();
        match decoded {
            TransferItem::Signal(d) => {
                assert_eq!(d.path, "Vehicle.Speed");
                assert_eq!(d.value, Value::Double(87.5));
                assert_eq!(d.timestamp_ms, 5_000_123);
            }
            other => panic!("expected signal, got {other:?}"),
        }
    }

    #[test]
    fn event_attributes_get_service_injected_but_context_does_not() {
        let header = MessageHeader::new("gateway-1", 0, 0);
        let mut attrs = HashMap::new();
        attrs.insert("door".to_string(), "open".to_string());
        let event = Event {
            header,
            event_id: "evt-1".into(),
            category: "body".into(),
            event_type: "door_open".into(),
            severity: Severity::Warn,
            attributes: Some(attrs),
            context: None,
        };
        let mut buf = BytesMut::new();
        let mut drops = 0;
        encode_item(&mut buf, &IngestRecord::Event(event), 0, "gateway-1", &mut drops);

        let mut frozen = buf.freeze();
        let decoded = decode_item(&mut frozen, 0).unwrap();
        match decoded {
            TransferItem::Event(d) => {
                assert_eq!(d.attributes.get("service").map(String::as_str), Some("gateway-1"));
                assert!(d.context.is_empty());
            }
            other => panic!("expected event, got {other:?}"),
        }
    }

    #[test]
    fn truncated_metric_item_fails_fast_instead_of_panicking() {
        // kind tag, delta varint, name string, metric-kind tag, then only
        // 4 of the gauge value's 8 f64 bytes -- ending the frame exactly
        // mid-item rather than mid-outer-frame. A panicking get_f64_le
        // would abort the process here instead of surfacing an error.
        let mut buf = BytesMut::new();
        buf.put_u8(tag::ITEM_METRIC);
        put_varint(&mut buf, 0);
        put_string(&mut buf, "cpu.load");
        buf.put_u8(tag::METRIC_GAUGE);
        buf.put_slice(&0.5f64.to_le_bytes()[..4]);

        let mut frozen = buf.freeze();
        let result = decode_item(&mut frozen, 0);
        assert!(matches!(result, Err(VepError::MalformedFrame(_))));
    }

    #[test]
    fn truncated_signal_item_fails_fast_instead_of_panicking() {
        // kind tag, delta varint, path string, then nothing -- the frame
        // ends exactly where the quality byte should be.
        let mut buf = BytesMut::new();
        buf.put_u8(tag::ITEM_SIGNAL);
        put_varint(&mut buf, 0);
        put_string(&mut buf, "Vehicle.Speed");

        let mut frozen = buf.freeze();
        let result = decode_item(&mut frozen, 0);
        assert!(matches!(result, Err(VepError::MalformedFrame(_))));
    }
}
