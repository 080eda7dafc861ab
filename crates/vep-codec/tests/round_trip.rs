use std::collections::HashMap;

use vep_codec::{decode_batch, encode_batch};
use vep_core::{
    Event, IngestRecord, LogEntry, LogLevel, MessageHeader, MetricKind, MetricSample, Quality,
    Severity, SignalSample, TransferItem, Value,
};

#[test]
fn a_heterogeneous_batch_round_trips_preserving_arrival_order() {
    let mut labels = HashMap::new();
    labels.insert("unit".to_string(), "kph".to_string());

    let items = vec![
        IngestRecord::Signal(SignalSample {
            header: MessageHeader::new("ecu-7", 1_000_000_000, 0),
            path: "Vehicle.Speed".into(),
            quality: Quality::Valid,
            value: Value::Double(100.0),
        }),
        IngestRecord::Event(Event {
            header: MessageHeader::new("ecu-7", 1_000_020_000, 1),
            event_id: "evt-1".into(),
            category: "powertrain".into(),
            event_type: "gear_shift".into(),
            severity: Severity::Info,
            attributes: None,
            context: None,
        }),
        IngestRecord::Metric(MetricSample {
            header: MessageHeader::new("ecu-7", 1_000_040_000, 2),
            name: "cpu_load".into(),
            kind: MetricKind::Gauge(0.42),
            labels,
        }),
        IngestRecord::Log(LogEntry {
            header: MessageHeader::new("ecu-7", 1_000_060_000, 3),
            level: LogLevel::Warn,
            component: "exporter".into(),
            message: "queue high watermark".into(),
            attributes: None,
            trace_id: None,
            span_id: None,
        }),
    ];

    let (frame, stats) = encode_batch("ecu-7", 1, 1_000_000, &items);
    assert_eq!(stats.items_encoded, 4);
    assert_eq!(stats.struct_fields_dropped, 0);

    let batch = decode_batch(frame).unwrap();
    assert_eq!(batch.source_id, "ecu-7");
    assert_eq!(batch.sequence, 1);
    assert_eq!(batch.items.len(), 4);

    match &batch.items[0] {
        TransferItem::Signal(s) => {
            assert_eq!(s.path, "Vehicle.Speed");
            assert_eq!(s.timestamp_ms, 1_000_000);
        }
        other => panic!("expected signal first, got {other:?}"),
    }
    match &batch.items[2] {
        TransferItem::Metric(m) => {
            assert_eq!(m.labels.get("service").map(String::as_str), Some("ecu-7"));
            assert_eq!(m.labels.get("unit").map(String::as_str), Some("kph"));
        }
        other => panic!("expected metric third, got {other:?}"),
    }
}
