//! The on-vehicle fabric bus both bridges sit on: a local publish/subscribe
//! channel carrying single-path signal and actuator messages, distinct from
//! the batched telemetry export pipeline. Reuses `vep-codec`'s value wire
//! format so a fabric message is just a path plus one encoded `Value`.
//!
//! Subscribers never run inline on the publisher's thread: [`subscribe`]
//! hands back a [`FabricReader`] queue that the subscriber's own poll
//! thread drains with [`FabricReader::take_each`], matching the bounded
//! take-each/sleep loop every other fabric-facing consumer uses.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use bytes::{Buf, BytesMut};
use vep_core::Value;

type FabricQueue = Mutex<VecDeque<(String, Vec<u8>)>>;

/// A per-subscriber handle onto one topic's backlog. Cloning the bus
/// reference does not clone this -- each `subscribe` call gets its own
/// queue, so independent pollers never steal each other's messages.
pub struct FabricReader {
    queue: Arc<FabricQueue>,
}

impl FabricReader {
    /// Drains up to `max` pending `(topic, payload)` pairs without
    /// blocking. Returns fewer than `max` -- possibly zero -- if the
    /// backlog is shorter.
    pub fn take_each(&self, max: usize) -> Vec<(String, Vec<u8>)> {
        let mut queue = self.queue.lock().expect("fabric queue mutex poisoned");
        let n = max.min(queue.len());
        queue.drain(..n).collect()
    }
}

/// A topic-addressed pub/sub bus. Bridge A and Bridge B never call each
/// other directly -- they only ever talk through this.
pub trait FabricBus: Send + Sync {
    fn publish(&self, topic: &str, payload: &[u8]);
    fn subscribe(&self, topic: &str) -> FabricReader;
}

/// Encodes one `path`/`value` pair as `[path_len_varint][path][encoded value]`.
pub fn encode_message(path: &str, value: &Value) -> bytes::Bytes {
    let mut buf = BytesMut::new();
    vep_codec::put_string(&mut buf, path);
    let mut drops = 0u64;
    vep_codec::encode_value(&mut buf, value, 0, &mut drops);
    buf.freeze()
}

/// Inverse of [`encode_message`]. `None` on a truncated or malformed
/// buffer -- fabric messages never panic the caller on bad bytes.
pub fn decode_message(mut bytes: bytes::Bytes) -> Option<(String, Value)> {
    if bytes.remaining() < 1 {
        return None;
    }
    let path = vep_codec::get_string(&mut bytes).ok()?;
    let value = vep_codec::decode_value(&mut bytes);
    Some((path, value))
}

/// In-process fabric bus for tests and single-binary deployments where
/// Bridge A and Bridge B run in the same process. Every subscriber gets its
/// own queue; `publish` only ever enqueues -- it never runs subscriber code.
#[derive(Default)]
pub struct InMemoryFabricBus {
    subscribers: Mutex<HashMap<String, Vec<Arc<FabricQueue>>>>,
}

impl InMemoryFabricBus {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FabricBus for InMemoryFabricBus {
    fn publish(&self, topic: &str, payload: &[u8]) {
        let subscribers = self.subscribers.lock().expect("fabric subscribers mutex poisoned");
        if let Some(queues) = subscribers.get(topic) {
            for queue in queues {
                queue
                    .lock()
                    .expect("fabric queue mutex poisoned")
                    .push_back((topic.to_string(), payload.to_vec()));
            }
        }
    }

    fn subscribe(&self, topic: &str) -> FabricReader {
        let queue = Arc::new(Mutex::new(VecDeque::new()));
        self.subscribers
            .lock()
            .expect("fabric subscribers mutex poisoned")
            .entry(topic.to_string())
            .or_default()
            .push(Arc::clone(&queue));
        FabricReader { queue }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_round_trips_path_and_value() {
        let encoded = encode_message("Vehicle.Speed", &Value::Double(42.5));
        let (path, value) = decode_message(encoded).unwrap();
        assert_eq!(path, "Vehicle.Speed");
        assert_eq!(value, Value::Double(42.5));
    }

    #[test]
    fn in_memory_bus_only_delivers_to_matching_topic_subscribers() {
        let bus = InMemoryFabricBus::new();
        let reader = bus.subscribe("rt/vss/signals");
        bus.publish("rt/vss/actuators/target", b"irrelevant");
        assert!(reader.take_each(100).is_empty());

        bus.publish("rt/vss/signals", b"payload");
        let taken = reader.take_each(100);
        assert_eq!(taken, vec![("rt/vss/signals".to_string(), b"payload".to_vec())]);
    }

    #[test]
    fn take_each_drains_at_most_the_requested_count() {
        let bus = InMemoryFabricBus::new();
        let reader = bus.subscribe("rt/vss/signals");
        for i in 0..150 {
            bus.publish("rt/vss/signals", &[i as u8]);
        }

        let first = reader.take_each(100);
        assert_eq!(first.len(), 100);
        let second = reader.take_each(100);
        assert_eq!(second.len(), 50);
    }
}
