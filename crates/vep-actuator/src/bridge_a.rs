//! Bridge A: broker <-> fabric. Bridges application-plane signals and
//! actuator requests between the broker (the apps' signal/actuator surface)
//! and the fabric bus the rest of the vehicle speaks. Never reaches RT
//! directly -- that is [`crate::bridge_b::BridgeB`]'s job.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{info, warn};
use vep_core::Value;

use crate::broker::{BrokerClient, BrokerSchema, DiscoveredPath};
use crate::fabric::{FabricBus, FabricReader};
use crate::value::ActuatorValue;

/// Fabric poll loop cadence shared by both bridges: at most this many
/// queued messages drained per poll, with this sleep between polls.
const FABRIC_POLL_BATCH: usize = 100;
const FABRIC_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Fabric topic names and the broker schema-discovery pattern, mirroring
/// `BridgeConfig`'s defaults.
#[derive(Debug, Clone)]
pub struct BridgeAConfig {
    pub signal_pattern: String,
    pub fabric_signals_topic: String,
    pub fabric_actuator_target_topic: String,
    pub fabric_actuator_actual_topic: String,
}

impl Default for BridgeAConfig {
    fn default() -> Self {
        Self {
            signal_pattern: "Vehicle".to_string(),
            fabric_signals_topic: "rt/vss/signals".to_string(),
            fabric_actuator_target_topic: "rt/vss/actuators/target".to_string(),
            fabric_actuator_actual_topic: "rt/vss/actuators/actual".to_string(),
        }
    }
}

#[derive(Debug, Default)]
pub struct BridgeAStats {
    pub fabric_signals_received: AtomicU64,
    pub fabric_actuator_actuals_received: AtomicU64,
    pub broker_signals_published: AtomicU64,
    pub actuator_requests_received: AtomicU64,
    pub fabric_actuator_targets_sent: AtomicU64,
    pub unsupported_values_dropped: AtomicU64,
}

pub struct BridgeA<S, B, F> {
    config: BridgeAConfig,
    schema: S,
    broker: Arc<B>,
    fabric: Arc<F>,
    actuator_paths: Mutex<HashSet<String>>,
    running: AtomicBool,
    stats: Arc<BridgeAStats>,
    poll_threads: Mutex<Vec<JoinHandle<()>>>,
}

impl<S, B, F> BridgeA<S, B, F>
where
    S: BrokerSchema,
    B: BrokerClient + 'static,
    F: FabricBus + 'static,
{
    pub fn new(config: BridgeAConfig, schema: S, broker: Arc<B>, fabric: Arc<F>) -> Self {
        Self {
            config,
            schema,
            broker,
            fabric,
            actuator_paths: Mutex::new(HashSet::new()),
            running: AtomicBool::new(false),
            stats: Arc::new(BridgeAStats::default()),
            poll_threads: Mutex::new(Vec::new()),
        }
    }

    /// Discovers the broker's schema and registers an actuator handler for
    /// every discovered actuator path. Does not subscribe to fabric topics
    /// yet -- call [`start`](Self::start) for that.
    pub fn initialize(&self) {
        let discovered = self.schema.discover_paths(&self.config.signal_pattern);
        let mut actuator_paths = self.actuator_paths.lock().expect("actuator paths mutex poisoned");
        for DiscoveredPath { path, is_actuator } in discovered {
            if is_actuator {
                actuator_paths.insert(path.clone());
                self.register_actuator(path);
            }
        }
        info!(actuators = actuator_paths.len(), "bridge A initialized");
    }

    fn register_actuator(&self, path: String) {
        let fabric = Arc::clone(&self.fabric);
        let stats = Arc::clone(&self.stats);
        let target_topic = self.config.fabric_actuator_target_topic.clone();
        self.broker.register_actuator(
            &path,
            Box::new(move |path, value| {
                stats.actuator_requests_received.fetch_add(1, Ordering::Relaxed);
                let Some(narrowed) = ActuatorValue::from_value(&value) else {
                    warn!(path, "actuator target value type is not representable on the fabric; dropping");
                    stats.unsupported_values_dropped.fetch_add(1, Ordering::Relaxed);
                    return;
                };
                let message = crate::fabric::encode_message(path, &narrowed.to_value());
                fabric.publish(&target_topic, &message);
                stats.fabric_actuator_targets_sent.fetch_add(1, Ordering::Relaxed);
            }),
        );
    }

    /// Subscribes to the fabric's signal and actuator-actual topics and
    /// spawns one dedicated poll thread per topic, each draining its queue
    /// in bounded batches and forwarding to the broker as signal
    /// publications. Dispatch never runs on the publisher's thread.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let signals = self.fabric.subscribe(&self.config.fabric_signals_topic);
        let this = Arc::clone(self);
        let signals_thread = std::thread::spawn(move || this.poll_fabric_signals(signals));

        let actuals = self.fabric.subscribe(&self.config.fabric_actuator_actual_topic);
        let this = Arc::clone(self);
        let actuals_thread = std::thread::spawn(move || this.poll_fabric_actuator_actuals(actuals));

        self.poll_threads
            .lock()
            .expect("bridge A poll threads mutex poisoned")
            .extend([signals_thread, actuals_thread]);

        info!("bridge A started");
    }

    fn poll_fabric_signals(&self, reader: FabricReader) {
        while self.running.load(Ordering::SeqCst) {
            for (_topic, payload) in reader.take_each(FABRIC_POLL_BATCH) {
                self.on_fabric_signal(&payload);
            }
            std::thread::sleep(FABRIC_POLL_INTERVAL);
        }
    }

    fn poll_fabric_actuator_actuals(&self, reader: FabricReader) {
        while self.running.load(Ordering::SeqCst) {
            for (_topic, payload) in reader.take_each(FABRIC_POLL_BATCH) {
                self.on_fabric_actuator_actual(&payload);
            }
            std::thread::sleep(FABRIC_POLL_INTERVAL);
        }
    }

    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        for handle in self.poll_threads.lock().expect("bridge A poll threads mutex poisoned").drain(..) {
            let _ = handle.join();
        }
        info!("bridge A stopped");
    }

    fn on_fabric_signal(&self, payload: &[u8]) {
        self.stats.fabric_signals_received.fetch_add(1, Ordering::Relaxed);
        let Some((path, value)) = crate::fabric::decode_message(bytes::Bytes::copy_from_slice(payload)) else {
            warn!("malformed fabric signal message; dropping");
            return;
        };
        self.publish_to_broker(&path, value);
    }

    fn on_fabric_actuator_actual(&self, payload: &[u8]) {
        self.stats.fabric_actuator_actuals_received.fetch_add(1, Ordering::Relaxed);
        let Some((path, value)) = crate::fabric::decode_message(bytes::Bytes::copy_from_slice(payload)) else {
            warn!("malformed fabric actuator-actual message; dropping");
            return;
        };
        self.publish_to_broker(&path, value);
    }

    fn publish_to_broker(&self, path: &str, value: Value) {
        self.broker.publish_signal(path, &value);
        self.stats.broker_signals_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> Arc<BridgeAStats> {
        Arc::clone(&self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::InMemoryBroker;
    use crate::fabric::InMemoryFabricBus;

    fn setup() -> (Arc<BridgeA<InMemoryBroker, InMemoryBroker, InMemoryFabricBus>>, Arc<InMemoryBroker>, Arc<InMemoryFabricBus>) {
        let broker = Arc::new(InMemoryBroker::new(vec![
            DiscoveredPath { path: "Vehicle.Speed".into(), is_actuator: false },
            DiscoveredPath { path: "Vehicle.Cabin.Light.Intensity".into(), is_actuator: true },
        ]));
        let fabric = Arc::new(InMemoryFabricBus::new());
        let schema = InMemoryBroker::new(vec![
            DiscoveredPath { path: "Vehicle.Speed".into(), is_actuator: false },
            DiscoveredPath { path: "Vehicle.Cabin.Light.Intensity".into(), is_actuator: true },
        ]);
        let bridge = Arc::new(BridgeA::new(BridgeAConfig::default(), schema, Arc::clone(&broker), Arc::clone(&fabric)));
        bridge.initialize();
        bridge.start();
        (bridge, broker, fabric)
    }

    /// Poll cadence is 10ms; sleeping past a few cycles keeps these tests
    /// independent of exactly which poll iteration picks up the message.
    const POLL_SETTLE: std::time::Duration = std::time::Duration::from_millis(100);

    #[test]
    fn fabric_signal_forwards_to_the_broker() {
        let (bridge, broker, fabric) = setup();
        let message = crate::fabric::encode_message("Vehicle.Speed", &Value::Double(88.0));
        fabric.publish("rt/vss/signals", &message);

        std::thread::sleep(POLL_SETTLE);
        assert_eq!(broker.published(), vec![("Vehicle.Speed".to_string(), Value::Double(88.0))]);
        assert_eq!(bridge.stats().broker_signals_published.load(Ordering::SeqCst), 1);
        bridge.stop();
    }

    #[test]
    fn actuator_target_from_the_broker_reaches_the_fabric() {
        let (bridge, broker, fabric) = setup();
        let reader = fabric.subscribe("rt/vss/actuators/target");

        broker.set_actuator_target("Vehicle.Cabin.Light.Intensity", Value::Double(60.0));

        let received = reader.take_each(10);
        assert_eq!(received.len(), 1);
        let (_topic, payload) = &received[0];
        assert_eq!(
            crate::fabric::decode_message(bytes::Bytes::copy_from_slice(payload)),
            Some(("Vehicle.Cabin.Light.Intensity".to_string(), Value::Double(60.0)))
        );
        assert_eq!(bridge.stats().fabric_actuator_targets_sent.load(Ordering::SeqCst), 1);
        bridge.stop();
    }

    #[test]
    fn unsupported_actuator_value_types_are_dropped_not_forwarded() {
        let (bridge, broker, fabric) = setup();
        let reader = fabric.subscribe("rt/vss/actuators/target");

        broker.set_actuator_target("Vehicle.Cabin.Light.Intensity", Value::BoolArray(vec![true, false]));

        assert!(reader.take_each(10).is_empty());
        assert_eq!(bridge.stats().unsupported_values_dropped.load(Ordering::SeqCst), 1);
        bridge.stop();
    }
}
