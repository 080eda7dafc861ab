//! Bridge B: fabric <-> RT. Runs at the RT boundary, translating between
//! fabric actuator messages and whatever protocol the RT controller speaks
//! through a pluggable [`RtTransport`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{info, warn};

use crate::fabric::{FabricBus, FabricReader};
use crate::rt_transport::RtTransport;
use crate::value::ActuatorValue;

const FABRIC_POLL_BATCH: usize = 100;
const FABRIC_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct BridgeBConfig {
    pub fabric_actuator_target_topic: String,
    pub fabric_actuator_actual_topic: String,
}

impl Default for BridgeBConfig {
    fn default() -> Self {
        Self {
            fabric_actuator_target_topic: "rt/vss/actuators/target".to_string(),
            fabric_actuator_actual_topic: "rt/vss/actuators/actual".to_string(),
        }
    }
}

#[derive(Debug, Default)]
pub struct BridgeBStats {
    pub fabric_targets_received: AtomicU64,
    pub rt_commands_sent: AtomicU64,
    pub rt_actuals_received: AtomicU64,
    pub fabric_actuals_published: AtomicU64,
    pub unsupported_values_dropped: AtomicU64,
}

pub struct BridgeB<F> {
    config: BridgeBConfig,
    fabric: Arc<F>,
    rt: Arc<dyn RtTransport>,
    running: AtomicBool,
    stats: Arc<BridgeBStats>,
    poll_thread: Mutex<Option<JoinHandle<()>>>,
}

impl<F> BridgeB<F>
where
    F: FabricBus + 'static,
{
    pub fn new(config: BridgeBConfig, fabric: Arc<F>, rt: Arc<dyn RtTransport>) -> Self {
        Self {
            config,
            fabric,
            rt,
            running: AtomicBool::new(false),
            stats: Arc::new(BridgeBStats::default()),
            poll_thread: Mutex::new(None),
        }
    }

    /// Initializes the RT transport, registers the RT-actual callback that
    /// re-publishes to fabric, and spawns a dedicated poll thread draining
    /// the fabric target topic in bounded batches.
    pub fn start(self: &Arc<Self>) -> vep_core::VepResult<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        self.rt.initialize()?;

        let fabric = Arc::clone(&self.fabric);
        let stats = Arc::clone(&self.stats);
        let actual_topic = self.config.fabric_actuator_actual_topic.clone();
        self.rt.on_actual_value(Box::new(move |path, value| {
            let message = crate::fabric::encode_message(path, &value.to_value());
            fabric.publish(&actual_topic, &message);
            stats.rt_actuals_received.fetch_add(1, Ordering::Relaxed);
            stats.fabric_actuals_published.fetch_add(1, Ordering::Relaxed);
        }));

        let targets = self.fabric.subscribe(&self.config.fabric_actuator_target_topic);
        let this = Arc::clone(self);
        let thread = std::thread::spawn(move || this.poll_fabric_targets(targets));
        *self.poll_thread.lock().expect("bridge B poll thread mutex poisoned") = Some(thread);

        info!("bridge B started");
        Ok(())
    }

    fn poll_fabric_targets(&self, reader: FabricReader) {
        while self.running.load(Ordering::SeqCst) {
            for (_topic, payload) in reader.take_each(FABRIC_POLL_BATCH) {
                self.on_fabric_target(&payload);
            }
            std::thread::sleep(FABRIC_POLL_INTERVAL);
        }
    }

    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = self.poll_thread.lock().expect("bridge B poll thread mutex poisoned").take() {
            let _ = handle.join();
        }
        self.rt.shutdown();
        info!("bridge B stopped");
    }

    fn on_fabric_target(&self, payload: &[u8]) {
        self.stats.fabric_targets_received.fetch_add(1, Ordering::Relaxed);
        let Some((path, value)) = crate::fabric::decode_message(bytes::Bytes::copy_from_slice(payload)) else {
            warn!("malformed fabric actuator-target message; dropping");
            return;
        };
        let Some(narrowed) = ActuatorValue::from_value(&value) else {
            warn!(path, "actuator target value type is not representable for RT; dropping");
            self.stats.unsupported_values_dropped.fetch_add(1, Ordering::Relaxed);
            return;
        };
        if self.rt.send_actuator_target(&path, &narrowed) {
            self.stats.rt_commands_sent.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn stats(&self) -> Arc<BridgeBStats> {
        Arc::clone(&self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fabric::InMemoryFabricBus;
    use crate::rt_transport::LoopbackRtTransport;
    use vep_core::Value;

    #[test]
    fn fabric_target_is_forwarded_to_rt_and_actual_comes_back_on_fabric() {
        let fabric = Arc::new(InMemoryFabricBus::new());
        let rt = Arc::new(LoopbackRtTransport::new(Duration::from_millis(5)));
        let bridge = Arc::new(BridgeB::new(BridgeBConfig::default(), Arc::clone(&fabric), rt));
        let actual_reader = fabric.subscribe("rt/vss/actuators/actual");
        bridge.start().unwrap();

        let message = crate::fabric::encode_message("Vehicle.Cabin.Light.Intensity", &Value::Double(40.0));
        fabric.publish("rt/vss/actuators/target", &message);

        std::thread::sleep(Duration::from_millis(100));
        let received = actual_reader.take_each(10);
        assert_eq!(received.len(), 1);
        let (_topic, payload) = &received[0];
        assert_eq!(
            crate::fabric::decode_message(bytes::Bytes::copy_from_slice(payload)),
            Some(("Vehicle.Cabin.Light.Intensity".to_string(), Value::Double(40.0)))
        );
        assert_eq!(bridge.stats().rt_commands_sent.load(Ordering::SeqCst), 1);
        assert_eq!(bridge.stats().fabric_actuals_published.load(Ordering::SeqCst), 1);
        bridge.stop();
    }
}
