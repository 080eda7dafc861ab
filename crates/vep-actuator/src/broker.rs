//! The application-facing signal broker side of Bridge A. Abstracts over a
//! Kuksa-databroker-shaped client: schema discovery by path pattern, signal
//! publication, and actuator target registration.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use vep_core::Value;

/// One path discovered from the broker's schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredPath {
    pub path: String,
    pub is_actuator: bool,
}

pub type ActuatorTargetHandler = Box<dyn Fn(&str, Value) + Send + Sync>;

/// Queries the broker's schema for every path under a pattern, distinguishing
/// actuators (settable by apps) from sensors (read-only), the way
/// `KuksaDdsBridge::resolve_all_signals` queries `ListMetadata`.
pub trait BrokerSchema: Send + Sync {
    fn discover_paths(&self, pattern: &str) -> Vec<DiscoveredPath>;
}

/// Publishes signal values to the broker and registers the callback invoked
/// when an app sets an actuator's target value.
pub trait BrokerClient: Send + Sync {
    fn publish_signal(&self, path: &str, value: &Value);
    fn register_actuator(&self, path: &str, handler: ActuatorTargetHandler);
}

/// In-memory broker for tests and single-process demos: schema is whatever
/// paths were preconfigured, publishes are recorded, and
/// [`InMemoryBroker::set_actuator_target`] drives a registered handler the
/// way an app's `set()` call would.
#[derive(Default)]
pub struct InMemoryBroker {
    paths: Vec<DiscoveredPath>,
    published: Mutex<Vec<(String, Value)>>,
    actuator_handlers: Mutex<HashMap<String, Arc<ActuatorTargetHandler>>>,
}

impl InMemoryBroker {
    pub fn new(paths: Vec<DiscoveredPath>) -> Self {
        Self {
            paths,
            published: Mutex::new(Vec::new()),
            actuator_handlers: Mutex::new(HashMap::new()),
        }
    }

    pub fn published(&self) -> Vec<(String, Value)> {
        self.published.lock().expect("published mutex poisoned").clone()
    }

    /// Simulates an app calling `set()` on `path`, driving whatever handler
    /// Bridge A registered for it. A no-op if nothing registered for
    /// `path` -- e.g. it was never discovered as an actuator.
    pub fn set_actuator_target(&self, path: &str, value: Value) {
        let handler = self.actuator_handlers.lock().expect("actuator handlers mutex poisoned").get(path).cloned();
        if let Some(handler) = handler {
            handler(path, value);
        }
    }
}

impl BrokerSchema for InMemoryBroker {
    fn discover_paths(&self, pattern: &str) -> Vec<DiscoveredPath> {
        self.paths.iter().filter(|p| p.path.starts_with(pattern)).cloned().collect()
    }
}

impl BrokerClient for InMemoryBroker {
    fn publish_signal(&self, path: &str, value: &Value) {
        self.published.lock().expect("published mutex poisoned").push((path.to_string(), value.clone()));
    }

    fn register_actuator(&self, path: &str, handler: ActuatorTargetHandler) {
        self.actuator_handlers
            .lock()
            .expect("actuator handlers mutex poisoned")
            .insert(path.to_string(), Arc::new(handler));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discover_paths_filters_by_prefix() {
        let broker = InMemoryBroker::new(vec![
            DiscoveredPath { path: "Vehicle.Speed".into(), is_actuator: false },
            DiscoveredPath { path: "Vehicle.Cabin.Light.Intensity".into(), is_actuator: true },
            DiscoveredPath { path: "Other.Thing".into(), is_actuator: false },
        ]);
        let found = broker.discover_paths("Vehicle");
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn set_actuator_target_drives_the_registered_handler() {
        let broker = InMemoryBroker::new(vec![]);
        let received = Arc::new(Mutex::new(None));
        let received_clone = Arc::clone(&received);
        broker.register_actuator(
            "Vehicle.Cabin.Light.Intensity",
            Box::new(move |path, value| {
                *received_clone.lock().unwrap() = Some((path.to_string(), value));
            }),
        );
        broker.set_actuator_target("Vehicle.Cabin.Light.Intensity", Value::Double(75.0));
        assert_eq!(
            *received.lock().unwrap(),
            Some(("Vehicle.Cabin.Light.Intensity".to_string(), Value::Double(75.0)))
        );
    }
}
