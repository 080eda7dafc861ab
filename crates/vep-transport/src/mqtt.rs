//! MQTT-backed [`BackendTransport`]. Runs `rumqttc`'s blocking client and
//! event loop on a dedicated thread so that connection-state callbacks,
//! per the core design, never fire under a caller-held mutex.

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use rumqttc::{Client, Event, Incoming, MqttOptions, Outgoing, QoS};
use tracing::{debug, info, warn};
use vep_core::{ConnectionState, Persistence, QueueLevel, VepError, VepResult};

use crate::backend::{BackendTransport, ConnectionStatusCallback, ContentCallback, QueueStatusCallback};
use crate::stats::{TransportStats, TransportStatsSnapshot};
use crate::topic::telemetry_topic;

/// Construction parameters for one bound content id. `publish_prefix` and
/// `subscribe_prefix` are already resolved for this instance's role --
/// `v2c`/`c2v` on the vehicle side, swapped on the cloud side.
pub struct MqttTransportConfig {
    pub broker_host: String,
    pub broker_port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keepalive_sec: u64,
    pub vehicle_id: String,
    pub content_id: u32,
    pub publish_prefix: String,
    pub subscribe_prefix: String,
}

fn state_to_u8(s: ConnectionState) -> u8 {
    match s {
        ConnectionState::Disconnected => 0,
        ConnectionState::Connecting => 1,
        ConnectionState::Connected => 2,
        ConnectionState::Reconnecting => 3,
    }
}

fn state_from_u8(v: u8) -> ConnectionState {
    match v {
        1 => ConnectionState::Connecting,
        2 => ConnectionState::Connected,
        3 => ConnectionState::Reconnecting,
        _ => ConnectionState::Disconnected,
    }
}

fn queue_level_from_pending(pending: u64, capacity: u64) -> QueueLevel {
    if capacity == 0 {
        return QueueLevel::Low;
    }
    let ratio = pending as f64 / capacity as f64;
    if ratio >= 1.0 {
        QueueLevel::Full
    } else if ratio >= 0.7 {
        QueueLevel::High
    } else {
        QueueLevel::Low
    }
}

fn queue_level_to_u8(l: QueueLevel) -> u8 {
    match l {
        QueueLevel::Low => 0,
        QueueLevel::High => 1,
        QueueLevel::Full => 2,
    }
}

fn queue_level_from_u8(v: u8) -> QueueLevel {
    match v {
        1 => QueueLevel::High,
        2 => QueueLevel::Full,
        _ => QueueLevel::Low,
    }
}

/// Fires the registered `queue_status` callback only on a Low/High/Full
/// transition, not on every publish/ack -- `queue_level_flag` holds the
/// last level reported so both the publishing thread and the connection
/// thread agree on when a crossing actually happened.
fn notify_queue_status(queue_level_flag: &AtomicU8, callbacks: &Callbacks, new_level: QueueLevel) {
    let new = queue_level_to_u8(new_level);
    let prev = queue_level_flag.swap(new, Ordering::SeqCst);
    if prev != new {
        if let Some(cb) = callbacks.queue_status.lock().expect("callback mutex poisoned").as_ref() {
            cb(new_level);
        }
    }
}

struct Callbacks {
    content: Mutex<Option<ContentCallback>>,
    connection_status: Mutex<Option<ConnectionStatusCallback>>,
    queue_status: Mutex<Option<QueueStatusCallback>>,
}

impl Default for Callbacks {
    fn default() -> Self {
        Self {
            content: Mutex::new(None),
            connection_status: Mutex::new(None),
            queue_status: Mutex::new(None),
        }
    }
}

pub struct MqttBackendTransport {
    config: MqttTransportConfig,
    state: Arc<AtomicU8>,
    in_flight: Arc<AtomicU64>,
    queue_capacity: u64,
    queue_level: Arc<AtomicU8>,
    stats: Arc<TransportStats>,
    callbacks: Arc<Callbacks>,
    client: Mutex<Option<Client>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl MqttBackendTransport {
    pub fn new(config: MqttTransportConfig) -> Self {
        Self {
            config,
            state: Arc::new(AtomicU8::new(state_to_u8(ConnectionState::Disconnected))),
            in_flight: Arc::new(AtomicU64::new(0)),
            queue_capacity: 256,
            queue_level: Arc::new(AtomicU8::new(queue_level_to_u8(QueueLevel::Low))),
            stats: Arc::new(TransportStats::default()),
            callbacks: Arc::new(Callbacks::default()),
            client: Mutex::new(None),
            worker: Mutex::new(None),
        }
    }

    fn set_state(&self, next: ConnectionState, reason: &str) {
        self.state.store(state_to_u8(next), Ordering::SeqCst);
        if let Some(cb) = self.callbacks.connection_status.lock().expect("callback mutex poisoned").as_ref() {
            cb(next, reason);
        }
    }

    fn publish_topic(&self) -> String {
        telemetry_topic(&self.config.publish_prefix, &self.config.vehicle_id, self.config.content_id)
    }

    fn subscribe_topic(&self) -> String {
        telemetry_topic(&self.config.subscribe_prefix, &self.config.vehicle_id, self.config.content_id)
    }
}

impl BackendTransport for MqttBackendTransport {
    fn start(&self) -> VepResult<()> {
        let mut client_slot = self.client.lock().expect("client mutex poisoned");
        if client_slot.is_some() {
            return Ok(());
        }

        let mut opts = MqttOptions::new(&self.config.client_id, &self.config.broker_host, self.config.broker_port);
        opts.set_keep_alive(Duration::from_secs(self.config.keepalive_sec));
        if let (Some(user), Some(pass)) = (&self.config.username, &self.config.password) {
            opts.set_credentials(user, pass);
        }

        let (client, mut connection) = Client::new(opts, 64);
        let subscribe_topic = self.subscribe_topic();
        client
            .subscribe(&subscribe_topic, QoS::AtLeastOnce)
            .map_err(|e| VepError::Other(anyhow::anyhow!("mqtt subscribe failed: {e}")))?;

        self.set_state(ConnectionState::Connecting, "start");

        let callbacks = Arc::clone(&self.callbacks);
        let content_id = self.config.content_id;
        let state_flag = Arc::clone(&self.state);
        let in_flight_flag = Arc::clone(&self.in_flight);
        let queue_level_flag = Arc::clone(&self.queue_level);
        let queue_capacity = self.queue_capacity;
        let stats = Arc::clone(&self.stats);

        let handle = std::thread::spawn(move || {
            for event in connection.iter() {
                match event {
                    Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                        state_flag.store(state_to_u8(ConnectionState::Connected), Ordering::SeqCst);
                        if let Some(cb) = callbacks.connection_status.lock().expect("callback mutex poisoned").as_ref() {
                            cb(ConnectionState::Connected, "connack");
                        }
                    }
                    Ok(Event::Incoming(Incoming::Publish(publish))) => {
                        stats.record_receive(publish.payload.len(), now_ns());
                        if let Some(cb) = callbacks.content.lock().expect("callback mutex poisoned").as_ref() {
                            cb(content_id, publish.payload.to_vec());
                        }
                    }
                    Ok(Event::Outgoing(Outgoing::PubAck(_))) | Ok(Event::Incoming(Incoming::PubAck(_))) => {
                        let pending = in_flight_flag.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
                        let level = queue_level_from_pending(pending, queue_capacity);
                        notify_queue_status(&queue_level_flag, &callbacks, level);
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!(error = %err, "mqtt event loop error, reconnecting");
                        state_flag.store(state_to_u8(ConnectionState::Reconnecting), Ordering::SeqCst);
                        if let Some(cb) = callbacks.connection_status.lock().expect("callback mutex poisoned").as_ref() {
                            cb(ConnectionState::Reconnecting, "connection error");
                        }
                    }
                }
            }
            debug!("mqtt event loop exited");
        });

        *self.worker.lock().expect("worker mutex poisoned") = Some(handle);
        *client_slot = Some(client);
        Ok(())
    }

    fn stop(&self) {
        if let Some(client) = self.client.lock().expect("client mutex poisoned").take() {
            let _ = client.disconnect();
        }
        if let Some(handle) = self.worker.lock().expect("worker mutex poisoned").take() {
            let _ = handle.join();
        }
        *self.callbacks.content.lock().expect("callback mutex poisoned") = None;
        self.set_state(ConnectionState::Disconnected, "stop");
    }

    fn publish(&self, bytes: &[u8], persistence: Persistence) -> (bool, QueueLevel) {
        if self.connection_state() != ConnectionState::Connected {
            self.stats.record_send_failure();
            return (false, self.current_queue_level());
        }

        let (qos, retain) = match persistence {
            Persistence::BestEffort => (QoS::AtMostOnce, false),
            Persistence::Volatile => (QoS::AtLeastOnce, false),
            Persistence::Durable => (QoS::AtLeastOnce, true),
        };

        let topic = self.publish_topic();
        let client_slot = self.client.lock().expect("client mutex poisoned");
        let Some(client) = client_slot.as_ref() else {
            self.stats.record_send_failure();
            return (false, self.current_queue_level());
        };

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        notify_queue_status(&self.queue_level, &self.callbacks, self.current_queue_level());
        match client.publish(&topic, qos, retain, bytes) {
            Ok(()) => {
                self.stats.record_send(bytes.len(), now_ns());
                (true, self.current_queue_level())
            }
            Err(err) => {
                warn!(error = %err, topic, "mqtt publish failed");
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                self.stats.record_send_failure();
                notify_queue_status(&self.queue_level, &self.callbacks, self.current_queue_level());
                (false, self.current_queue_level())
            }
        }
    }

    fn on_content(&self, cb: ContentCallback) {
        *self.callbacks.content.lock().expect("callback mutex poisoned") = Some(cb);
    }

    fn on_connection_status(&self, cb: ConnectionStatusCallback) {
        *self.callbacks.connection_status.lock().expect("callback mutex poisoned") = Some(cb);
    }

    fn on_queue_status(&self, cb: QueueStatusCallback) {
        *self.callbacks.queue_status.lock().expect("callback mutex poisoned") = Some(cb);
    }

    fn content_id(&self) -> u32 {
        self.config.content_id
    }

    fn connection_state(&self) -> ConnectionState {
        state_from_u8(self.state.load(Ordering::SeqCst))
    }

    fn queue_full(&self) -> bool {
        self.current_queue_level() == QueueLevel::Full
    }

    fn healthy(&self) -> bool {
        self.client.lock().expect("client mutex poisoned").is_some() && self.connection_state() == ConnectionState::Connected
    }

    fn stats(&self) -> TransportStatsSnapshot {
        self.stats.snapshot()
    }
}

impl MqttBackendTransport {
    fn current_queue_level(&self) -> QueueLevel {
        queue_level_from_pending(self.in_flight.load(Ordering::SeqCst), self.queue_capacity)
    }
}

fn now_ns() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_status_fires_only_on_a_level_transition() {
        let flag = AtomicU8::new(queue_level_to_u8(QueueLevel::Low));
        let callbacks = Callbacks::default();
        let seen: Arc<Mutex<Vec<QueueLevel>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_for_cb = Arc::clone(&seen);
        *callbacks.queue_status.lock().unwrap() = Some(Box::new(move |level| {
            seen_for_cb.lock().unwrap().push(level);
        }));

        notify_queue_status(&flag, &callbacks, QueueLevel::Low);
        notify_queue_status(&flag, &callbacks, QueueLevel::Low);
        notify_queue_status(&flag, &callbacks, QueueLevel::High);
        notify_queue_status(&flag, &callbacks, QueueLevel::High);
        notify_queue_status(&flag, &callbacks, QueueLevel::Full);
        notify_queue_status(&flag, &callbacks, QueueLevel::Low);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![QueueLevel::High, QueueLevel::Full, QueueLevel::Low]
        );
    }

    #[test]
    fn pending_in_flight_ratio_maps_to_the_three_levels() {
        assert_eq!(queue_level_from_pending(0, 256), QueueLevel::Low);
        assert_eq!(queue_level_from_pending(179, 256), QueueLevel::Low);
        assert_eq!(queue_level_from_pending(180, 256), QueueLevel::High);
        assert_eq!(queue_level_from_pending(256, 256), QueueLevel::Full);
    }
}
