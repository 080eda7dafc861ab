//! Bridge B's pluggable real-time transport: the boundary between the
//! fabric-facing bridge and whatever protocol the RT controller actually
//! speaks (logging stub, loopback simulator, or UDP).

use std::net::{Ipv4Addr, UdpSocket};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{info, trace, warn};
use vep_core::{VepError, VepResult};

use crate::value::ActuatorValue;

pub type ActualValueCallback = Box<dyn Fn(&str, ActuatorValue) + Send + Sync>;

/// Sends actuator target requests to the RT controller and delivers actual
/// values it reports back. RT is the source of truth for actuation; this
/// trait only moves bytes/values across the boundary.
pub trait RtTransport: Send + Sync {
    fn initialize(&self) -> VepResult<()>;
    fn shutdown(&self);
    /// `true` if the send was handed off successfully -- not an
    /// acknowledgement that RT accepted the command.
    fn send_actuator_target(&self, path: &str, target_value: &ActuatorValue) -> bool;
    fn on_actual_value(&self, callback: ActualValueCallback);
}

fn value_to_string(value: &ActuatorValue) -> String {
    match value {
        ActuatorValue::Bool(b) => b.to_string(),
        ActuatorValue::Int64(v) => v.to_string(),
        ActuatorValue::UInt64(v) => v.to_string(),
        ActuatorValue::Double(v) => v.to_string(),
        ActuatorValue::String(s) => s.clone(),
    }
}

/// Stub that only logs; use when no RT controller is reachable.
#[derive(Default)]
pub struct LoggingRtTransport {
    callback: Mutex<Option<ActualValueCallback>>,
}

impl LoggingRtTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drives `on_actual_value`'s callback directly, for tests that want to
    /// exercise the bridge without a real RT controller.
    pub fn simulate_actual_value(&self, path: &str, value: ActuatorValue) {
        if let Some(cb) = self.callback.lock().expect("callback mutex poisoned").as_ref() {
            cb(path, value);
        }
    }
}

impl RtTransport for LoggingRtTransport {
    fn initialize(&self) -> VepResult<()> {
        Ok(())
    }

    fn shutdown(&self) {}

    fn send_actuator_target(&self, path: &str, target_value: &ActuatorValue) -> bool {
        info!(path, value = %value_to_string(target_value), "logging RT transport: actuator target");
        true
    }

    fn on_actual_value(&self, callback: ActualValueCallback) {
        *self.callback.lock().expect("callback mutex poisoned") = Some(callback);
    }
}

/// Echoes every target straight back as the actual, after `delay`. Useful to
/// simulate a working RT controller without real hardware.
pub struct LoopbackRtTransport {
    delay: Duration,
    callback: Arc<Mutex<Option<ActualValueCallback>>>,
    running: Arc<AtomicBool>,
}

impl LoopbackRtTransport {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            callback: Arc::new(Mutex::new(None)),
            running: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl RtTransport for LoopbackRtTransport {
    fn initialize(&self) -> VepResult<()> {
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn send_actuator_target(&self, path: &str, target_value: &ActuatorValue) -> bool {
        let path = path.to_string();
        let value = target_value.clone();
        let delay = self.delay;
        let callback = Arc::clone(&self.callback);
        let running = Arc::clone(&self.running);
        std::thread::spawn(move || {
            std::thread::sleep(delay);
            if !running.load(Ordering::SeqCst) {
                return;
            }
            if let Some(cb) = callback.lock().expect("callback mutex poisoned").as_ref() {
                cb(&path, value);
            }
        });
        true
    }

    fn on_actual_value(&self, callback: ActualValueCallback) {
        *self.callback.lock().expect("callback mutex poisoned") = Some(callback);
    }
}

/// Sends `PATH|VALUE|TIMESTAMP_NS` lines to a UDP endpoint (unicast or
/// multicast, auto-detected from the target address), optionally listening
/// for the same line format to deliver actuals.
pub struct UdpRtTransport {
    target_host: String,
    target_port: u16,
    listen_port: u16,
    multicast_interface: String,
    send_socket: UdpSocket,
    callback: Arc<Mutex<Option<ActualValueCallback>>>,
    running: Arc<AtomicBool>,
    recv_thread: Mutex<Option<JoinHandle<()>>>,
}

impl UdpRtTransport {
    pub fn new(
        target_host: impl Into<String>,
        target_port: u16,
        listen_port: u16,
        multicast_interface: impl Into<String>,
    ) -> VepResult<Self> {
        let send_socket = UdpSocket::bind("0.0.0.0:0")
            .map_err(|e| VepError::InvalidConfig(format!("failed to bind UDP send socket: {e}")))?;
        Ok(Self {
            target_host: target_host.into(),
            target_port,
            listen_port,
            multicast_interface: multicast_interface.into(),
            send_socket,
            callback: Arc::new(Mutex::new(None)),
            running: Arc::new(AtomicBool::new(false)),
            recv_thread: Mutex::new(None),
        })
    }

    fn is_multicast(&self) -> bool {
        Ipv4Addr::from_str(&self.target_host)
            .map(|addr| addr.is_multicast())
            .unwrap_or(false)
    }

    fn recv_loop(listen_port: u16, callback: Arc<Mutex<Option<ActualValueCallback>>>, running: Arc<AtomicBool>) {
        let socket = match UdpSocket::bind(("0.0.0.0", listen_port)) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, listen_port, "UDP RT transport failed to bind receive socket");
                return;
            }
        };
        if let Err(e) = socket.set_read_timeout(Some(Duration::from_millis(200))) {
            warn!(error = %e, "failed to set UDP receive timeout");
        }

        let mut buf = [0u8; 1024];
        while running.load(Ordering::SeqCst) {
            match socket.recv_from(&mut buf) {
                Ok((n, _addr)) => {
                    if let Some((path, value)) = parse_line(&buf[..n]) {
                        if let Some(cb) = callback.lock().expect("callback mutex poisoned").as_ref() {
                            cb(&path, value);
                        }
                    }
                }
                Err(e) if matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut) => continue,
                Err(e) => {
                    warn!(error = %e, "UDP RT transport receive error");
                }
            }
        }
    }
}

fn parse_line(bytes: &[u8]) -> Option<(String, ActuatorValue)> {
    let line = std::str::from_utf8(bytes).ok()?;
    let mut parts = line.splitn(3, '|');
    let path = parts.next()?.to_string();
    let value = parts.next()?;
    let _timestamp_ns = parts.next()?;
    Some((path, ActuatorValue::Double(value.parse::<f64>().ok()?)))
}

impl RtTransport for UdpRtTransport {
    fn initialize(&self) -> VepResult<()> {
        if self.is_multicast() && !self.multicast_interface.is_empty() {
            warn!(
                interface = %self.multicast_interface,
                "multicast outgoing interface selection is not supported; using the default route"
            );
        }

        if self.listen_port != 0 {
            self.running.store(true, Ordering::SeqCst);
            let callback = Arc::clone(&self.callback);
            let running = Arc::clone(&self.running);
            let listen_port = self.listen_port;
            let handle = std::thread::spawn(move || Self::recv_loop(listen_port, callback, running));
            *self.recv_thread.lock().expect("recv thread mutex poisoned") = Some(handle);
        }
        Ok(())
    }

    fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.recv_thread.lock().expect("recv thread mutex poisoned").take() {
            let _ = handle.join();
        }
    }

    fn send_actuator_target(&self, path: &str, target_value: &ActuatorValue) -> bool {
        let timestamp_ns = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let line = format!("{path}|{}|{timestamp_ns}", value_to_string(target_value));
        match self.send_socket.send_to(line.as_bytes(), (self.target_host.as_str(), self.target_port)) {
            Ok(_) => {
                trace!(path, "UDP RT transport sent actuator target");
                true
            }
            Err(e) => {
                warn!(error = %e, path, "UDP RT transport send failed");
                false
            }
        }
    }

    fn on_actual_value(&self, callback: ActualValueCallback) {
        *self.callback.lock().expect("callback mutex poisoned") = Some(callback);
    }
}

/// Configuration shared by every RT transport variant Bridge B can create.
#[derive(Debug, Clone)]
pub struct RtTransportConfig {
    pub rt_transport_type: String,
    pub loopback_delay_ms: u64,
    pub udp_target_host: String,
    pub udp_target_port: u16,
    pub udp_listen_port: u16,
    pub udp_multicast_interface: String,
}

/// Picks an `RtTransport` implementation by `config.rt_transport_type`:
/// `"logging"`, `"loopback"`, or `"udp"`.
pub fn create_rt_transport(config: &RtTransportConfig) -> VepResult<Box<dyn RtTransport>> {
    match config.rt_transport_type.as_str() {
        "logging" => Ok(Box::new(LoggingRtTransport::new())),
        "loopback" => Ok(Box::new(LoopbackRtTransport::new(Duration::from_millis(config.loopback_delay_ms)))),
        "udp" => Ok(Box::new(UdpRtTransport::new(
            config.udp_target_host.clone(),
            config.udp_target_port,
            config.udp_listen_port,
            config.udp_multicast_interface.clone(),
        )?)),
        other => Err(VepError::InvalidConfig(format!("unknown RT transport type '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn loopback_echoes_the_target_as_the_actual() {
        let transport = LoopbackRtTransport::new(Duration::from_millis(10));
        transport.initialize().unwrap();
        let (tx, rx) = mpsc::channel();
        transport.on_actual_value(Box::new(move |path, value| {
            tx.send((path.to_string(), value)).unwrap();
        }));

        transport.send_actuator_target("Vehicle.Cabin.Light.Intensity", &ActuatorValue::Double(50.0));
        let (path, value) = rx.recv_timeout(Duration::from_millis(500)).unwrap();
        assert_eq!(path, "Vehicle.Cabin.Light.Intensity");
        assert_eq!(value, ActuatorValue::Double(50.0));
    }

    #[test]
    fn logging_transport_simulate_drives_the_registered_callback() {
        let transport = LoggingRtTransport::new();
        let (tx, rx) = mpsc::channel();
        transport.on_actual_value(Box::new(move |path, value| {
            tx.send((path.to_string(), value)).unwrap();
        }));
        transport.simulate_actual_value("Vehicle.Doors.Lock", ActuatorValue::Bool(true));
        let (path, value) = rx.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(path, "Vehicle.Doors.Lock");
        assert_eq!(value, ActuatorValue::Bool(true));
    }

    #[test]
    fn unknown_transport_type_is_a_configuration_error() {
        let config = RtTransportConfig {
            rt_transport_type: "avtp".into(),
            loopback_delay_ms: 0,
            udp_target_host: String::new(),
            udp_target_port: 0,
            udp_listen_port: 0,
            udp_multicast_interface: String::new(),
        };
        assert!(create_rt_transport(&config).is_err());
    }

    #[test]
    fn multicast_address_is_detected_from_the_target_host() {
        let transport = UdpRtTransport::new("239.1.1.1", 9000, 0, "").unwrap();
        assert!(transport.is_multicast());
        let transport = UdpRtTransport::new("192.168.0.10", 9000, 0, "").unwrap();
        assert!(!transport.is_multicast());
    }
}
