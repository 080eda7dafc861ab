use vep_core::{ConnectionState, Persistence};
use vep_transport::{BackendTransport, MqttBackendTransport, MqttTransportConfig};

fn config(publish_prefix: &str, subscribe_prefix: &str) -> MqttTransportConfig {
    MqttTransportConfig {
        broker_host: "127.0.0.1".into(),
        broker_port: 1883,
        client_id: "test-client".into(),
        username: None,
        password: None,
        keepalive_sec: 30,
        vehicle_id: "vin-7".into(),
        content_id: 42,
        publish_prefix: publish_prefix.into(),
        subscribe_prefix: subscribe_prefix.into(),
    }
}

#[test]
fn instance_stays_bound_to_one_content_id_and_starts_disconnected() {
    let transport = MqttBackendTransport::new(config("v2c", "c2v"));
    assert_eq!(transport.content_id(), 42);
    assert_eq!(transport.connection_state(), ConnectionState::Disconnected);
    assert!(!transport.healthy());
}

#[test]
fn publish_while_disconnected_fails_fast_without_touching_the_network() {
    let transport = MqttBackendTransport::new(config("v2c", "c2v"));
    let (ok, _level) = transport.publish(b"payload", Persistence::BestEffort);
    assert!(!ok);
    assert_eq!(transport.stats().messages_failed, 1);
}
