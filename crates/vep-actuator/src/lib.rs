//! The actuator round-trip channel: Bridge A (broker <-> fabric), Bridge B
//! (fabric <-> RT controller), and the CAN bit-packing encoder RT-side
//! transports use to turn a VSS actuator write into raw frame bytes.

mod bridge_a;
mod bridge_b;
mod broker;
mod can;
mod fabric;
mod rt_transport;
mod value;

pub use bridge_a::{BridgeA, BridgeAConfig, BridgeAStats};
pub use bridge_b::{BridgeB, BridgeBConfig, BridgeBStats};
pub use broker::{ActuatorTargetHandler, BrokerClient, BrokerSchema, DiscoveredPath, InMemoryBroker};
pub use can::{CanFrameEncoder, CanSignalMapping, CanTransmitter, LoggingCanTransmitter};
pub use fabric::{decode_message, encode_message, FabricBus, FabricReader, InMemoryFabricBus};
pub use rt_transport::{
    create_rt_transport, ActualValueCallback, LoggingRtTransport, LoopbackRtTransport, RtTransport, RtTransportConfig,
    UdpRtTransport,
};
pub use value::ActuatorValue;
