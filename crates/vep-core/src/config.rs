//! Declaratively validated configuration, loaded via the `config` crate's
//! layered file/env sources and checked with `validator` before any
//! component starts.

use serde::Deserialize;
use validator::Validate;

fn default_broker_port() -> u16 {
    1883
}

fn default_qos() -> u8 {
    1
}

fn default_keepalive_sec() -> u64 {
    60
}

fn default_v2c_prefix() -> String {
    "v2c".to_string()
}

fn default_c2v_prefix() -> String {
    "c2v".to_string()
}

fn default_batch_max_items() -> usize {
    100
}

fn default_batch_max_bytes() -> usize {
    65536
}

fn default_batch_timeout_ms() -> u64 {
    1000
}

fn default_compression_type() -> String {
    "zstd".to_string()
}

fn default_compression_level() -> i32 {
    3
}

fn default_rt_transport_type() -> String {
    "logging".to_string()
}

fn default_loopback_delay_ms() -> u64 {
    0
}

fn default_ready_timeout_seconds() -> u64 {
    10
}

/// Transport endpoint and bidirectional topic parameters.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TransportConfig {
    #[validate(length(min = 1))]
    pub broker_host: String,
    #[serde(default = "default_broker_port")]
    pub broker_port: u16,
    #[validate(length(min = 1))]
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default = "default_qos")]
    #[validate(range(min = 0, max = 2))]
    pub qos: u8,
    #[serde(default = "default_keepalive_sec")]
    pub keepalive_sec: u64,
    #[validate(length(min = 1))]
    pub vehicle_id: String,
    pub content_id: u32,
    #[serde(default = "default_v2c_prefix")]
    pub v2c_prefix: String,
    #[serde(default = "default_c2v_prefix")]
    pub c2v_prefix: String,
    #[serde(default = "default_ready_timeout_seconds")]
    pub ready_timeout_seconds: u64,
}

/// Batch flush triggers and compressor selection.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PipelineConfig {
    #[serde(default = "default_batch_max_items")]
    #[validate(range(min = 1))]
    pub batch_max_items: usize,
    #[serde(default = "default_batch_max_bytes")]
    #[validate(range(min = 1))]
    pub batch_max_bytes: usize,
    #[serde(default = "default_batch_timeout_ms")]
    pub batch_timeout_ms: u64,
    #[serde(default = "default_compression_type")]
    pub compression_type: String,
    #[serde(default = "default_compression_level")]
    #[validate(range(min = 1, max = 19))]
    pub compression_level: i32,
    #[validate(length(min = 1))]
    pub source_id: String,
}

/// Fabric topic overrides and schema-discovery path prefix for the bridges.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FabricConfig {
    pub dds_signals_topic: Option<String>,
    pub dds_actuator_target_topic: Option<String>,
    pub dds_actuator_actual_topic: Option<String>,
    pub signal_pattern: Option<String>,
}

/// RT controller transport variant selection and its variant-specific
/// parameters.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RtTransportConfig {
    #[serde(default = "default_rt_transport_type")]
    pub rt_transport_type: String,
    #[serde(default = "default_loopback_delay_ms")]
    pub loopback_delay_ms: u64,
    pub udp_target_host: Option<String>,
    pub udp_target_port: Option<u16>,
    pub udp_listen_port: Option<u16>,
    pub udp_multicast_interface: Option<String>,
}

/// Top-level configuration bundle assembled by every binary from layered
/// file/env/CLI sources, validated once at startup before any component
/// is constructed.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VepConfig {
    #[validate]
    pub transport: TransportConfig,
    #[validate]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    #[validate]
    pub fabric: FabricConfig,
    #[serde(default)]
    #[validate]
    pub rt_transport: RtTransportConfig,
}

impl Default for FabricConfig {
    fn default() -> Self {
        Self {
            dds_signals_topic: None,
            dds_actuator_target_topic: None,
            dds_actuator_actual_topic: None,
            signal_pattern: None,
        }
    }
}

impl Default for RtTransportConfig {
    fn default() -> Self {
        Self {
            rt_transport_type: default_rt_transport_type(),
            loopback_delay_ms: default_loopback_delay_ms(),
            udp_target_host: None,
            udp_target_port: None,
            udp_listen_port: None,
            udp_multicast_interface: None,
        }
    }
}

impl VepConfig {
    /// Loads configuration from a base file, an optional environment-named
    /// override file, and `VEP_`-prefixed environment variables, in that
    /// order of increasing precedence, then validates the result.
    pub fn load(config_path: &str) -> Result<Self, crate::error::VepError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("VEP").separator("__"))
            .build()
            .map_err(|e| crate::error::VepError::InvalidConfig(e.to_string()))?;

        let cfg: VepConfig = settings
            .try_deserialize()
            .map_err(|e| crate::error::VepError::InvalidConfig(e.to_string()))?;

        cfg.validate()
            .map_err(|e| crate::error::VepError::InvalidConfig(e.to_string()))?;

        Ok(cfg)
    }
}
