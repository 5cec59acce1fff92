//! Gateway client configuration

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::serde_utils::option_duration_secs;
use crate::error::{ConfigError, GatewayError};

/// REST base address of a gateway on the local machine
pub const DEFAULT_API_URL: &str = "http://localhost:8888";

/// Streaming base address of a gateway on the local machine
pub const DEFAULT_WS_URL: &str = "ws://localhost:8888";

/// Kernel type requested when creating a kernel
pub const DEFAULT_KERNEL_NAME: &str = "python3";

/// Capacity of the inbound message queue.
///
/// Messages that arrive while the queue is full are dropped with a warning.
/// Replies to pending requests bypass the queue and are never dropped.
const DEFAULT_INBOUND_CAPACITY: usize = 256;

/// Configuration for one gateway session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base address of the REST API (`http://` or `https://`)
    pub api_url: String,

    /// Base address of the channels WebSocket (`ws://` or `wss://`)
    pub ws_url: String,

    /// Kernel type to create, and to report for an adopted kernel
    pub kernel_name: String,

    /// Attach to this kernel instead of creating one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kernel_id: Option<String>,

    /// Username stamped into outbound message headers
    pub username: String,

    /// Messaging protocol version stamped into outbound message headers
    pub protocol_version: String,

    /// Gateway auth token, sent as `Authorization: token <value>`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    /// Capacity of the inbound message queue
    pub inbound_capacity: usize,

    /// Per-request timeout for REST calls
    #[serde(
        with = "option_duration_secs",
        skip_serializing_if = "Option::is_none"
    )]
    pub request_timeout: Option<Duration>,

    /// Delete a kernel this session created if the channel fails to open
    pub cleanup_on_failure: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
            kernel_name: DEFAULT_KERNEL_NAME.to_string(),
            kernel_id: None,
            username: whoami::username(),
            protocol_version: kg_protocol::PROTOCOL_VERSION.to_string(),
            auth_token: None,
            inbound_capacity: DEFAULT_INBOUND_CAPACITY,
            request_timeout: None,
            cleanup_on_failure: true,
        }
    }
}

impl GatewayConfig {
    /// Configuration for a gateway at the given REST and streaming bases
    pub fn new(api_url: impl Into<String>, ws_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ws_url: ws_url.into(),
            ..Self::default()
        }
    }

    /// Parsed REST base address
    pub fn api_base(&self) -> Result<Url, GatewayError> {
        parse_base(&self.api_url, &["http", "https"])
    }

    /// Parsed streaming base address
    pub fn ws_base(&self) -> Result<Url, GatewayError> {
        parse_base(&self.ws_url, &["ws", "wss"])
    }

    /// The kernel to adopt, treating an empty id as absent
    pub fn existing_kernel_id(&self) -> Option<&str> {
        self.kernel_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Check that the configuration can be used to open a session
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api_base()
            .map_err(|e| ConfigError::Invalid(format!("api_url: {}", e)))?;
        self.ws_base()
            .map_err(|e| ConfigError::Invalid(format!("ws_url: {}", e)))?;

        if self.kernel_name.is_empty() {
            return Err(ConfigError::Invalid("kernel_name must not be empty".into()));
        }
        if self.inbound_capacity == 0 {
            return Err(ConfigError::Invalid(
                "inbound_capacity must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

fn parse_base(raw: &str, schemes: &[&str]) -> Result<Url, GatewayError> {
    let url = Url::parse(raw).map_err(|e| GatewayError::Address(format!("{}: {}", raw, e)))?;
    if !schemes.contains(&url.scheme()) {
        return Err(GatewayError::Address(format!(
            "{}: expected scheme {}",
            raw,
            schemes.join(" or ")
        )));
    }
    if url.cannot_be_a_base() {
        return Err(GatewayError::Address(format!("{}: not a base address", raw)));
    }
    Ok(url)
}
