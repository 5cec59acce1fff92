//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to a kernel running on the gateway
///
/// Immutable once created: either parsed from the gateway's creation
/// response or built locally for a kernel the caller says already exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelHandle {
    name: String,
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_activity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    execution_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    connections: Option<u32>,
}

impl KernelHandle {
    /// Create a handle for a known kernel
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            last_activity: None,
            execution_state: None,
            connections: None,
        }
    }

    /// Kernel type, e.g. `python3`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gateway-assigned kernel identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Last activity timestamp as reported by the gateway
    pub fn last_activity(&self) -> Option<&str> {
        self.last_activity.as_deref()
    }

    /// Execution state as reported by the gateway
    pub fn execution_state(&self) -> Option<&str> {
        self.execution_state.as_deref()
    }

    /// Number of open channel connections as reported by the gateway
    pub fn connections(&self) -> Option<u32> {
        self.connections
    }
}

impl fmt::Display for KernelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.name)
    }
}

/// Lifecycle of a streaming channel
///
/// `Unopened -> Open -> Closed`; a closed channel never reopens.
///
/// `Unopened` names the phase before the handshake completes. A
/// `StreamingChannel` value only exists after that, so its `state()` is
/// always `Open` or `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelState {
    /// Handshake not yet completed
    Unopened,
    /// Connected and reading
    Open,
    /// Closed by the owner or by a read failure
    Closed,
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelState::Unopened => write!(f, "unopened"),
            ChannelState::Open => write!(f, "open"),
            ChannelState::Closed => write!(f, "closed"),
        }
    }
}
