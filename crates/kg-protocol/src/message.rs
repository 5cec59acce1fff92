//! Message envelope for the kernel messaging protocol
//!
//! Every frame on the channels WebSocket is one JSON document with six
//! top-level fields:
//!
//! ```text
//! {
//!   "header":        { "username", "version", "session", "msg_id", "msg_type" },
//!   "parent_header": { ...header of the request being answered... } | {},
//!   "channel":       "shell" | "iopub" | "stdin" | "control" | "hb",
//!   "content":       { ...shape depends on msg_type... },
//!   "metadata":      { },
//!   "buffers":       [ "<base64>", ... ]
//! }
//! ```
//!
//! Replies are correlated to requests through `parent_header.msg_id`, so every
//! outbound header carries a freshly generated `msg_id`.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

use crate::content::MessageContent;
use crate::error::ProtocolError;

/// Messaging protocol version sent in every outbound header.
///
/// The gateway rejects sessions whose version it does not understand.
pub const PROTOCOL_VERSION: &str = "5.0";

/// Logical channel a message travels on within the single WebSocket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Request/reply exchanges (execute, complete, inspect, ...)
    Shell,
    /// Broadcast side effects (status, stream output, results)
    #[serde(rename = "iopub")]
    IoPub,
    /// Input requests from the kernel to the client
    Stdin,
    /// Out-of-band requests (interrupt, shutdown)
    Control,
    /// Heartbeat
    #[serde(rename = "hb")]
    Heartbeat,
}

impl Channel {
    /// Wire name of the channel
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Shell => "shell",
            Channel::IoPub => "iopub",
            Channel::Stdin => "stdin",
            Channel::Control => "control",
            Channel::Heartbeat => "hb",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHeader {
    /// User the message is sent on behalf of
    #[serde(default)]
    pub username: String,
    /// Protocol version (see [`PROTOCOL_VERSION`])
    #[serde(default)]
    pub version: String,
    /// Client session identifier
    #[serde(default)]
    pub session: String,
    /// Unique identifier of this message
    pub msg_id: String,
    /// Message type, which selects the shape of `content`
    pub msg_type: String,
}

impl MessageHeader {
    /// Create a header with a freshly generated `msg_id`
    pub fn new(
        msg_type: impl Into<String>,
        session: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            version: PROTOCOL_VERSION.to_string(),
            session: session.into(),
            msg_id: new_msg_id(),
            msg_type: msg_type.into(),
        }
    }

    /// Override the protocol version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }
}

/// Generate a new unique message identifier
pub fn new_msg_id() -> String {
    Uuid::new_v4().to_string()
}

/// One protocol message, outbound or inbound
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolMessage {
    /// Header of this message
    pub header: MessageHeader,
    /// Header of the message this one answers; encoded as `{}` when absent
    #[serde(default, with = "parent_header")]
    pub parent_header: Option<MessageHeader>,
    /// Logical channel
    pub channel: Channel,
    /// Type-specific payload
    #[serde(default)]
    pub content: Value,
    /// Free-form metadata
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Binary attachments
    #[serde(default, with = "buffers")]
    pub buffers: Vec<Bytes>,
}

impl ProtocolMessage {
    /// Create a message with empty parent header, metadata and buffers
    pub fn new(header: MessageHeader, channel: Channel, content: Value) -> Self {
        Self {
            header,
            parent_header: None,
            channel,
            content,
            metadata: Map::new(),
            buffers: Vec::new(),
        }
    }

    /// Create a message from a typed payload.
    ///
    /// The header's `msg_type` and the channel come from the payload type.
    pub fn from_content<C: MessageContent>(
        content: &C,
        session: &str,
        username: &str,
    ) -> Result<Self, ProtocolError> {
        let value = serde_json::to_value(content).map_err(ProtocolError::Encoding)?;
        let header = MessageHeader::new(C::MSG_TYPE, session, username);
        Ok(Self::new(header, C::CHANNEL, value))
    }

    /// Set the parent header
    pub fn with_parent(mut self, parent: MessageHeader) -> Self {
        self.parent_header = Some(parent);
        self
    }

    /// Set the metadata
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Append a binary buffer
    pub fn with_buffer(mut self, buffer: impl Into<Bytes>) -> Self {
        self.buffers.push(buffer.into());
        self
    }

    /// Identifier of this message
    pub fn msg_id(&self) -> &str {
        &self.header.msg_id
    }

    /// Type of this message
    pub fn msg_type(&self) -> &str {
        &self.header.msg_type
    }
}

/// `parent_header` is either a full header or the empty object `{}`
pub(crate) mod parent_header {
    use serde::de::Error as _;
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::Value;

    use super::MessageHeader;

    pub fn serialize<S>(parent: &Option<MessageHeader>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match parent {
            Some(header) => header.serialize(serializer),
            None => serializer.serialize_map(Some(0))?.end(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<MessageHeader>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(map)) if map.is_empty() => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(D::Error::custom),
        }
    }
}

/// Buffers travel as base64 strings inside the JSON document
pub(crate) mod buffers {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
    use bytes::Bytes;
    use serde::de::Error as _;
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(buffers: &[Bytes], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(buffers.len()))?;
        for buffer in buffers {
            seq.serialize_element(&BASE64.encode(buffer))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Bytes>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default();
        encoded
            .iter()
            .map(|s| BASE64.decode(s).map(Bytes::from).map_err(D::Error::custom))
            .collect()
    }
}
