//! JSON codec for channel frames
//!
//! Outbound messages are encoded in full. Inbound frames are only decoded as
//! far as the envelope needed for routing and correlation; content, metadata
//! and buffers stay opaque until a caller asks for a typed view.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ProtocolError;
use crate::message::{parent_header, Channel, MessageHeader, ProtocolMessage};

/// Encode a message as a JSON text frame
pub fn encode(message: &ProtocolMessage) -> Result<String, ProtocolError> {
    serde_json::to_string(message).map_err(ProtocolError::Encoding)
}

/// Decode the envelope of an inbound JSON frame
pub fn decode(frame: &str) -> Result<InboundMessage, ProtocolError> {
    let envelope: Envelope = serde_json::from_str(frame).map_err(ProtocolError::Decoding)?;
    Ok(InboundMessage {
        header: envelope.header,
        parent_header: envelope.parent_header,
        channel: envelope.channel,
        content: envelope.content,
        metadata: envelope.metadata,
        buffers: envelope.buffers,
        raw: frame.to_string(),
    })
}

#[derive(Deserialize)]
struct Envelope {
    header: MessageHeader,
    #[serde(default, with = "parent_header")]
    parent_header: Option<MessageHeader>,
    channel: Channel,
    #[serde(default)]
    content: Value,
    #[serde(default)]
    metadata: Value,
    #[serde(default)]
    buffers: Value,
}

/// A frame received from the kernel
///
/// The envelope is decoded; everything else is kept as received.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    header: MessageHeader,
    parent_header: Option<MessageHeader>,
    channel: Channel,
    content: Value,
    metadata: Value,
    buffers: Value,
    raw: String,
}

impl InboundMessage {
    /// Identifier of this message
    pub fn msg_id(&self) -> &str {
        &self.header.msg_id
    }

    /// Type of this message
    pub fn msg_type(&self) -> &str {
        &self.header.msg_type
    }

    /// Identifier of the request this message answers, if any
    pub fn parent_msg_id(&self) -> Option<&str> {
        self.parent_header.as_ref().map(|h| h.msg_id.as_str())
    }

    /// Whether this message was produced in response to `msg_id`
    pub fn is_child_of(&self, msg_id: &str) -> bool {
        self.parent_msg_id() == Some(msg_id)
    }

    /// Whether this is a `*_reply` message
    pub fn is_reply(&self) -> bool {
        self.header.msg_type.ends_with("_reply")
    }

    /// Channel the message arrived on
    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn header(&self) -> &MessageHeader {
        &self.header
    }

    pub fn parent_header(&self) -> Option<&MessageHeader> {
        self.parent_header.as_ref()
    }

    /// Uninterpreted content payload
    pub fn content(&self) -> &Value {
        &self.content
    }

    pub fn metadata(&self) -> &Value {
        &self.metadata
    }

    pub fn buffers(&self) -> &Value {
        &self.buffers
    }

    /// The frame exactly as received
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Interpret the content as a typed payload
    pub fn content_as<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        serde_json::from_value(self.content.clone()).map_err(|source| {
            ProtocolError::ContentMismatch {
                msg_type: self.header.msg_type.clone(),
                source,
            }
        })
    }
}
