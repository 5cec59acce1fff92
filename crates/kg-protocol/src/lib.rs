//! kg-protocol: Wire format for the kernel messaging protocol
//!
//! This crate defines the JSON envelope exchanged with a kernel over the
//! gateway's `/api/kernels/{id}/channels` WebSocket, plus typed payloads for
//! the request and reply messages the client works with.

pub mod codec;
pub mod content;
pub mod error;
pub mod message;

pub use codec::{decode, encode, InboundMessage};
pub use content::MessageContent;
pub use error::ProtocolError;
pub use message::{Channel, MessageHeader, ProtocolMessage, PROTOCOL_VERSION};
