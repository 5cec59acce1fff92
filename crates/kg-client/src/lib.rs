//! kg-client: Client for Jupyter-style kernel gateways
//!
//! A [`Session`] provisions (or adopts) a kernel over the gateway's REST API,
//! opens the kernel's channels WebSocket, and exchanges protocol messages over
//! it. The pieces are usable on their own:
//!
//! - [`HttpTransport`]: JSON-over-HTTP against the gateway REST surface
//! - [`KernelProvisioner`]: create, adopt, list and delete kernels
//! - [`StreamingChannel`]: the WebSocket with its reader task
//!
//! Every network-issuing call takes a [`CancellationToken`]; nothing is
//! retried and no timeout is imposed beyond what the caller configures.

pub mod channel;
pub mod http;
pub mod kernel;
pub mod session;

pub use channel::{ChannelOptions, StreamingChannel};
pub use http::HttpTransport;
pub use kernel::KernelProvisioner;
pub use session::Session;

pub use kg_core::{ChannelState, GatewayConfig, GatewayError, KernelHandle, Result};
pub use kg_protocol::{Channel, InboundMessage, MessageHeader, ProtocolMessage};
pub use tokio_util::sync::CancellationToken;
