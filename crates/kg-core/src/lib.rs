//! kg-core: Core abstractions and configuration for the kernel gateway client
//!
//! This crate provides the error taxonomy, domain types, and configuration
//! structures shared by the client library and the `kgw` binary.

pub mod config;
pub mod error;
pub mod types;

pub use config::GatewayConfig;
pub use error::{ConfigError, GatewayError, Result};
pub use types::{ChannelState, KernelHandle};
