//! kg-cli: Command-line interface for kernel gateways
//!
//! Provides the `kgw` binary for running code on a gateway kernel and
//! managing the gateway's kernels.

pub mod commands;
pub mod output;
