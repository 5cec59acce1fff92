//! CLI command implementations

mod exec;
mod kernels;

pub use exec::{exec_command, ExecOptions};
pub use kernels::{delete_command, list_command};
