//! Streaming channel to a kernel
//!
//! - `connection`: WebSocket lifecycle, writes and the reader task
//! - `dispatch`: routing inbound frames to waiting requests or the queue

mod connection;
mod dispatch;

pub use connection::{channels_url, ChannelOptions, StreamingChannel};
