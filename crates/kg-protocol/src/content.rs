//! Typed message payloads
//!
//! Outbound requests implement [`MessageContent`], which ties each payload to
//! its `msg_type` and channel. Inbound payloads are plain `Deserialize` types
//! used with [`InboundMessage::content_as`](crate::codec::InboundMessage::content_as).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::message::Channel;

/// A payload that can be sent to the kernel
pub trait MessageContent: Serialize {
    /// Value of `header.msg_type` for this payload
    const MSG_TYPE: &'static str;
    /// Channel the request is sent on
    const CHANNEL: Channel;
}

/// Execute code in the kernel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    /// Source code to execute
    pub code: String,
    /// Run without broadcasting output or incrementing the execution counter
    pub silent: bool,
    /// Record the code in the kernel's history
    pub store_history: bool,
    /// Expressions to evaluate after execution
    pub user_expressions: Map<String, Value>,
    /// Whether the kernel may prompt for input on the stdin channel
    pub allow_stdin: bool,
    /// Abort queued requests if this one fails
    pub stop_on_error: bool,
}

impl ExecuteRequest {
    /// Execute `code` with the usual interactive defaults
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            silent: false,
            store_history: true,
            user_expressions: Map::new(),
            allow_stdin: false,
            stop_on_error: true,
        }
    }

    /// Execute silently
    pub fn silent(mut self) -> Self {
        self.silent = true;
        self.store_history = false;
        self
    }
}

impl MessageContent for ExecuteRequest {
    const MSG_TYPE: &'static str = "execute_request";
    const CHANNEL: Channel = Channel::Shell;
}

/// Ask the kernel to describe itself
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KernelInfoRequest {}

impl MessageContent for KernelInfoRequest {
    const MSG_TYPE: &'static str = "kernel_info_request";
    const CHANNEL: Channel = Channel::Shell;
}

/// Request completions at a cursor position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteRequest {
    pub code: String,
    pub cursor_pos: usize,
}

impl MessageContent for CompleteRequest {
    const MSG_TYPE: &'static str = "complete_request";
    const CHANNEL: Channel = Channel::Shell;
}

/// Request introspection of the object at a cursor position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectRequest {
    pub code: String,
    pub cursor_pos: usize,
    /// 0 for a summary, 1 for full detail
    pub detail_level: u8,
}

impl MessageContent for InspectRequest {
    const MSG_TYPE: &'static str = "inspect_request";
    const CHANNEL: Channel = Channel::Shell;
}

/// Ask whether a block of code is ready to execute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsCompleteRequest {
    pub code: String,
}

impl MessageContent for IsCompleteRequest {
    const MSG_TYPE: &'static str = "is_complete_request";
    const CHANNEL: Channel = Channel::Shell;
}

/// Interrupt the running execution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterruptRequest {}

impl MessageContent for InterruptRequest {
    const MSG_TYPE: &'static str = "interrupt_request";
    const CHANNEL: Channel = Channel::Control;
}

/// Shut the kernel down, optionally restarting it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShutdownRequest {
    pub restart: bool,
}

impl MessageContent for ShutdownRequest {
    const MSG_TYPE: &'static str = "shutdown_request";
    const CHANNEL: Channel = Channel::Control;
}

/// Answer an `input_request` from the kernel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputReply {
    pub value: String,
}

impl MessageContent for InputReply {
    const MSG_TYPE: &'static str = "input_reply";
    const CHANNEL: Channel = Channel::Stdin;
}

/// Outcome reported in every `*_reply`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    Ok,
    Error,
    Aborted,
}

/// Reply to an [`ExecuteRequest`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteReply {
    pub status: ReplyStatus,
    #[serde(default)]
    pub execution_count: Option<u64>,
    #[serde(default)]
    pub ename: Option<String>,
    #[serde(default)]
    pub evalue: Option<String>,
    #[serde(default)]
    pub traceback: Vec<String>,
}

/// Language description inside a kernel info reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageInfo {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub file_extension: Option<String>,
}

/// Reply to a [`KernelInfoRequest`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelInfoReply {
    pub status: ReplyStatus,
    pub protocol_version: String,
    #[serde(default)]
    pub implementation: String,
    #[serde(default)]
    pub implementation_version: String,
    pub language_info: LanguageInfo,
    #[serde(default)]
    pub banner: String,
}

/// Kernel execution state broadcast on iopub
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionState {
    Starting,
    Busy,
    Idle,
    #[serde(other)]
    Unknown,
}

/// Content of an iopub `status` message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub execution_state: ExecutionState,
}

/// Content of an iopub `stream` message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stream {
    /// `stdout` or `stderr`
    pub name: String,
    pub text: String,
}

/// Content of an iopub `error` message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorContent {
    pub ename: String,
    pub evalue: String,
    #[serde(default)]
    pub traceback: Vec<String>,
}
