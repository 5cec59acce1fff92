//! Gateway session: one kernel and its open channel

use reqwest::Url;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use kg_core::{ChannelState, GatewayConfig, KernelHandle, Result};
use kg_protocol::content::{ExecuteRequest, KernelInfoReply, KernelInfoRequest};
use kg_protocol::{InboundMessage, MessageContent, ProtocolMessage};

use crate::channel::{ChannelOptions, StreamingChannel};
use crate::http::HttpTransport;
use crate::kernel::KernelProvisioner;

/// Upper bound on deleting a kernel after a failed connect
const CLEANUP_TIMEOUT: Duration = Duration::from_secs(5);

/// A live session with one kernel
///
/// Owns the HTTP transport and the streaming channel. The channel is closed
/// when the session is shut down or dropped, or when the reader task fails.
pub struct Session {
    config: GatewayConfig,
    transport: HttpTransport,
    ws_base: Url,
    kernel: KernelHandle,
    created_kernel: bool,
    channel: StreamingChannel,
    inbound: Option<mpsc::Receiver<InboundMessage>>,
    session_id: String,
}

impl Session {
    /// Acquire a kernel and open its channel.
    ///
    /// Returns as soon as the channel handshake completes. On failure the
    /// first error is returned unchanged; a kernel created by this call is
    /// deleted again when `cleanup_on_failure` is set.
    pub async fn connect(config: GatewayConfig, cancel: &CancellationToken) -> Result<Self> {
        let transport = HttpTransport::from_config(&config)?;
        let ws_base = config.ws_base()?;

        let provisioner = KernelProvisioner::new(&transport, &config.kernel_name);
        let existing_id = config.existing_kernel_id();
        let kernel = provisioner.acquire(existing_id, cancel).await?;
        let created_kernel = existing_id.is_none();

        let options = ChannelOptions::from_config(&config);
        let (channel, inbound) =
            match StreamingChannel::open(&ws_base, &kernel, &options, cancel).await {
                Ok(opened) => opened,
                Err(err) => {
                    if created_kernel && config.cleanup_on_failure {
                        release_kernel(&provisioner, &kernel).await;
                    }
                    return Err(err);
                }
            };

        let session_id = Uuid::new_v4().to_string();
        tracing::info!(kernel = %kernel, session_id = %session_id, "Session connected");

        Ok(Self {
            config,
            transport,
            ws_base,
            kernel,
            created_kernel,
            channel,
            inbound: Some(inbound),
            session_id,
        })
    }

    pub fn kernel(&self) -> &KernelHandle {
        &self.kernel
    }

    /// Whether this session created its kernel rather than adopting one
    pub fn created_kernel(&self) -> bool {
        self.created_kernel
    }

    /// Value of `header.session` on every message this session builds
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn api_base(&self) -> &Url {
        self.transport.base()
    }

    pub fn ws_base(&self) -> &Url {
        &self.ws_base
    }

    pub fn channel(&self) -> &StreamingChannel {
        &self.channel
    }

    /// REST operations against this session's gateway
    pub fn provisioner(&self) -> KernelProvisioner<'_> {
        KernelProvisioner::new(&self.transport, &self.config.kernel_name)
    }

    /// Build a message carrying `content`, with a fresh `msg_id`
    pub fn message<C: MessageContent>(&self, content: &C) -> Result<ProtocolMessage> {
        let mut message =
            ProtocolMessage::from_content(content, &self.session_id, &self.config.username)?;
        message.header.version = self.config.protocol_version.clone();
        Ok(message)
    }

    pub async fn send(&self, message: &ProtocolMessage) -> Result<()> {
        self.channel.send(message).await
    }

    /// Send an `execute_request` for `code` and return its `msg_id`.
    ///
    /// Output and the reply arrive on the inbound queue.
    pub async fn execute(&self, code: &str) -> Result<String> {
        let message = self.message(&ExecuteRequest::new(code))?;
        self.send(&message).await?;
        Ok(message.header.msg_id)
    }

    /// Send `message` and wait for its reply
    pub async fn request(
        &self,
        message: &ProtocolMessage,
        cancel: &CancellationToken,
    ) -> Result<InboundMessage> {
        self.channel.request(message, cancel).await
    }

    /// Ask the kernel to describe itself
    pub async fn kernel_info(&self, cancel: &CancellationToken) -> Result<KernelInfoReply> {
        let message = self.message(&KernelInfoRequest {})?;
        let reply = self.request(&message, cancel).await?;
        Ok(reply.content_as()?)
    }

    /// Interrupt the kernel through the REST API
    pub async fn interrupt(&self, cancel: &CancellationToken) -> Result<()> {
        self.provisioner().interrupt(self.kernel.id(), cancel).await
    }

    /// Take the inbound message queue.
    ///
    /// Returns `None` after the first call.
    pub fn inbound(&mut self) -> Option<mpsc::Receiver<InboundMessage>> {
        self.inbound.take()
    }

    pub fn state(&self) -> ChannelState {
        self.channel.state()
    }

    /// Wait until the channel has closed
    pub async fn closed(&self) {
        self.channel.closed().await
    }

    /// Close the channel. The kernel keeps running.
    pub async fn shutdown(&self) -> Result<()> {
        self.channel.close().await
    }

    /// Close the channel and delete the kernel
    pub async fn shutdown_kernel(&self, cancel: &CancellationToken) -> Result<()> {
        self.shutdown().await?;
        self.provisioner().delete(self.kernel.id(), cancel).await
    }
}

/// Best-effort delete of a kernel whose channel never opened
async fn release_kernel(provisioner: &KernelProvisioner<'_>, kernel: &KernelHandle) {
    let cancel = CancellationToken::new();
    match tokio::time::timeout(CLEANUP_TIMEOUT, provisioner.delete(kernel.id(), &cancel)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::warn!(kernel_id = %kernel.id(), error = %e, "Failed to delete kernel after connect failure");
        }
        Err(_) => {
            cancel.cancel();
            tracing::warn!(kernel_id = %kernel.id(), "Timed out deleting kernel after connect failure");
        }
    }
}
