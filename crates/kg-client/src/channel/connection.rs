//! Channels WebSocket for one kernel
//!
//! Opening a channel spawns a reader task that owns the read half of the
//! socket. Writers share the write half behind an async mutex. Closure is
//! signalled once, whether it comes from the owner, a dropped handle, or the
//! reader task hitting a failure.

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use reqwest::Url;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{HeaderValue, AUTHORIZATION};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use kg_core::{ChannelState, GatewayConfig, GatewayError, KernelHandle, Result};
use kg_protocol::{codec, InboundMessage, ProtocolMessage};

use super::dispatch::{Dispatcher, PendingReplies};
use crate::kernel::kernel_path;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

const DEFAULT_INBOUND_CAPACITY: usize = 256;

/// Options for opening a channel
#[derive(Debug, Clone)]
pub struct ChannelOptions {
    /// Sent as `Authorization: token <value>` on the upgrade request
    pub auth_token: Option<String>,
    /// Capacity of the inbound message queue. Messages arriving while it is
    /// full are dropped.
    pub inbound_capacity: usize,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            auth_token: None,
            inbound_capacity: DEFAULT_INBOUND_CAPACITY,
        }
    }
}

impl ChannelOptions {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            auth_token: config.auth_token.clone(),
            inbound_capacity: config.inbound_capacity,
        }
    }
}

/// Address of a kernel's channels endpoint
pub fn channels_url(ws_base: &Url, kernel_id: &str) -> Result<Url> {
    let path = kernel_path(kernel_id, "/channels")?;
    ws_base
        .join(&path)
        .map_err(|e| GatewayError::Address(format!("{} against {}: {}", path, ws_base, e)))
}

/// One-shot closure notification
pub(crate) struct CloseSignal {
    fired: AtomicBool,
    token: CancellationToken,
}

impl CloseSignal {
    pub(crate) fn new() -> Self {
        Self {
            fired: AtomicBool::new(false),
            token: CancellationToken::new(),
        }
    }

    /// Fire the signal. Returns `true` only for the call that fired it.
    pub(crate) fn fire(&self) -> bool {
        if self.fired.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.token.cancel();
        true
    }

    pub(crate) fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }
}

struct Inner {
    kernel_id: String,
    sink: Mutex<WsSink>,
    pending: Arc<PendingReplies>,
    close: CloseSignal,
}

impl Inner {
    /// Move to `Closed`. Returns `true` if this call made the transition.
    fn mark_closed(&self, reason: &str) -> bool {
        if !self.close.fire() {
            return false;
        }
        self.pending.fail_all();
        tracing::info!(kernel_id = %self.kernel_id, reason, "Channel closed");
        true
    }

    fn closed_error(&self) -> GatewayError {
        GatewayError::Transport(format!("Channel to kernel {} is closed", self.kernel_id))
    }
}

/// Open channels WebSocket to one kernel
pub struct StreamingChannel {
    inner: Arc<Inner>,
}

impl StreamingChannel {
    /// Connect to the kernel's channels endpoint under `ws_base`.
    ///
    /// Returns the channel together with the receiving end of its inbound
    /// queue. The queue yields `None` once the channel has closed.
    pub async fn open(
        ws_base: &Url,
        kernel: &KernelHandle,
        options: &ChannelOptions,
        cancel: &CancellationToken,
    ) -> Result<(Self, mpsc::Receiver<InboundMessage>)> {
        let url = channels_url(ws_base, kernel.id())?;

        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| GatewayError::Address(format!("{}: {}", url, e)))?;
        if let Some(token) = &options.auth_token {
            let value = HeaderValue::from_str(&format!("token {}", token))
                .map_err(|e| GatewayError::Encoding(format!("Invalid auth token: {}", e)))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        tracing::debug!(url = %url, "Opening channel");

        let (ws, _response) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GatewayError::Cancelled),
            result = tokio_tungstenite::connect_async(request) => {
                result.map_err(|e| GatewayError::Connect(format!("{}: {}", url, e)))?
            }
        };

        let (sink, stream) = ws.split();
        let (inbound_tx, inbound_rx) = mpsc::channel(options.inbound_capacity.max(1));
        let pending = Arc::new(PendingReplies::default());

        let inner = Arc::new(Inner {
            kernel_id: kernel.id().to_string(),
            sink: Mutex::new(sink),
            pending: Arc::clone(&pending),
            close: CloseSignal::new(),
        });

        let dispatcher = Dispatcher::new(pending, inbound_tx);
        tokio::spawn(read_loop(Arc::clone(&inner), stream, dispatcher));

        tracing::info!(kernel_id = %kernel.id(), "Channel open");
        Ok((Self { inner }, inbound_rx))
    }

    /// Kernel this channel is bound to
    pub fn kernel_id(&self) -> &str {
        &self.inner.kernel_id
    }

    /// `Open` until closed, then `Closed`.
    ///
    /// A channel only exists once its handshake has completed, so it never
    /// reports `Unopened`.
    pub fn state(&self) -> ChannelState {
        if self.inner.close.is_fired() {
            ChannelState::Closed
        } else {
            ChannelState::Open
        }
    }

    pub fn is_open(&self) -> bool {
        self.state() == ChannelState::Open
    }

    /// Wait until the channel has closed
    pub async fn closed(&self) {
        self.inner.close.token().cancelled().await
    }

    /// Encode `message` and write it as one text frame
    pub async fn send(&self, message: &ProtocolMessage) -> Result<()> {
        let frame = codec::encode(message)?;
        tracing::trace!(
            msg_type = %message.msg_type(),
            channel = %message.channel,
            msg_id = %message.msg_id(),
            "Sending message"
        );
        self.write(Message::Text(frame)).await
    }

    /// Send `message` and wait for its reply on the same channel
    pub async fn request(
        &self,
        message: &ProtocolMessage,
        cancel: &CancellationToken,
    ) -> Result<InboundMessage> {
        let msg_id = message.msg_id();
        let reply_rx = self.inner.pending.register(msg_id, message.channel);

        if let Err(err) = self.send(message).await {
            self.inner.pending.forget(msg_id);
            return Err(err);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                self.inner.pending.forget(msg_id);
                Err(GatewayError::Cancelled)
            }
            reply = reply_rx => reply.map_err(|_| {
                GatewayError::Transport(format!(
                    "Channel to kernel {} closed before reply to {}",
                    self.inner.kernel_id, msg_id
                ))
            }),
        }
    }

    /// Close the channel. Later calls do nothing.
    pub async fn close(&self) -> Result<()> {
        if !self.inner.mark_closed("closed by owner") {
            return Ok(());
        }

        let mut sink = self.inner.sink.lock().await;
        if let Err(e) = sink.close().await {
            tracing::debug!(error = %e, "Close handshake did not complete");
        }
        Ok(())
    }

    async fn write(&self, frame: Message) -> Result<()> {
        if self.inner.close.is_fired() {
            return Err(self.inner.closed_error());
        }

        let closed = self.inner.close.token();
        tokio::select! {
            biased;
            _ = closed.cancelled() => Err(self.inner.closed_error()),
            result = async {
                let mut sink = self.inner.sink.lock().await;
                sink.send(frame).await
            } => result.map_err(|e| {
                GatewayError::Transport(format!("Write to kernel {} failed: {}", self.inner.kernel_id, e))
            }),
        }
    }
}

impl Drop for StreamingChannel {
    fn drop(&mut self) {
        if !self.inner.mark_closed("handle dropped") {
            return;
        }
        // Outside a runtime the socket is just dropped.
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let inner = Arc::clone(&self.inner);
            runtime.spawn(async move {
                let mut sink = inner.sink.lock().await;
                if let Err(e) = sink.close().await {
                    tracing::debug!(error = %e, "Close handshake did not complete");
                }
            });
        }
    }
}

async fn read_loop(
    inner: Arc<Inner>,
    mut stream: SplitStream<WsStream>,
    mut dispatcher: Dispatcher,
) {
    let closed = inner.close.token().clone();

    let reason = loop {
        let next = tokio::select! {
            biased;
            _ = closed.cancelled() => break "closed by owner",
            next = stream.next() => next,
        };

        match next {
            Some(Ok(Message::Text(text))) => dispatcher.dispatch(&text),
            Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                Ok(text) => dispatcher.dispatch(text),
                Err(_) => tracing::warn!(len = data.len(), "Skipping non-UTF-8 binary frame"),
            },
            Some(Ok(Message::Close(frame))) => {
                tracing::debug!(?frame, "Gateway sent close");
                break "closed by gateway";
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                tracing::warn!(kernel_id = %inner.kernel_id, error = %e, "Channel read failed");
                break "read failed";
            }
            None => break "stream ended",
        }
    };

    if dispatcher.dropped() > 0 {
        tracing::warn!(
            kernel_id = %inner.kernel_id,
            dropped = dispatcher.dropped(),
            "Inbound messages dropped on a full queue"
        );
    }
    inner.mark_closed(reason);
}
