//! Routing of inbound frames
//!
//! Replies to requests made through [`StreamingChannel::request`] go to the
//! waiting caller; every other well-formed frame goes to the inbound queue
//! if it has room.
//!
//! [`StreamingChannel::request`]: super::StreamingChannel::request

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

use kg_protocol::{codec, Channel, InboundMessage};

/// A request waiting for its reply
struct PendingReply {
    channel: Channel,
    reply_tx: oneshot::Sender<InboundMessage>,
}

/// Requests waiting for replies, keyed by the request's `msg_id`
#[derive(Default)]
pub(crate) struct PendingReplies {
    waiting: DashMap<String, PendingReply>,
}

impl PendingReplies {
    /// Wait for the reply to `msg_id` on `channel`
    pub(crate) fn register(
        &self,
        msg_id: &str,
        channel: Channel,
    ) -> oneshot::Receiver<InboundMessage> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.waiting
            .insert(msg_id.to_string(), PendingReply { channel, reply_tx });
        reply_rx
    }

    /// Stop waiting for `msg_id`
    pub(crate) fn forget(&self, msg_id: &str) {
        self.waiting.remove(msg_id);
    }

    /// Hand `message` to the request it answers.
    ///
    /// Gives the message back when nobody is waiting for it.
    pub(crate) fn resolve(&self, message: InboundMessage) -> Option<InboundMessage> {
        if !message.is_reply() {
            return Some(message);
        }
        let Some(parent) = message.parent_msg_id() else {
            return Some(message);
        };

        let channel = message.channel();
        match self.waiting.remove_if(parent, |_, pending| pending.channel == channel) {
            // The requester gave up; the reply still reaches the queue.
            Some((_, pending)) => pending.reply_tx.send(message).err(),
            None => Some(message),
        }
    }

    /// Drop every waiting request, waking each with a closed-channel error
    pub(crate) fn fail_all(&self) {
        self.waiting.clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.waiting.len()
    }
}

/// Decodes frames and delivers them to their destination
pub(crate) struct Dispatcher {
    pending: Arc<PendingReplies>,
    inbound_tx: mpsc::Sender<InboundMessage>,
    dropped: u64,
}

impl Dispatcher {
    pub(crate) fn new(
        pending: Arc<PendingReplies>,
        inbound_tx: mpsc::Sender<InboundMessage>,
    ) -> Self {
        Self {
            pending,
            inbound_tx,
            dropped: 0,
        }
    }

    /// Deliver one text frame.
    ///
    /// Never waits: a frame that finds the inbound queue full is dropped, so
    /// replies behind it still reach their requests.
    pub(crate) fn dispatch(&mut self, frame: &str) {
        let message = match codec::decode(frame) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed frame");
                return;
            }
        };

        tracing::trace!(
            msg_type = %message.msg_type(),
            channel = %message.channel(),
            msg_id = %message.msg_id(),
            "Received message"
        );

        let Some(message) = self.pending.resolve(message) else {
            return;
        };

        match self.inbound_tx.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(message)) => {
                self.dropped += 1;
                tracing::warn!(
                    msg_type = %message.msg_type(),
                    dropped = self.dropped,
                    "Inbound queue full; dropping message"
                );
            }
            Err(TrySendError::Closed(_)) => {
                tracing::trace!("Inbound receiver dropped; discarding message");
            }
        }
    }

    /// Messages dropped because the inbound queue was full
    pub(crate) fn dropped(&self) -> u64 {
        self.dropped
    }
}
