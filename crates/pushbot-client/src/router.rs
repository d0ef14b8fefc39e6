//! Publish/subscribe dispatch keyed by channel name.
//!
//! The router is the one dispatch primitive of the client: the negotiation
//! state machine listens on the meta-channels and the command handler on
//! the application resource channel, all through the same table.

use pushbot_protocol::{Channel, Frame};
use tracing::warn;

use crate::error::ClientResult;

/// A routed frame handler.
pub type Handler = Box<dyn FnMut(&Frame) -> ClientResult<()> + Send>;

/// Whether a subscription survives its first delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionMode {
    /// Removed after the first frame it receives.
    Once,
    /// Stays registered until explicitly unsubscribed.
    Persistent,
}

/// Identifies a subscription for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Entry {
    id: SubscriptionId,
    channel: Channel,
    mode: SubscriptionMode,
    handler: Handler,
}

/// Exact-match dispatcher; no wildcard or prefix routing.
#[derive(Default)]
pub struct ChannelRouter {
    entries: Vec<Entry>,
    next_id: u64,
}

impl ChannelRouter {
    /// Creates an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for a channel.
    pub fn subscribe(
        &mut self,
        channel: Channel,
        mode: SubscriptionMode,
        handler: Handler,
    ) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.entries.push(Entry {
            id,
            channel,
            mode,
            handler,
        });
        id
    }

    /// One-shot subscription.
    pub fn once(&mut self, channel: Channel, handler: Handler) -> SubscriptionId {
        self.subscribe(channel, SubscriptionMode::Once, handler)
    }

    /// Persistent subscription.
    pub fn on(&mut self, channel: Channel, handler: Handler) -> SubscriptionId {
        self.subscribe(channel, SubscriptionMode::Persistent, handler)
    }

    /// Removes a subscription; returns whether it was still registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    /// Delivers a frame to every handler subscribed to exactly its channel,
    /// in registration order, and returns how many were invoked.
    ///
    /// A failing handler is reported and skipped; it neither stops delivery
    /// to the remaining handlers nor reaches the transport read loop.
    /// Invoked one-shot handlers are removed afterwards.
    pub fn publish(&mut self, frame: &Frame) -> usize {
        let mut delivered = 0;
        self.entries.retain_mut(|entry| {
            if entry.channel != frame.channel {
                return true;
            }
            delivered += 1;
            if let Err(err) = (entry.handler)(frame) {
                warn!(channel = %frame.channel, error = %err, "subscriber failed");
            }
            entry.mode == SubscriptionMode::Persistent
        });
        delivered
    }

    /// Number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.entries.len()
    }
}
