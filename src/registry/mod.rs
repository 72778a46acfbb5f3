//! Subscription lifecycle bookkeeping.
//!
//! Every channel the application has asked for lives in exactly one of
//! three sets:
//!
//! | Set       | Meaning                                               |
//! |-----------|-------------------------------------------------------|
//! | `queued`  | Requested while the session was not connected         |
//! | `pending` | Request sent, awaiting server confirmation            |
//! | `open`    | Confirmed by the server; messages are delivered       |
//!
//! Set membership is mutually exclusive: every insert removes the channel
//! from the other two sets, so the invariant holds even against racing
//! callers. Each set has its own lock; the registry is shared between the
//! client facade, the session reader, and the retry timer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::protocol::Subscription;

/// Per-channel message callback.
///
/// When registered, it exclusively receives traffic for its channel; the
/// generic observer sees nothing for that channel.
pub type ChannelCallback = Arc<dyn Fn(&Value) + Send + Sync>;

/// Thread-safe queued/pending/open subscription bookkeeping.
#[derive(Default)]
pub struct SubscriptionRegistry {
    queued: Mutex<Vec<Subscription>>,
    pending: Mutex<Vec<Subscription>>,
    open: Mutex<Vec<Subscription>>,
    callbacks: Mutex<HashMap<String, ChannelCallback>>,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscription to the queued set. Returns `false` if the
    /// channel was already queued.
    pub fn enqueue(&self, subscription: Subscription) -> bool {
        self.remove_pending(&subscription.channel);
        self.remove_open(&subscription.channel);

        if let Ok(mut queued) = self.queued.lock() {
            if queued.iter().any(|s| s.channel == subscription.channel) {
                return false;
            }
            queued.push(subscription);
            true
        } else {
            false
        }
    }

    /// Move a subscription into the pending set.
    pub fn mark_pending(&self, subscription: Subscription) {
        self.remove_queued(&subscription.channel);
        self.remove_open(&subscription.channel);

        if let Ok(mut pending) = self.pending.lock() {
            if !pending.iter().any(|s| s.channel == subscription.channel) {
                pending.push(subscription);
            }
        }
    }

    /// Move a subscription into the open set.
    pub fn mark_open(&self, subscription: Subscription) {
        self.remove_queued(&subscription.channel);
        self.remove_pending(&subscription.channel);

        if let Ok(mut open) = self.open.lock() {
            if !open.iter().any(|s| s.channel == subscription.channel) {
                open.push(subscription);
            }
        }
    }

    /// Remove a channel from the queued set.
    pub fn remove_queued(&self, channel: &str) -> bool {
        Self::remove_from(&self.queued, channel)
    }

    /// Remove a channel from the pending set.
    pub fn remove_pending(&self, channel: &str) -> bool {
        Self::remove_from(&self.pending, channel)
    }

    /// Remove a channel from the open set.
    pub fn remove_open(&self, channel: &str) -> bool {
        Self::remove_from(&self.open, channel)
    }

    /// Remove a channel from every set. Defensive: membership should be
    /// exclusive, but removal must not rely on it.
    pub fn remove_everywhere(&self, channel: &str) -> bool {
        let queued = self.remove_queued(channel);
        let pending = self.remove_pending(channel);
        let open = self.remove_open(channel);
        queued || pending || open
    }

    /// Whether the channel sits in the queued set.
    pub fn is_queued(&self, channel: &str) -> bool {
        Self::contains(&self.queued, channel)
    }

    /// Whether the channel sits in the pending set.
    pub fn is_pending(&self, channel: &str) -> bool {
        Self::contains(&self.pending, channel)
    }

    /// Whether the channel's subscription has been confirmed.
    pub fn is_open(&self, channel: &str) -> bool {
        Self::contains(&self.open, channel)
    }

    /// Drain the queued set, returning its members.
    pub fn take_queued(&self) -> Vec<Subscription> {
        Self::take(&self.queued)
    }

    /// Drain the pending set, returning its members.
    pub fn take_pending(&self) -> Vec<Subscription> {
        Self::take(&self.pending)
    }

    /// Drain every set, returning the union of tracked subscriptions
    /// (deduplicated by channel).
    pub fn drain_all(&self) -> Vec<Subscription> {
        let mut all = Self::take(&self.queued);
        for sub in Self::take(&self.open)
            .into_iter()
            .chain(Self::take(&self.pending))
        {
            if !all.iter().any(|s| s.channel == sub.channel) {
                all.push(sub);
            }
        }
        all
    }

    /// Total number of tracked channels across all three sets.
    pub fn tracked_count(&self) -> usize {
        let count = |set: &Mutex<Vec<Subscription>>| set.lock().map(|s| s.len()).unwrap_or(0);
        count(&self.queued) + count(&self.pending) + count(&self.open)
    }

    /// Register a per-channel callback. The mapping survives the
    /// queued → pending → open transitions.
    pub fn register_callback(&self, channel: &str, callback: ChannelCallback) {
        if let Ok(mut callbacks) = self.callbacks.lock() {
            callbacks.insert(channel.to_string(), callback);
        }
    }

    /// Remove the callback registered for a channel, if any.
    pub fn remove_callback(&self, channel: &str) {
        if let Ok(mut callbacks) = self.callbacks.lock() {
            callbacks.remove(channel);
        }
    }

    /// Look up the callback registered for a channel.
    pub fn callback(&self, channel: &str) -> Option<ChannelCallback> {
        self.callbacks
            .lock()
            .ok()
            .and_then(|callbacks| callbacks.get(channel).cloned())
    }

    fn remove_from(set: &Mutex<Vec<Subscription>>, channel: &str) -> bool {
        if let Ok(mut set) = set.lock() {
            if let Some(index) = set.iter().position(|s| s.channel == channel) {
                set.remove(index);
                return true;
            }
        }
        false
    }

    fn contains(set: &Mutex<Vec<Subscription>>, channel: &str) -> bool {
        set.lock()
            .map(|set| set.iter().any(|s| s.channel == channel))
            .unwrap_or(false)
    }

    fn take(set: &Mutex<Vec<Subscription>>) -> Vec<Subscription> {
        set.lock().map(|mut set| std::mem::take(&mut *set)).unwrap_or_default()
    }
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("queued", &self.queued.lock().map(|s| s.len()).unwrap_or(0))
            .field("pending", &self.pending.lock().map(|s| s.len()).unwrap_or(0))
            .field("open", &self.open.lock().map(|s| s.len()).unwrap_or(0))
            .finish()
    }
}
