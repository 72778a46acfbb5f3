//! Subscription model and lifecycle states.

use super::channel::{is_valid_channel_name, MetaChannel};
use super::message::BayeuxMessage;
use crate::error::{FayeError, Result};

/// One channel the application cares about.
///
/// Identity and equality are defined by the channel string alone; the
/// other fields may differ between two models for the same channel.
#[derive(Debug, Clone)]
pub struct Subscription {
    /// Channel path, e.g. `/cool`
    pub channel: String,

    /// Meta channel used when building the request (normally Subscribe)
    pub kind: MetaChannel,

    /// Session clientId captured at request time
    pub client_id: Option<String>,
}

impl Subscription {
    /// Create a subscription model for a channel.
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            kind: MetaChannel::Subscribe,
            client_id: None,
        }
    }

    /// Set the clientId used when serializing the request.
    pub fn with_client_id(mut self, client_id: Option<String>) -> Self {
        self.client_id = client_id;
        self
    }

    /// Build the wire request for this subscription.
    ///
    /// Fails with [`FayeError::MissingClientId`] when no clientId has been
    /// assigned yet (callers queue the subscription instead), and with
    /// [`FayeError::InvalidChannel`] when the model is structurally
    /// unserializable.
    pub fn to_message(&self) -> Result<BayeuxMessage> {
        if !is_valid_channel_name(&self.channel) {
            return Err(FayeError::InvalidChannel(self.channel.clone()));
        }
        if !matches!(self.kind, MetaChannel::Subscribe | MetaChannel::Unsubscribe) {
            return Err(FayeError::InvalidChannel(format!(
                "{} is not a subscription channel",
                self.kind
            )));
        }
        let client_id = self
            .client_id
            .as_ref()
            .ok_or_else(|| FayeError::MissingClientId(self.channel.clone()))?;

        Ok(BayeuxMessage {
            channel: self.kind.as_str().to_string(),
            client_id: Some(client_id.clone()),
            subscription: Some(self.channel.clone()),
            ..BayeuxMessage::default()
        })
    }
}

impl PartialEq for Subscription {
    fn eq(&self, other: &Self) -> bool {
        self.channel == other.channel
    }
}

impl Eq for Subscription {}

impl std::hash::Hash for Subscription {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.channel.hash(state);
    }
}

/// Outcome of a subscribe call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Channel is already open; nothing was sent
    Subscribed(Subscription),
    /// A request for this channel is already awaiting confirmation
    Pending(Subscription),
    /// Session not connected yet; request queued for the next handshake
    Queued(Subscription),
    /// Request sent, now awaiting server confirmation
    SubscribingNow(Subscription),
}
