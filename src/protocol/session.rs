//! Bayeux session state machine.
//!
//! [`Session`] reconciles the three racing sources of state change — user
//! subscribe/unsubscribe/publish calls, transport connect/disconnect
//! events, and asynchronous server responses — into one consistent view of
//! the subscription lifecycle. It performs no I/O itself: every operation
//! returns [`Action`]s for the caller to execute (frames to send,
//! notifications to raise, payloads to deliver).
//!
//! ## State machine
//!
//! | State          | Meaning                              | Leaves via                  |
//! |----------------|--------------------------------------|-----------------------------|
//! | `Unknown`      | Fresh session, nothing attempted yet | transport connected         |
//! | `Disconnected` | No live Bayeux session               | successful handshake        |
//! | `Connected`    | Handshaken, connect loop running     | disconnect / transport drop |
//!
//! Dropping to `Disconnected` always runs the teardown invariant: a
//! disconnected session has no confirmed subscriptions, so every tracked
//! channel leaves its set through an unsubscribed notification.

use std::sync::Arc;

use base64::Engine;
use serde_json::Value;

use super::channel::MetaChannel;
use super::message::BayeuxMessage;
use super::subscription::{Subscription, SubscriptionState};
use crate::registry::SubscriptionRegistry;

/// Session connectivity, tri-state by design: a fresh session does not yet
/// know whether the server is reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    /// Nothing attempted yet
    #[default]
    Unknown,
    /// No live Bayeux session
    Disconnected,
    /// Handshake confirmed, connect loop running
    Connected,
}

/// Notification raised toward the application observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Handshake succeeded, session established
    Connected,
    /// Session ended (server confirmed or transport dropped)
    Disconnected,
    /// Transport failed to connect, or handshake was rejected
    ConnectionFailed,
    /// Server confirmed a subscription
    Subscribed(String),
    /// A channel left the open set
    Unsubscribed(String),
    /// Server rejected a subscription
    SubscriptionFailed {
        /// Channel whose subscribe was rejected
        channel: String,
        /// Server-provided error text
        error: String,
    },
}

/// Effect produced by a session step, executed by the owner.
#[derive(Debug)]
pub enum Action {
    /// Queue a frame on the write-ordering queue
    Send(BayeuxMessage),
    /// Raise an observer notification
    Notify(SessionEvent),
    /// Route a data payload through the callback-or-observer dispatch
    Deliver {
        /// Application channel the payload arrived on
        channel: String,
        /// Message payload
        data: Value,
    },
    /// Close the transport connection
    CloseTransport,
}

/// Bayeux session state machine.
pub struct Session {
    /// Server-assigned session identifier; cleared on disconnect
    client_id: Option<String>,
    /// Current connectivity
    connected: Connectivity,
    /// Guards against duplicate connect attempts
    connection_initiated: bool,
    /// Monotonic publish-id counter, wraps at u32 overflow
    message_number: u32,
    /// Timeout advice carried in every /meta/connect
    advice_timeout_ms: u64,
    /// Shared subscription bookkeeping
    registry: Arc<SubscriptionRegistry>,
}

impl Session {
    /// Create a session over the given registry.
    pub fn new(registry: Arc<SubscriptionRegistry>, advice_timeout_ms: u64) -> Self {
        Self {
            client_id: None,
            connected: Connectivity::Unknown,
            connection_initiated: false,
            message_number: 0,
            advice_timeout_ms,
            registry,
        }
    }

    /// The server-assigned clientId, if handshaken.
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    /// Current connectivity.
    pub fn connectivity(&self) -> Connectivity {
        self.connected
    }

    /// Whether a Bayeux session is established.
    pub fn is_connected(&self) -> bool {
        self.connected == Connectivity::Connected
    }

    /// Whether a connect attempt is currently in flight.
    pub fn connection_initiated(&self) -> bool {
        self.connection_initiated
    }

    /// Claim the connect guard. Returns `false` when an attempt is already
    /// in flight, in which case the caller must not open the transport.
    pub fn begin_connect(&mut self) -> bool {
        if self.connection_initiated {
            return false;
        }
        self.connection_initiated = true;
        true
    }

    /// Transport reports the socket is up: clear the guard and start the
    /// Bayeux handshake.
    pub fn handle_transport_connected(&mut self) -> Vec<Action> {
        self.connection_initiated = false;
        vec![Action::Send(BayeuxMessage::handshake())]
    }

    /// Transport lost an established connection.
    pub fn handle_transport_disconnected(&mut self, reason: Option<&str>) -> Vec<Action> {
        tracing::info!("transport disconnected: {}", reason.unwrap_or("no reason"));
        self.connection_initiated = false;

        let mut actions = self.drop_session();
        actions.push(Action::Notify(SessionEvent::Disconnected));
        actions
    }

    /// Transport could not establish a connection.
    pub fn handle_transport_failed(&mut self, error: &str) -> Vec<Action> {
        tracing::warn!("transport failed to connect: {error}");
        self.connection_initiated = false;

        let mut actions = self.drop_session();
        actions.push(Action::Notify(SessionEvent::ConnectionFailed));
        actions
    }

    /// Interpret one incoming Bayeux message.
    pub fn handle_message(&mut self, message: BayeuxMessage) -> Vec<Action> {
        match message.meta_channel() {
            Some(MetaChannel::Handshake) => self.on_handshake_response(message),
            Some(MetaChannel::Connect) => self.on_connect_response(&message),
            Some(MetaChannel::Disconnect) => self.on_disconnect_response(&message),
            Some(MetaChannel::Subscribe) => self.on_subscribe_response(message),
            Some(MetaChannel::Unsubscribe) => self.on_unsubscribe_response(&message),
            None => self.on_data_message(message),
        }
    }

    /// Request a subscription. Returns the resulting lifecycle state plus
    /// any frame to send.
    ///
    /// Idempotent: an already-open channel reports `Subscribed` and an
    /// already-pending one reports `Pending`, with zero wire writes in
    /// both cases.
    pub fn subscribe(&mut self, channel: &str) -> (SubscriptionState, Vec<Action>) {
        let subscription = Subscription::new(channel).with_client_id(self.client_id.clone());

        if self.registry.is_open(channel) {
            return (SubscriptionState::Subscribed(subscription), Vec::new());
        }
        if self.registry.is_pending(channel) {
            return (SubscriptionState::Pending(subscription), Vec::new());
        }

        if !self.is_connected() {
            self.registry.enqueue(subscription.clone());
            return (SubscriptionState::Queued(subscription), Vec::new());
        }

        match subscription.to_message() {
            Ok(message) => {
                self.registry.mark_pending(subscription.clone());
                (
                    SubscriptionState::SubscribingNow(subscription),
                    vec![Action::Send(message)],
                )
            }
            Err(err) => {
                // No clientId yet (or a malformed channel): defer instead
                // of failing the caller.
                tracing::debug!("deferring subscribe to {channel}: {err}");
                self.registry.enqueue(subscription.clone());
                (SubscriptionState::Queued(subscription), Vec::new())
            }
        }
    }

    /// Drop local interest in a channel and, when a clientId is known,
    /// tell the server.
    ///
    /// Does not suppress a subscribe response already in flight; a late
    /// success is reconciled by the unsubscribe response that follows it.
    pub fn unsubscribe(&mut self, channel: &str) -> Vec<Action> {
        self.registry.remove_queued(channel);

        let mut actions = Vec::new();
        if let Some(client_id) = &self.client_id {
            actions.push(Action::Send(BayeuxMessage::unsubscribe(client_id, channel)));
        }

        self.registry.remove_callback(channel);
        self.registry.remove_open(channel);
        self.registry.remove_pending(channel);
        actions
    }

    /// Publish a payload to an application channel.
    ///
    /// Requires an established session; otherwise the message is dropped
    /// with a log entry, matching the at-least-once-while-connected scope.
    pub fn publish(&mut self, channel: &str, data: Value) -> Vec<Action> {
        if !self.is_connected() {
            tracing::warn!("publish to {channel} dropped: not connected");
            return Vec::new();
        }
        let Some(client_id) = self.client_id.clone() else {
            tracing::warn!("publish to {channel} dropped: no clientId");
            return Vec::new();
        };

        let id = self.next_message_id();
        vec![Action::Send(BayeuxMessage::publish(
            channel, &client_id, &id, data,
        ))]
    }

    /// Begin a graceful disconnect: unsubscribe every tracked channel on
    /// the wire, then send `/meta/disconnect`.
    ///
    /// Without a clientId there is no Bayeux session to tear down, so the
    /// transport is closed directly.
    pub fn disconnect(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();

        match self.client_id.clone() {
            Some(client_id) => {
                // Wire unsubscribes only: the server's responses carry the
                // unsubscribed notifications back through the normal path.
                for subscription in self.registry.drain_all() {
                    self.registry.remove_callback(&subscription.channel);
                    actions.push(Action::Send(BayeuxMessage::unsubscribe(
                        &client_id,
                        &subscription.channel,
                    )));
                }
                actions.push(Action::Send(BayeuxMessage::disconnect(&client_id)));
            }
            None => {
                actions.extend(self.drop_session());
                actions.push(Action::CloseTransport);
                actions.push(Action::Notify(SessionEvent::Disconnected));
            }
        }
        actions
    }

    /// Retry-scheduler tick: re-send every subscription stuck in pending.
    ///
    /// Each channel is removed from pending and re-added by the re-sent
    /// request — exactly one additional frame per stuck channel, never a
    /// duplicate entry. A tick while disconnected is a no-op.
    pub fn retry_pending(&mut self) -> Vec<Action> {
        if !self.is_connected() {
            tracing::debug!("skipping pending-subscription retry: not connected");
            return Vec::new();
        }

        let stuck = self.registry.take_pending();
        if stuck.is_empty() {
            return Vec::new();
        }
        tracing::info!("resubscribing {} pending subscription(s)", stuck.len());

        let mut actions = Vec::new();
        for subscription in stuck {
            let subscription = subscription.with_client_id(self.client_id.clone());
            match subscription.to_message() {
                Ok(message) => {
                    self.registry.mark_pending(subscription);
                    actions.push(Action::Send(message));
                }
                Err(err) => {
                    tracing::debug!(
                        "re-queueing {} instead of retrying: {err}",
                        subscription.channel
                    );
                    self.registry.enqueue(subscription);
                }
            }
        }
        actions
    }

    fn on_handshake_response(&mut self, message: BayeuxMessage) -> Vec<Action> {
        if !message.is_successful() {
            tracing::warn!(
                "handshake rejected: {}",
                message.error.as_deref().unwrap_or("no error given")
            );
            return vec![Action::Notify(SessionEvent::ConnectionFailed)];
        }
        let Some(client_id) = message.client_id else {
            tracing::warn!("handshake response missing clientId, dropping");
            return Vec::new();
        };

        self.client_id = Some(client_id.clone());
        self.connected = Connectivity::Connected;

        let mut actions = vec![
            Action::Notify(SessionEvent::Connected),
            Action::Send(BayeuxMessage::connect(&client_id, self.advice_timeout_ms)),
        ];
        actions.extend(self.flush_queued());
        actions
    }

    fn on_connect_response(&mut self, message: &BayeuxMessage) -> Vec<Action> {
        if !message.is_successful() {
            // No automatic retry here; reconnection is an application
            // decision surfaced through the transport events.
            tracing::warn!(
                "connect rejected: {}",
                message.error.as_deref().unwrap_or("no error given")
            );
            return Vec::new();
        }
        let Some(client_id) = self.client_id.clone() else {
            tracing::warn!("connect response before handshake, dropping");
            return Vec::new();
        };

        // The connect loop: every successful response chains the next
        // request for as long as the session lives.
        self.connected = Connectivity::Connected;
        vec![Action::Send(BayeuxMessage::connect(
            &client_id,
            self.advice_timeout_ms,
        ))]
    }

    fn on_disconnect_response(&mut self, message: &BayeuxMessage) -> Vec<Action> {
        if !message.is_successful() {
            tracing::warn!(
                "disconnect rejected: {}",
                message.error.as_deref().unwrap_or("no error given")
            );
            return Vec::new();
        }

        let mut actions = self.drop_session();
        actions.push(Action::CloseTransport);
        actions.push(Action::Notify(SessionEvent::Disconnected));
        actions
    }

    fn on_subscribe_response(&mut self, message: BayeuxMessage) -> Vec<Action> {
        let Some(channel) = message.subscription else {
            tracing::warn!("subscribe response missing subscription field, dropping");
            return Vec::new();
        };

        self.registry.remove_pending(&channel);

        if message.successful.unwrap_or(false) {
            // Applied even when the application already unsubscribed
            // locally (response race): the channel briefly reopens and the
            // in-flight unsubscribe response closes it again.
            self.registry.mark_open(
                Subscription::new(channel.clone()).with_client_id(self.client_id.clone()),
            );
            vec![Action::Notify(SessionEvent::Subscribed(channel))]
        } else {
            let error = message
                .error
                .unwrap_or_else(|| "subscription rejected".to_string());
            vec![Action::Notify(SessionEvent::SubscriptionFailed {
                channel,
                error,
            })]
        }
    }

    fn on_unsubscribe_response(&mut self, message: &BayeuxMessage) -> Vec<Action> {
        let Some(channel) = message.subscription.clone() else {
            tracing::warn!("unsubscribe response missing subscription field, dropping");
            return Vec::new();
        };

        // The server is authoritative: no success/failure branching.
        self.registry.remove_open(&channel);
        vec![Action::Notify(SessionEvent::Unsubscribed(channel))]
    }

    fn on_data_message(&mut self, message: BayeuxMessage) -> Vec<Action> {
        let channel = message.channel;

        if !self.registry.is_open(&channel) {
            tracing::debug!("dropping message for non-open channel {channel}");
            return Vec::new();
        }
        let Some(data) = message.data else {
            tracing::debug!("dropping message without data on {channel}");
            return Vec::new();
        };

        vec![Action::Deliver { channel, data }]
    }

    /// Flush the queued set after a successful handshake: each channel
    /// moves to pending and produces exactly one subscribe frame carrying
    /// the freshly assigned clientId.
    fn flush_queued(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        for subscription in self.registry.take_queued() {
            let subscription = subscription.with_client_id(self.client_id.clone());
            match subscription.to_message() {
                Ok(message) => {
                    self.registry.mark_pending(subscription);
                    actions.push(Action::Send(message));
                }
                Err(err) => {
                    tracing::warn!("cannot flush subscription {}: {err}", subscription.channel);
                    self.registry.enqueue(subscription);
                }
            }
        }
        actions
    }

    /// The disconnection invariant: a session that is not connected has no
    /// confirmed subscriptions. Every tracked channel leaves through the
    /// standard unsubscribed notification and its callback is removed.
    fn drop_session(&mut self) -> Vec<Action> {
        self.connected = Connectivity::Disconnected;
        self.client_id = None;

        let mut actions = Vec::new();
        for subscription in self.registry.drain_all() {
            self.registry.remove_callback(&subscription.channel);
            actions.push(Action::Notify(SessionEvent::Unsubscribed(
                subscription.channel,
            )));
        }
        actions
    }

    /// Next publish id: wrapping 32-bit counter, base64-encoded on the wire.
    fn next_message_id(&mut self) -> String {
        self.message_number = self.message_number.wrapping_add(1);
        base64::engine::general_purpose::STANDARD.encode(self.message_number.to_string())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("client_id", &self.client_id)
            .field("connected", &self.connected)
            .field("connection_initiated", &self.connection_initiated)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use serde_json::json;

    fn session() -> Session {
        Session::new(Arc::new(SubscriptionRegistry::new()), 10_000)
    }

    fn sent_frames(actions: &[Action]) -> Vec<&BayeuxMessage> {
        actions
            .iter()
            .filter_map(|a| match a {
                Action::Send(msg) => Some(msg),
                _ => None,
            })
            .collect()
    }

    fn events(actions: &[Action]) -> Vec<&SessionEvent> {
        actions
            .iter()
            .filter_map(|a| match a {
                Action::Notify(ev) => Some(ev),
                _ => None,
            })
            .collect()
    }

    fn handshake_ok(client_id: &str) -> BayeuxMessage {
        codec::decode(&format!(
            r#"[{{"channel":"/meta/handshake","clientId":"{client_id}","successful":1}}]"#
        ))
        .unwrap()
    }

    #[test]
    fn test_begin_connect_guards_duplicates() {
        let mut session = session();

        assert!(session.begin_connect());
        assert!(!session.begin_connect());

        // Transport coming up clears the guard.
        session.handle_transport_connected();
        assert!(session.begin_connect());
    }

    #[test]
    fn test_transport_connected_sends_handshake() {
        let mut session = session();
        session.begin_connect();

        let actions = session.handle_transport_connected();
        let frames = sent_frames(&actions);

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].channel, "/meta/handshake");
        assert_eq!(
            frames[0].supported_connection_types,
            Some(vec![
                "long-polling".to_string(),
                "callback-polling".to_string(),
                "iframe".to_string(),
                "websocket".to_string(),
            ])
        );
    }

    #[test]
    fn test_handshake_success_scenario() {
        let mut session = session();
        session.subscribe("/cool");
        assert!(session.registry.is_queued("/cool"));

        let actions = session.handle_message(handshake_ok("abc123"));

        // (a) clientId stored
        assert_eq!(session.client_id(), Some("abc123"));
        // (b) connected
        assert!(session.is_connected());

        // (c) a /meta/connect carrying the clientId
        let frames = sent_frames(&actions);
        assert_eq!(frames[0].channel, "/meta/connect");
        assert_eq!(frames[0].client_id.as_deref(), Some("abc123"));
        assert_eq!(frames[0].advice, Some(crate::protocol::Advice { timeout: 10_000 }));

        // (d) the queued channel flushed as a subscribe with the fresh id
        assert_eq!(frames[1].channel, "/meta/subscribe");
        assert_eq!(frames[1].subscription.as_deref(), Some("/cool"));
        assert_eq!(frames[1].client_id.as_deref(), Some("abc123"));
        assert!(session.registry.is_pending("/cool"));
        assert!(!session.registry.is_queued("/cool"));

        assert_eq!(events(&actions), vec![&SessionEvent::Connected]);
    }

    #[test]
    fn test_handshake_flushes_each_queued_channel_once() {
        let mut session = session();
        session.subscribe("/a");
        session.subscribe("/b");
        session.subscribe("/b");
        session.subscribe("/c");

        let actions = session.handle_message(handshake_ok("abc"));
        let subscribes: Vec<_> = sent_frames(&actions)
            .into_iter()
            .filter(|m| m.channel == "/meta/subscribe")
            .collect();

        assert_eq!(subscribes.len(), 3);
        for frame in subscribes {
            assert_eq!(frame.client_id.as_deref(), Some("abc"));
        }
    }

    #[test]
    fn test_handshake_failure_notifies_connection_failed() {
        let mut session = session();
        let response: BayeuxMessage = serde_json::from_value(json!({
            "channel": "/meta/handshake",
            "successful": false,
            "error": "401::auth required"
        }))
        .unwrap();

        let actions = session.handle_message(response);

        assert!(!session.is_connected());
        assert!(session.client_id().is_none());
        assert_eq!(events(&actions), vec![&SessionEvent::ConnectionFailed]);
        assert!(sent_frames(&actions).is_empty());
    }

    #[test]
    fn test_connect_success_chains_next_connect() {
        let mut session = session();
        session.handle_message(handshake_ok("abc"));

        let response: BayeuxMessage =
            serde_json::from_value(json!({"channel": "/meta/connect", "successful": true}))
                .unwrap();
        let actions = session.handle_message(response);
        let frames = sent_frames(&actions);

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].channel, "/meta/connect");
        assert_eq!(frames[0].client_id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_connect_failure_stops_chain() {
        let mut session = session();
        session.handle_message(handshake_ok("abc"));

        let response: BayeuxMessage =
            serde_json::from_value(json!({"channel": "/meta/connect", "successful": false}))
                .unwrap();
        let actions = session.handle_message(response);

        assert!(sent_frames(&actions).is_empty());
        assert!(events(&actions).is_empty());
    }

    #[test]
    fn test_subscribe_while_disconnected_queues_once() {
        let mut session = session();

        let (first, actions) = session.subscribe("/cool");
        assert!(matches!(first, SubscriptionState::Queued(_)));
        assert!(actions.is_empty());

        let (second, actions) = session.subscribe("/cool");
        assert!(matches!(second, SubscriptionState::Queued(_)));
        assert!(actions.is_empty());

        assert_eq!(session.registry.take_queued().len(), 1);
    }

    #[test]
    fn test_subscribe_on_open_channel_is_write_free() {
        let mut session = session();
        session.handle_message(handshake_ok("abc"));
        session.registry.mark_open(Subscription::new("/cool"));

        let (state, actions) = session.subscribe("/cool");

        assert!(matches!(state, SubscriptionState::Subscribed(_)));
        assert!(actions.is_empty());
    }

    #[test]
    fn test_subscribe_while_connected_goes_pending() {
        let mut session = session();
        session.handle_message(handshake_ok("abc"));

        let (state, actions) = session.subscribe("/cool");

        assert!(matches!(state, SubscriptionState::SubscribingNow(_)));
        let frames = sent_frames(&actions);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].channel, "/meta/subscribe");
        assert!(session.registry.is_pending("/cool"));

        // A second call while pending reports pending, no extra frame.
        let (state, actions) = session.subscribe("/cool");
        assert!(matches!(state, SubscriptionState::Pending(_)));
        assert!(actions.is_empty());
    }

    #[test]
    fn test_subscribe_response_success_opens_channel() {
        let mut session = session();
        session.handle_message(handshake_ok("abc"));
        session.subscribe("/cool");

        let response: BayeuxMessage = serde_json::from_value(json!({
            "channel": "/meta/subscribe",
            "subscription": "/cool",
            "successful": true
        }))
        .unwrap();
        let actions = session.handle_message(response);

        assert!(session.registry.is_open("/cool"));
        assert!(!session.registry.is_pending("/cool"));
        assert_eq!(
            events(&actions),
            vec![&SessionEvent::Subscribed("/cool".to_string())]
        );
    }

    #[test]
    fn test_subscribe_response_failure_is_not_requeued() {
        let mut session = session();
        session.handle_message(handshake_ok("abc"));
        session.subscribe("/cool");

        let response: BayeuxMessage = serde_json::from_value(json!({
            "channel": "/meta/subscribe",
            "subscription": "/cool",
            "successful": false,
            "error": "403::denied"
        }))
        .unwrap();
        let actions = session.handle_message(response);

        assert!(!session.registry.is_open("/cool"));
        assert!(!session.registry.is_pending("/cool"));
        assert!(!session.registry.is_queued("/cool"));
        assert_eq!(
            events(&actions),
            vec![&SessionEvent::SubscriptionFailed {
                channel: "/cool".to_string(),
                error: "403::denied".to_string(),
            }]
        );
    }

    #[test]
    fn test_subscribe_success_after_local_unsubscribe() {
        let mut session = session();
        session.handle_message(handshake_ok("abc"));
        session.subscribe("/cool");

        // Application changes its mind before the server confirms.
        let actions = session.unsubscribe("/cool");
        assert_eq!(sent_frames(&actions).len(), 1);
        assert!(!session.registry.is_pending("/cool"));

        // The in-flight success still lands: open-then-stale.
        let response: BayeuxMessage = serde_json::from_value(json!({
            "channel": "/meta/subscribe",
            "subscription": "/cool",
            "successful": true
        }))
        .unwrap();
        let actions = session.handle_message(response);
        assert!(session.registry.is_open("/cool"));
        assert_eq!(
            events(&actions),
            vec![&SessionEvent::Subscribed("/cool".to_string())]
        );

        // The unsubscribe response closes it again.
        let response: BayeuxMessage = serde_json::from_value(json!({
            "channel": "/meta/unsubscribe",
            "subscription": "/cool"
        }))
        .unwrap();
        let actions = session.handle_message(response);
        assert!(!session.registry.is_open("/cool"));
        assert_eq!(
            events(&actions),
            vec![&SessionEvent::Unsubscribed("/cool".to_string())]
        );
    }

    #[test]
    fn test_unsubscribe_response_clears_open_unconditionally() {
        let mut session = session();
        session.registry.mark_open(Subscription::new("/cool"));

        let response: BayeuxMessage = serde_json::from_value(json!({
            "channel": "/meta/unsubscribe",
            "subscription": "/cool",
            "successful": false
        }))
        .unwrap();
        let actions = session.handle_message(response);

        assert!(!session.registry.is_open("/cool"));
        assert_eq!(
            events(&actions),
            vec![&SessionEvent::Unsubscribed("/cool".to_string())]
        );
    }

    #[test]
    fn test_data_message_delivered_only_when_open() {
        let mut session = session();

        // Not open: dropped, no observer traffic.
        let message: BayeuxMessage =
            serde_json::from_value(json!({"channel": "/cool", "data": {"text": "hi"}})).unwrap();
        let actions = session.handle_message(message);
        assert!(actions.is_empty());

        // Open: delivered.
        session.registry.mark_open(Subscription::new("/cool"));
        let message: BayeuxMessage =
            serde_json::from_value(json!({"channel": "/cool", "data": {"text": "hi"}})).unwrap();
        let actions = session.handle_message(message);

        assert_eq!(actions.len(), 1);
        assert!(matches!(
            &actions[0],
            Action::Deliver { channel, data }
                if channel == "/cool" && *data == json!({"text": "hi"})
        ));
    }

    #[test]
    fn test_data_message_without_payload_dropped() {
        let mut session = session();
        session.registry.mark_open(Subscription::new("/cool"));

        let message: BayeuxMessage =
            serde_json::from_value(json!({"channel": "/cool"})).unwrap();
        assert!(session.handle_message(message).is_empty());
    }

    #[test]
    fn test_transport_drop_unsubscribes_everything() {
        let mut session = session();
        session.handle_message(handshake_ok("abc"));
        session.subscribe("/pending");
        session.registry.mark_open(Subscription::new("/open"));
        session.registry.enqueue(Subscription::new("/queued"));
        session.registry.register_callback("/open", Arc::new(|_: &Value| {}));

        let actions = session.handle_transport_disconnected(Some("connection reset"));

        assert!(!session.is_connected());
        assert!(session.client_id().is_none());
        assert_eq!(session.registry.tracked_count(), 0);
        assert!(session.registry.callback("/open").is_none());

        let mut unsubscribed: Vec<_> = events(&actions)
            .into_iter()
            .filter_map(|e| match e {
                SessionEvent::Unsubscribed(c) => Some(c.clone()),
                _ => None,
            })
            .collect();
        unsubscribed.sort();
        assert_eq!(unsubscribed, vec!["/open", "/pending", "/queued"]);
        assert!(events(&actions).contains(&&SessionEvent::Disconnected));
    }

    #[test]
    fn test_transport_failure_notifies_connection_failed() {
        let mut session = session();
        session.begin_connect();

        let actions = session.handle_transport_failed("connection refused");

        assert!(!session.connection_initiated());
        assert_eq!(events(&actions), vec![&SessionEvent::ConnectionFailed]);
    }

    #[test]
    fn test_publish_requires_connected_session() {
        let mut session = session();
        assert!(session.publish("/cool", json!({"text": "hi"})).is_empty());

        session.handle_message(handshake_ok("abc"));
        let actions = session.publish("/cool", json!({"text": "hi"}));
        let frames = sent_frames(&actions);

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].channel, "/cool");
        assert_eq!(frames[0].client_id.as_deref(), Some("abc"));
        // "1" base64-encoded
        assert_eq!(frames[0].id.as_deref(), Some("MQ=="));
    }

    #[test]
    fn test_message_ids_increment_and_wrap() {
        let mut session = session();
        session.message_number = u32::MAX - 1;

        assert_eq!(
            session.next_message_id(),
            base64::engine::general_purpose::STANDARD.encode(u32::MAX.to_string())
        );
        // Wraps through zero.
        assert_eq!(
            session.next_message_id(),
            base64::engine::general_purpose::STANDARD.encode("0")
        );
    }

    #[test]
    fn test_retry_resends_pending_exactly_once() {
        let mut session = session();
        session.handle_message(handshake_ok("abc"));
        session.subscribe("/foo");
        assert!(session.registry.is_pending("/foo"));

        let actions = session.retry_pending();
        let frames = sent_frames(&actions);

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].channel, "/meta/subscribe");
        assert_eq!(frames[0].subscription.as_deref(), Some("/foo"));

        // Removed-then-readded, not duplicated.
        assert!(session.registry.is_pending("/foo"));
        assert_eq!(session.registry.take_pending().len(), 1);
    }

    #[test]
    fn test_retry_is_noop_while_disconnected() {
        let mut session = session();
        session.registry.mark_pending(Subscription::new("/foo"));

        assert!(session.retry_pending().is_empty());
        assert!(session.registry.is_pending("/foo"));
    }

    #[test]
    fn test_disconnect_unsubscribes_then_sends_disconnect() {
        let mut session = session();
        session.handle_message(handshake_ok("abc"));
        session.registry.mark_open(Subscription::new("/cool"));

        let actions = session.disconnect();
        let frames = sent_frames(&actions);

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].channel, "/meta/unsubscribe");
        assert_eq!(frames[0].subscription.as_deref(), Some("/cool"));
        assert_eq!(frames[1].channel, "/meta/disconnect");
        assert_eq!(session.registry.tracked_count(), 0);

        // Server confirms: session drops and the transport closes.
        let response: BayeuxMessage =
            serde_json::from_value(json!({"channel": "/meta/disconnect", "successful": true}))
                .unwrap();
        let actions = session.handle_message(response);

        assert!(!session.is_connected());
        assert!(actions.iter().any(|a| matches!(a, Action::CloseTransport)));
        assert!(events(&actions).contains(&&SessionEvent::Disconnected));
    }

    #[test]
    fn test_disconnect_without_client_id_closes_transport() {
        let mut session = session();
        let actions = session.disconnect();

        assert!(sent_frames(&actions).is_empty());
        assert!(actions.iter().any(|a| matches!(a, Action::CloseTransport)));
        assert!(events(&actions).contains(&&SessionEvent::Disconnected));
    }
}
