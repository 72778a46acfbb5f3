//! Faye client facade.
//!
//! [`FayeClient`] composes the session state machine, the subscription
//! registry, the wire codec, and a transport into the public
//! publish/subscribe surface. Two ordered queues keep the concurrent
//! parts honest:
//!
//! - every outgoing frame passes through a single writer task (encode +
//!   handoff to the transport), so writes keep their issue order;
//! - every transport event passes through a single reader task (decode +
//!   session step + action execution), so server responses are processed
//!   in arrival order — the handshake is fully applied before anything
//!   that references its clientId.
//!
//! Facade methods lock, enqueue, and return; none of them waits for a
//! network round trip. Outcomes arrive through the [`FayeObserver`] and
//! per-channel callbacks.

mod observer;
mod retry;

pub use observer::{FayeObserver, NoopObserver};

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::codec;
use crate::config::ClientConfig;
use crate::error::FayeError;
use crate::protocol::{Action, BayeuxMessage, Session, SessionEvent, Subscription, SubscriptionState};
use crate::registry::{ChannelCallback, SubscriptionRegistry};
use crate::transport::{Transport, TransportEvent, WebSocketTransport};

use retry::RetryScheduler;

/// Callback invoked once a ping frame has been handed to the transport.
pub type PingCompletion = Box<dyn FnOnce() + Send + 'static>;

/// Frame-level command on the write-ordering queue.
enum WriteCommand {
    Frame(BayeuxMessage),
    Ping(Vec<u8>, Option<PingCompletion>),
    Close,
}

/// Bayeux publish/subscribe client.
///
/// Create one with [`FayeClient::new`] or [`FayeClient::builder`], then
/// call [`connect`](Self::connect) from within a Tokio runtime. Dropping
/// the client aborts its reader, writer, and retry tasks and closes the
/// transport.
pub struct FayeClient {
    shared: Arc<ClientShared>,
    retry: Mutex<Option<RetryScheduler>>,
}

struct ClientShared {
    url: Mutex<String>,
    headers: Mutex<HashMap<String, String>>,
    retry_interval: Duration,
    transport: Arc<dyn Transport>,
    session: Mutex<Session>,
    registry: Arc<SubscriptionRegistry>,
    observer: Mutex<Arc<dyn FayeObserver>>,
    writes: Mutex<Option<mpsc::UnboundedSender<WriteCommand>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// Builder for [`FayeClient`].
pub struct FayeClientBuilder {
    config: ClientConfig,
    observer: Arc<dyn FayeObserver>,
    transport: Arc<dyn Transport>,
    initial_channels: Vec<(String, Option<ChannelCallback>)>,
}

impl FayeClientBuilder {
    fn new(url: impl Into<String>) -> Self {
        Self::from_config(ClientConfig::new(url))
    }

    /// Start from a loaded [`ClientConfig`].
    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            config,
            observer: Arc::new(NoopObserver),
            transport: Arc::new(WebSocketTransport::new()),
            initial_channels: Vec::new(),
        }
    }

    /// Add an HTTP header to the WebSocket upgrade request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.headers.insert(name.into(), value.into());
        self
    }

    /// Timeout advice (milliseconds) carried in every `/meta/connect`.
    pub fn timeout_advice_ms(mut self, timeout_ms: u64) -> Self {
        self.config.timeout_advice_ms = timeout_ms;
        self
    }

    /// Period of the pending-subscription retry timer.
    pub fn retry_interval_secs(mut self, secs: u64) -> Self {
        self.config.retry_interval_secs = secs;
        self
    }

    /// Set the session observer.
    pub fn observer(mut self, observer: Arc<dyn FayeObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Substitute the transport implementation (tests, custom backends).
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    /// Queue a subscription to flush right after the first handshake.
    pub fn initial_channel(mut self, channel: impl Into<String>) -> Self {
        self.initial_channels.push((channel.into(), None));
        self
    }

    /// Queue a subscription with a per-channel callback.
    pub fn initial_channel_with(
        mut self,
        channel: impl Into<String>,
        callback: ChannelCallback,
    ) -> Self {
        self.initial_channels.push((channel.into(), Some(callback)));
        self
    }

    /// Build the client.
    pub fn build(self) -> FayeClient {
        let registry = Arc::new(SubscriptionRegistry::new());

        for (channel, callback) in self.initial_channels {
            registry.enqueue(Subscription::new(channel.clone()));
            if let Some(callback) = callback {
                registry.register_callback(&channel, callback);
            }
        }

        let session = Session::new(Arc::clone(&registry), self.config.timeout_advice_ms);

        FayeClient {
            shared: Arc::new(ClientShared {
                url: Mutex::new(self.config.url),
                headers: Mutex::new(self.config.headers),
                retry_interval: Duration::from_secs(self.config.retry_interval_secs),
                transport: self.transport,
                session: Mutex::new(session),
                registry,
                observer: Mutex::new(self.observer),
                writes: Mutex::new(None),
                tasks: Mutex::new(Vec::new()),
            }),
            retry: Mutex::new(None),
        }
    }
}

impl FayeClient {
    /// Create a client for the given server URL with default settings.
    pub fn new(url: impl Into<String>) -> Self {
        Self::builder(url).build()
    }

    /// Start building a client.
    pub fn builder(url: impl Into<String>) -> FayeClientBuilder {
        FayeClientBuilder::new(url)
    }

    /// Open the transport and start the Bayeux handshake once it is up.
    ///
    /// A no-op while a previous attempt is still in flight. Must be called
    /// within a Tokio runtime.
    pub fn connect(&self) {
        if !self.shared.lock_session().begin_connect() {
            tracing::debug!("connect already in flight");
            return;
        }

        let url = lock_recover(&self.shared.url).clone();
        let headers = lock_recover(&self.shared.headers).clone();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        match self.shared.transport.open(&url, &headers, event_tx) {
            Ok(handle) => {
                let (write_tx, write_rx) = mpsc::unbounded_channel();
                *lock_recover(&self.shared.writes) = Some(write_tx);

                let mut tasks = lock_recover(&self.shared.tasks);
                tasks.retain(|task| !task.is_finished());
                tasks.push(tokio::spawn(writer_task(
                    handle,
                    write_rx,
                    Arc::downgrade(&self.shared),
                )));
                tasks.push(tokio::spawn(reader_task(
                    event_rx,
                    Arc::clone(&self.shared),
                )));
                drop(tasks);

                self.ensure_retry_scheduler();
            }
            Err(e) => {
                tracing::warn!("failed to open {} transport: {e}", self.shared.transport.name());
                let actions = self.shared.lock_session().handle_transport_failed(&e.to_string());
                self.shared.run_actions(actions);
            }
        }
    }

    /// Gracefully end the session: wire unsubscribes for every tracked
    /// channel, then `/meta/disconnect`.
    pub fn disconnect(&self) {
        let actions = self.shared.lock_session().disconnect();
        self.shared.run_actions(actions);
    }

    /// Subscribe to a channel, reporting the resulting lifecycle state.
    ///
    /// Idempotent: subscribing to an open or pending channel changes
    /// nothing and sends nothing.
    pub fn subscribe(&self, channel: &str) -> SubscriptionState {
        self.subscribe_inner(channel, None)
    }

    /// Subscribe with a per-channel callback. While registered, the
    /// callback exclusively receives this channel's messages; the observer
    /// sees none of them.
    pub fn subscribe_with(&self, channel: &str, callback: ChannelCallback) -> SubscriptionState {
        self.subscribe_inner(channel, Some(callback))
    }

    /// Unsubscribe from a channel and drop its callback.
    pub fn unsubscribe(&self, channel: &str) {
        let actions = self.shared.lock_session().unsubscribe(channel);
        self.shared.run_actions(actions);
    }

    /// Publish a payload to an application channel.
    ///
    /// Dropped with a log entry while the session is not connected.
    pub fn publish(&self, channel: &str, data: Value) {
        let actions = self.shared.lock_session().publish(channel, data);
        self.shared.run_actions(actions);
    }

    /// Publish a payload (argument order of the classic Faye surface).
    pub fn send(&self, data: Value, channel: &str) {
        self.publish(channel, data);
    }

    /// Queue a ping frame. `completion` runs once the frame has been
    /// handed to the transport.
    pub fn ping(&self, payload: Vec<u8>, completion: Option<PingCompletion>) {
        self.shared.enqueue_write(WriteCommand::Ping(payload, completion));
    }

    /// Whether the server has confirmed a subscription for `channel`.
    pub fn is_subscribed(&self, channel: &str) -> bool {
        self.shared.registry.is_open(channel)
    }

    /// Whether a Bayeux session is established.
    pub fn is_connected(&self) -> bool {
        self.shared.lock_session().is_connected()
    }

    /// The server-assigned clientId, if handshaken.
    pub fn client_id(&self) -> Option<String> {
        self.shared.lock_session().client_id().map(str::to_string)
    }

    /// Change the server URL. Applies when the transport next opens.
    pub fn set_server_url(&self, url: impl Into<String>) {
        *lock_recover(&self.shared.url) = url.into();
    }

    /// Replace the session observer.
    pub fn set_observer(&self, observer: Arc<dyn FayeObserver>) {
        *lock_recover(&self.shared.observer) = observer;
    }

    fn subscribe_inner(&self, channel: &str, callback: Option<ChannelCallback>) -> SubscriptionState {
        let (state, actions) = self.shared.lock_session().subscribe(channel);

        // Idempotent outcomes have no side effects, including callback
        // registration.
        if let Some(callback) = callback {
            if !matches!(
                state,
                SubscriptionState::Subscribed(_) | SubscriptionState::Pending(_)
            ) {
                self.shared.registry.register_callback(channel, callback);
            }
        }

        self.shared.run_actions(actions);
        state
    }

    fn ensure_retry_scheduler(&self) {
        let mut retry = lock_recover(&self.retry);
        if retry.is_some() {
            return;
        }

        let weak: Weak<ClientShared> = Arc::downgrade(&self.shared);
        *retry = Some(RetryScheduler::spawn(self.shared.retry_interval, move || {
            if let Some(shared) = weak.upgrade() {
                let actions = shared.lock_session().retry_pending();
                shared.run_actions(actions);
            }
        }));
    }
}

impl Drop for FayeClient {
    fn drop(&mut self) {
        // Stop the retry timer first, then the connection tasks. Dropping
        // the write queue lets the transport task observe closure and
        // shut the socket down.
        lock_recover(&self.retry).take();
        lock_recover(&self.shared.writes).take();
        for task in lock_recover(&self.shared.tasks).drain(..) {
            task.abort();
        }
    }
}

impl std::fmt::Debug for FayeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FayeClient")
            .field("url", &*lock_recover(&self.shared.url))
            .field("session", &*self.shared.lock_session())
            .field("registry", &self.shared.registry)
            .finish()
    }
}

impl ClientShared {
    fn lock_session(&self) -> MutexGuard<'_, Session> {
        lock_recover(&self.session)
    }

    fn observer(&self) -> Arc<dyn FayeObserver> {
        Arc::clone(&lock_recover(&self.observer))
    }

    /// Step the session for one transport event and execute the effects.
    fn process_event(&self, event: TransportEvent) {
        let actions = match event {
            TransportEvent::Connected => self.lock_session().handle_transport_connected(),
            TransportEvent::ConnectFailed(error) => {
                lock_recover(&self.writes).take();
                self.lock_session().handle_transport_failed(&error)
            }
            TransportEvent::Disconnected(reason) => {
                lock_recover(&self.writes).take();
                self.lock_session()
                    .handle_transport_disconnected(reason.as_deref())
            }
            TransportEvent::Text(text) => match codec::decode(&text) {
                Ok(message) => self.lock_session().handle_message(message),
                Err(e) => {
                    tracing::warn!("dropping unparseable frame: {e}");
                    return;
                }
            },
            TransportEvent::Binary(data) => match codec::decode_slice(&data) {
                Ok(message) => self.lock_session().handle_message(message),
                Err(e) => {
                    tracing::warn!("dropping unparseable binary frame: {e}");
                    return;
                }
            },
            TransportEvent::Ping(_) => {
                tracing::trace!("transport ping");
                return;
            }
            TransportEvent::Pong(_) => {
                self.observer().pong_received();
                return;
            }
            TransportEvent::WriteError(error) => {
                self.observer().write_error(&FayeError::WriteFailed(error));
                return;
            }
        };

        self.run_actions(actions);
    }

    fn run_actions(&self, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::Send(message) => self.enqueue_write(WriteCommand::Frame(message)),
                Action::CloseTransport => self.enqueue_write(WriteCommand::Close),
                Action::Notify(event) => self.notify(event),
                Action::Deliver { channel, data } => {
                    // Exclusive dispatch: a registered channel callback
                    // shadows the observer for its channel.
                    if let Some(callback) = self.registry.callback(&channel) {
                        callback(&data);
                    } else {
                        self.observer().message_received(&channel, &data);
                    }
                }
            }
        }
    }

    fn notify(&self, event: SessionEvent) {
        let observer = self.observer();
        match event {
            SessionEvent::Connected => observer.connected(),
            SessionEvent::Disconnected => observer.disconnected(),
            SessionEvent::ConnectionFailed => observer.connection_failed(),
            SessionEvent::Subscribed(channel) => observer.subscribed(&channel),
            SessionEvent::Unsubscribed(channel) => observer.unsubscribed(&channel),
            SessionEvent::SubscriptionFailed { channel, error } => {
                observer.subscription_failed(&channel, &error);
            }
        }
    }

    fn enqueue_write(&self, command: WriteCommand) {
        let writes = lock_recover(&self.writes);
        match writes.as_ref() {
            Some(queue) => {
                if queue.send(command).is_err() {
                    tracing::debug!("write dropped: writer task gone");
                }
            }
            None => tracing::debug!("write dropped: no open connection"),
        }
    }
}

/// Lock a mutex, recovering the guard if a previous holder panicked.
fn lock_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The read-ordering queue: transport events are decoded and applied to
/// the session strictly in arrival order.
async fn reader_task(
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
    shared: Arc<ClientShared>,
) {
    while let Some(event) = events.recv().await {
        shared.process_event(event);
    }
}

/// The write-ordering queue: frames are encoded and handed to the
/// transport one at a time, preserving issue order.
async fn writer_task(
    handle: crate::transport::TransportHandle,
    mut writes: mpsc::UnboundedReceiver<WriteCommand>,
    shared: Weak<ClientShared>,
) {
    while let Some(command) = writes.recv().await {
        match command {
            WriteCommand::Frame(message) => match codec::encode(&message) {
                Ok(text) => {
                    if let Err(e) = handle.write_text(text) {
                        if let Some(shared) = shared.upgrade() {
                            shared.observer().write_error(&e);
                        }
                    }
                }
                Err(e) => tracing::warn!("failed to encode outgoing frame: {e}"),
            },
            WriteCommand::Ping(payload, completion) => match handle.write_ping(payload) {
                Ok(()) => {
                    if let Some(done) = completion {
                        done();
                    }
                }
                Err(e) => {
                    if let Some(shared) = shared.upgrade() {
                        shared.observer().write_error(&e);
                    }
                }
            },
            WriteCommand::Close => {
                handle.close();
                break;
            }
        }
    }
    // Queue closed: the handle drops here and the transport task winds
    // the socket down.
}
