//! Bayeux protocol: wire messages, subscription lifecycle, and the
//! session state machine.
//!
//! # Message Flow
//!
//! ```text
//! Client                                  Server
//!    |                                       |
//!    |-------- /meta/handshake ------------>|  advertise connection types
//!    |<------- clientId, successful --------|
//!    |                                       |
//!    |-------- /meta/connect -------------->|  keep-alive loop, chained
//!    |<------- successful ------------------|  after every response
//!    |                                       |
//!    |-------- /meta/subscribe ------------>|  one per channel
//!    |<------- subscription, successful ----|
//!    |                                       |
//!    |<======= data on open channels =======|
//!    |======== publish =====================>|
//!    |                                       |
//!    |-------- /meta/disconnect ----------->|
//! ```
//!
//! # Subscription Lifecycle
//!
//! A channel is always in at most one of three states:
//!
//! | State     | Entered when                          | Left when                   |
//! |-----------|---------------------------------------|-----------------------------|
//! | `queued`  | subscribe while session disconnected  | handshake flush             |
//! | `pending` | subscribe request sent                | server response, retry tick |
//! | `open`    | server confirmed                      | unsubscribe, teardown       |

mod channel;
mod message;
mod session;
mod subscription;

pub use channel::{is_valid_channel_name, ConnectionType, MetaChannel};
pub use message::{Advice, BayeuxMessage};
pub use session::{Action, Connectivity, Session, SessionEvent};
pub use subscription::{Subscription, SubscriptionState};

/// Bayeux protocol version advertised during handshake
pub const BAYEUX_VERSION: &str = "1.0";

/// Minimum protocol version accepted from the server
pub const BAYEUX_MINIMUM_VERSION: &str = "1.0beta";

/// Default timeout advice carried in /meta/connect (milliseconds)
pub const DEFAULT_TIMEOUT_ADVICE_MS: u64 = 10_000;

/// Default period of the pending-subscription retry timer (seconds)
pub const DEFAULT_RETRY_INTERVAL_SECS: u64 = 45;
