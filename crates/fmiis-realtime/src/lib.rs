//! # fmiis-realtime
//!
//! Real-time side of the FMIIS console. Provides:
//!
//! - socket.io packet codec and WebSocket push transport with keepalive
//! - the session-bound push channel with exponential reconnect backoff
//! - the notification ledger with optimistic read acknowledgements
//! - the notification composer (receiver lists, content templates)
//! - the console engine wiring everything to the session and route guard

pub mod channel;
pub mod connection;
pub mod engine;
pub mod message;
pub mod notification;

pub use channel::PushChannel;
pub use connection::{PushConnection, PushConnector, RawEvent, SocketIoConnector};
pub use engine::ConsoleEngine;
pub use notification::{AckState, NotificationComposer, NotificationLedger, ReceiverTarget};
