//! Push connections: the transport seam, the socket.io implementation,
//! keepalive timing, and the scoped connection handle.

pub mod handle;
pub mod heartbeat;
pub mod socketio;
pub mod transport;

pub use handle::{ConnectionHandle, ConnectionId};
pub use socketio::SocketIoConnector;
pub use transport::{PushConnection, PushConnector, RawEvent};
