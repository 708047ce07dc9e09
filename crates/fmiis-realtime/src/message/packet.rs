//! Engine.IO and Socket.IO packet types.

use serde::{Deserialize, Serialize};

/// Default Socket.IO namespace.
pub const DEFAULT_NAMESPACE: &str = "/";

/// Engine.IO handshake sent by the server in the open packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    /// Engine.IO session id.
    pub sid: String,
    /// Transports the connection may upgrade to.
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Interval between server pings, in milliseconds.
    pub ping_interval: u64,
    /// How long the server waits for a pong, in milliseconds.
    pub ping_timeout: u64,
    /// Largest payload the server accepts, in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payload: Option<u64>,
}

/// One Engine.IO packet (one WebSocket text frame).
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    /// `0` followed by the handshake.
    Open(Handshake),
    /// `1`
    Close,
    /// `2`, sent by the server; must be answered with a pong.
    Ping,
    /// `3`
    Pong,
    /// `4` carrying a Socket.IO packet.
    Message(SocketPacket),
    /// `5`
    Upgrade,
    /// `6`
    Noop,
}

/// One Socket.IO packet.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    /// `0`: join a namespace (client) or confirm the join (server).
    Connect {
        /// Namespace.
        namespace: String,
        /// Auth payload (client) or `{"sid": ...}` (server).
        data: Option<serde_json::Value>,
    },
    /// `1`: leave a namespace.
    Disconnect {
        /// Namespace.
        namespace: String,
    },
    /// `2`: named event.
    Event {
        /// Namespace.
        namespace: String,
        /// Acknowledgement id requested by the sender.
        ack_id: Option<u64>,
        /// Event name.
        name: String,
        /// Event arguments: `None` for none, the value for one, an array for several.
        payload: Option<serde_json::Value>,
    },
    /// `3`: acknowledgement of an event.
    Ack {
        /// Namespace.
        namespace: String,
        /// Acknowledged id.
        ack_id: u64,
        /// Acknowledgement arguments.
        data: Option<serde_json::Value>,
    },
    /// `4`: the server refused the namespace join.
    ConnectError {
        /// Namespace.
        namespace: String,
        /// Error payload, usually `{"message": ...}`.
        data: Option<serde_json::Value>,
    },
}

impl SocketPacket {
    /// Join the default namespace without an auth payload.
    pub fn connect_default() -> Self {
        Self::Connect {
            namespace: DEFAULT_NAMESPACE.to_string(),
            data: None,
        }
    }

    /// Namespace the packet belongs to.
    pub fn namespace(&self) -> &str {
        match self {
            Self::Connect { namespace, .. }
            | Self::Disconnect { namespace }
            | Self::Event { namespace, .. }
            | Self::Ack { namespace, .. }
            | Self::ConnectError { namespace, .. } => namespace,
        }
    }
}
