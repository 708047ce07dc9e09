//! Engine.IO keepalive timing.
//!
//! The server pings; the client answers with a pong and treats a silence
//! longer than `ping_interval + ping_timeout` as a dead connection.

use std::time::Duration;

use crate::message::Handshake;

/// Keepalive timing negotiated in the open packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    /// Interval between server pings.
    pub ping_interval: Duration,
    /// Grace period for a late ping.
    pub ping_timeout: Duration,
}

impl Default for Heartbeat {
    /// Engine.IO v4 server defaults.
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_millis(25_000),
            ping_timeout: Duration::from_millis(20_000),
        }
    }
}

impl Heartbeat {
    /// Timing announced by the server.
    pub fn from_handshake(handshake: &Handshake) -> Self {
        Self {
            ping_interval: Duration::from_millis(handshake.ping_interval),
            ping_timeout: Duration::from_millis(handshake.ping_timeout),
        }
    }

    /// Longest the client waits for any frame before giving up.
    pub fn deadline(&self) -> Duration {
        self.ping_interval + self.ping_timeout
    }
}
