//! Socket.IO wire packets and their text codec.

pub mod codec;
pub mod packet;

pub use codec::{decode, encode, websocket_url};
pub use packet::{EnginePacket, Handshake, SocketPacket};
