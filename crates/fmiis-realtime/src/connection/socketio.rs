//! socket.io client over a WebSocket.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};

use fmiis_core::error::{AppError, ErrorKind};
use fmiis_core::result::AppResult;
use fmiis_entity::Identity;

use crate::message::{EnginePacket, SocketPacket, decode, encode, websocket_url};

use super::heartbeat::Heartbeat;
use super::transport::{PushConnection, PushConnector, RawEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens socket.io connections with the `websocket` transport only.
#[derive(Debug, Clone)]
pub struct SocketIoConnector {
    /// Bound on the TCP/TLS/WebSocket/namespace handshake.
    handshake_timeout: Duration,
}

impl Default for SocketIoConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl SocketIoConnector {
    /// Creates a connector with a 10 second handshake timeout.
    pub fn new() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(10),
        }
    }

    /// Overrides the handshake timeout.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }
}

#[async_trait]
impl PushConnector for SocketIoConnector {
    async fn connect(
        &self,
        endpoint: &str,
        identity: &Identity,
    ) -> AppResult<Box<dyn PushConnection>> {
        let url = websocket_url(endpoint)?;
        debug!(url = %url, email = %identity.email, "Opening push connection");

        let connection = time::timeout(self.handshake_timeout, async {
            let (stream, _response) = connect_async(url.as_str()).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Connection,
                    format!("Push connect to '{url}' failed: {e}"),
                    e,
                )
            })?;
            let mut connection = SocketIoConnection {
                stream,
                sid: String::new(),
                heartbeat: Heartbeat::default(),
            };
            connection.handshake().await?;
            Ok::<_, AppError>(connection)
        })
        .await
        .map_err(|_| AppError::connection("Push handshake timed out"))??;

        Ok(Box::new(connection))
    }
}

/// A joined socket.io connection on the default namespace.
pub struct SocketIoConnection {
    stream: WsStream,
    sid: String,
    heartbeat: Heartbeat,
}

impl std::fmt::Debug for SocketIoConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketIoConnection")
            .field("sid", &self.sid)
            .field("heartbeat", &self.heartbeat)
            .finish()
    }
}

impl SocketIoConnection {
    /// Engine.IO session id.
    pub fn sid(&self) -> &str {
        &self.sid
    }

    async fn handshake(&mut self) -> AppResult<()> {
        match self.read_packet().await? {
            Some(EnginePacket::Open(handshake)) => {
                self.heartbeat = Heartbeat::from_handshake(&handshake);
                self.sid = handshake.sid;
            }
            Some(other) => {
                return Err(AppError::connection(format!(
                    "Expected open packet, got {other:?}"
                )));
            }
            None => return Err(AppError::connection("Push connection closed during handshake")),
        }

        self.send(&EnginePacket::Message(SocketPacket::connect_default()))
            .await?;

        loop {
            match self.read_packet().await? {
                Some(EnginePacket::Message(SocketPacket::Connect { .. })) => {
                    debug!(sid = %self.sid, "Push namespace joined");
                    return Ok(());
                }
                Some(EnginePacket::Message(SocketPacket::ConnectError { data, .. })) => {
                    let reason = data
                        .as_ref()
                        .and_then(|d| d.get("message"))
                        .and_then(|m| m.as_str())
                        .unwrap_or("refused")
                        .to_string();
                    return Err(AppError::connection(format!(
                        "Push namespace join refused: {reason}"
                    )));
                }
                Some(EnginePacket::Ping) => self.send(&EnginePacket::Pong).await?,
                Some(EnginePacket::Close) | None => {
                    return Err(AppError::connection("Push connection closed during handshake"));
                }
                Some(other) => trace!(packet = ?other, "Ignoring packet before namespace join"),
            }
        }
    }

    /// Next decodable packet; `None` once the socket is closed.
    async fn read_packet(&mut self) -> AppResult<Option<EnginePacket>> {
        loop {
            let next = time::timeout(self.heartbeat.deadline(), self.stream.next())
                .await
                .map_err(|_| AppError::connection("Push heartbeat timed out"))?;

            let text = match next {
                None | Some(Ok(Message::Close(_))) => return Ok(None),
                Some(Err(e)) => {
                    return Err(AppError::with_source(
                        ErrorKind::Connection,
                        format!("Push connection error: {e}"),
                        e,
                    ));
                }
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(_)) => continue,
            };

            match decode(text.as_str()) {
                Ok(packet) => return Ok(Some(packet)),
                Err(e) => debug!(error = %e, "Dropping malformed push frame"),
            }
        }
    }

    async fn send(&mut self, packet: &EnginePacket) -> AppResult<()> {
        let frame = encode(packet)?;
        self.stream
            .send(Message::Text(frame.into()))
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Connection, format!("Push send failed: {e}"), e)
            })
    }
}

#[async_trait]
impl PushConnection for SocketIoConnection {
    async fn next_event(&mut self) -> AppResult<Option<RawEvent>> {
        loop {
            match self.read_packet().await? {
                None | Some(EnginePacket::Close) => return Ok(None),
                Some(EnginePacket::Ping) => self.send(&EnginePacket::Pong).await?,
                Some(EnginePacket::Message(SocketPacket::Event { name, payload, .. })) => {
                    return Ok(Some(RawEvent::new(name, payload)));
                }
                Some(EnginePacket::Message(SocketPacket::Disconnect { .. })) => {
                    debug!(sid = %self.sid, "Server left the push namespace");
                    return Ok(None);
                }
                Some(other) => trace!(packet = ?other, "Ignoring push packet"),
            }
        }
    }

    async fn close(&mut self) {
        let leave = EnginePacket::Message(SocketPacket::Disconnect {
            namespace: crate::message::packet::DEFAULT_NAMESPACE.to_string(),
        });
        if let Err(e) = self.send(&leave).await {
            trace!(error = %e, "Failed to send namespace disconnect");
        }
        if let Err(e) = self.stream.close(None).await {
            trace!(error = %e, "Failed to close push socket");
        }
    }
}
