//! Text encoding of Engine.IO v4 / Socket.IO v5 packets.
//!
//! Binary attachments are not supported; the console backend only emits
//! JSON events.

use fmiis_core::error::{AppError, ErrorKind};
use fmiis_core::result::AppResult;

use super::packet::{DEFAULT_NAMESPACE, EnginePacket, SocketPacket};

/// Socket.IO mount path appended to the configured endpoint.
pub const SOCKET_IO_PATH: &str = "/socket.io/";

/// Builds the WebSocket URL for an endpoint such as `https://host:5000`.
///
/// `http` becomes `ws` and `https` becomes `wss`; a `ws`/`wss` endpoint is
/// kept. A path already ending in `/socket.io/` is not repeated.
pub fn websocket_url(endpoint: &str) -> AppResult<String> {
    let endpoint = endpoint.trim();
    let (scheme, rest) = endpoint
        .split_once("://")
        .ok_or_else(|| AppError::configuration(format!("Push endpoint '{endpoint}' has no scheme")))?;

    let scheme = match scheme.to_ascii_lowercase().as_str() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(AppError::configuration(format!(
                "Unsupported push endpoint scheme '{other}'"
            )));
        }
    };

    let rest = rest.split(['?', '#']).next().unwrap_or_default();
    if rest.is_empty() || rest.starts_with('/') {
        return Err(AppError::configuration(format!(
            "Push endpoint '{endpoint}' has no host"
        )));
    }

    let base = rest.trim_end_matches('/');
    let path = if base.ends_with(SOCKET_IO_PATH.trim_end_matches('/')) {
        format!("{base}/")
    } else {
        format!("{base}{SOCKET_IO_PATH}")
    };
    Ok(format!("{scheme}://{path}?EIO=4&transport=websocket"))
}

/// Decodes one WebSocket text frame.
pub fn decode(frame: &str) -> AppResult<EnginePacket> {
    let mut chars = frame.chars();
    let kind = chars
        .next()
        .ok_or_else(|| malformed("empty frame"))?;
    let body = chars.as_str();

    match kind {
        '0' => {
            let handshake = serde_json::from_str(body).map_err(|e| {
                AppError::with_source(ErrorKind::Serialization, "Malformed open packet", e)
            })?;
            Ok(EnginePacket::Open(handshake))
        }
        '1' => Ok(EnginePacket::Close),
        '2' => Ok(EnginePacket::Ping),
        '3' => Ok(EnginePacket::Pong),
        '4' => decode_socket(body).map(EnginePacket::Message),
        '5' => Ok(EnginePacket::Upgrade),
        '6' => Ok(EnginePacket::Noop),
        other => Err(malformed(format!("unknown engine packet type '{other}'"))),
    }
}

/// Encodes one packet as a WebSocket text frame.
pub fn encode(packet: &EnginePacket) -> AppResult<String> {
    Ok(match packet {
        EnginePacket::Open(handshake) => format!("0{}", serde_json::to_string(handshake)?),
        EnginePacket::Close => "1".to_string(),
        EnginePacket::Ping => "2".to_string(),
        EnginePacket::Pong => "3".to_string(),
        EnginePacket::Message(socket) => format!("4{}", encode_socket(socket)?),
        EnginePacket::Upgrade => "5".to_string(),
        EnginePacket::Noop => "6".to_string(),
    })
}

fn decode_socket(body: &str) -> AppResult<SocketPacket> {
    let mut chars = body.chars();
    let kind = chars
        .next()
        .ok_or_else(|| malformed("empty socket packet"))?;
    let mut rest = chars.as_str();

    let mut namespace = DEFAULT_NAMESPACE.to_string();
    if rest.starts_with('/') {
        let (ns, tail) = rest.split_once(',').unwrap_or((rest, ""));
        namespace = ns.to_string();
        rest = tail;
    }

    let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    let ack_id = if digits > 0 {
        let id = rest[..digits]
            .parse::<u64>()
            .map_err(|_| malformed("ack id out of range"))?;
        rest = &rest[digits..];
        Some(id)
    } else {
        None
    };

    let data = if rest.is_empty() {
        None
    } else {
        Some(serde_json::from_str::<serde_json::Value>(rest).map_err(|e| {
            AppError::with_source(ErrorKind::Serialization, "Malformed socket packet payload", e)
        })?)
    };

    match kind {
        '0' => Ok(SocketPacket::Connect { namespace, data }),
        '1' => Ok(SocketPacket::Disconnect { namespace }),
        '2' => {
            let (name, payload) = split_event(data)?;
            Ok(SocketPacket::Event {
                namespace,
                ack_id,
                name,
                payload,
            })
        }
        '3' => Ok(SocketPacket::Ack {
            namespace,
            ack_id: ack_id.ok_or_else(|| malformed("ack without id"))?,
            data,
        }),
        '4' => Ok(SocketPacket::ConnectError { namespace, data }),
        '5' | '6' => Err(malformed("binary packets are not supported")),
        other => Err(malformed(format!("unknown socket packet type '{other}'"))),
    }
}

fn split_event(
    data: Option<serde_json::Value>,
) -> AppResult<(String, Option<serde_json::Value>)> {
    let Some(serde_json::Value::Array(mut args)) = data else {
        return Err(malformed("event payload is not an array"));
    };
    if args.is_empty() {
        return Err(malformed("event without a name"));
    }
    let name = match args.remove(0) {
        serde_json::Value::String(name) => name,
        _ => return Err(malformed("event name is not a string")),
    };
    let payload = match args.len() {
        0 => None,
        1 => args.pop(),
        _ => Some(serde_json::Value::Array(args)),
    };
    Ok((name, payload))
}

fn encode_socket(packet: &SocketPacket) -> AppResult<String> {
    let mut out = String::new();
    let (kind, data) = match packet {
        SocketPacket::Connect { data, .. } => ('0', data.clone()),
        SocketPacket::Disconnect { .. } => ('1', None),
        SocketPacket::Event { name, payload, .. } => {
            let mut args = vec![serde_json::Value::String(name.clone())];
            match payload {
                Some(serde_json::Value::Array(items)) => args.extend(items.iter().cloned()),
                Some(value) => args.push(value.clone()),
                None => {}
            }
            ('2', Some(serde_json::Value::Array(args)))
        }
        SocketPacket::Ack { data, .. } => ('3', data.clone()),
        SocketPacket::ConnectError { data, .. } => ('4', data.clone()),
    };
    out.push(kind);

    let namespace = packet.namespace();
    if namespace != DEFAULT_NAMESPACE {
        out.push_str(namespace);
        out.push(',');
    }

    match packet {
        SocketPacket::Event {
            ack_id: Some(id), ..
        }
        | SocketPacket::Ack { ack_id: id, .. } => out.push_str(&id.to_string()),
        _ => {}
    }

    if let Some(data) = data {
        out.push_str(&serde_json::to_string(&data)?);
    }
    Ok(out)
}

fn malformed(reason: impl std::fmt::Display) -> AppError {
    AppError::new(
        ErrorKind::Serialization,
        format!("Malformed push packet: {reason}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_websocket_url() {
        assert_eq!(
            websocket_url("http://localhost:5000").unwrap(),
            "ws://localhost:5000/socket.io/?EIO=4&transport=websocket"
        );
        assert_eq!(
            websocket_url("https://api.fmiis.example/").unwrap(),
            "wss://api.fmiis.example/socket.io/?EIO=4&transport=websocket"
        );
        assert_eq!(
            websocket_url("wss://h/socket.io/").unwrap(),
            "wss://h/socket.io/?EIO=4&transport=websocket"
        );
        assert!(websocket_url("localhost:5000").is_err());
        assert!(websocket_url("ftp://h").is_err());
        assert!(websocket_url("http://").is_err());
    }

    #[test]
    fn test_decode_open() {
        let frame = r#"0{"sid":"abc","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;
        match decode(frame).unwrap() {
            EnginePacket::Open(h) => {
                assert_eq!(h.sid, "abc");
                assert_eq!(h.ping_interval, 25_000);
                assert_eq!(h.ping_timeout, 20_000);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_decode_event_with_payload() {
        let packet = decode(r#"42["new_notification",{"id":"n1"}]"#).unwrap();
        assert_eq!(
            packet,
            EnginePacket::Message(SocketPacket::Event {
                namespace: "/".to_string(),
                ack_id: None,
                name: "new_notification".to_string(),
                payload: Some(json!({"id": "n1"})),
            })
        );
    }

    #[test]
    fn test_decode_event_namespace_and_ack() {
        let packet = decode(r#"42/admin,7["employee_created"]"#).unwrap();
        assert_eq!(
            packet,
            EnginePacket::Message(SocketPacket::Event {
                namespace: "/admin".to_string(),
                ack_id: Some(7),
                name: "employee_created".to_string(),
                payload: None,
            })
        );
    }

    #[test]
    fn test_decode_connect_ack_and_error() {
        assert!(matches!(
            decode(r#"40{"sid":"s1"}"#).unwrap(),
            EnginePacket::Message(SocketPacket::Connect { .. })
        ));
        assert!(matches!(
            decode(r#"44{"message":"Not authorized"}"#).unwrap(),
            EnginePacket::Message(SocketPacket::ConnectError { .. })
        ));
    }

    #[test]
    fn test_decode_control_packets() {
        assert_eq!(decode("2").unwrap(), EnginePacket::Ping);
        assert_eq!(decode("1").unwrap(), EnginePacket::Close);
        assert_eq!(decode("6").unwrap(), EnginePacket::Noop);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode("").is_err());
        assert!(decode("9").is_err());
        assert!(decode("42{\"not\":\"array\"}").is_err());
        assert!(decode("42[1]").is_err());
        assert!(decode("451-[\"bin\"]").is_err());
    }

    #[test]
    fn test_encode_client_packets() {
        assert_eq!(
            encode(&EnginePacket::Message(SocketPacket::connect_default())).unwrap(),
            "40"
        );
        assert_eq!(encode(&EnginePacket::Pong).unwrap(), "3");
        let event = EnginePacket::Message(SocketPacket::Event {
            namespace: "/".to_string(),
            ack_id: Some(3),
            name: "join".to_string(),
            payload: Some(json!({"email": "a@x.com"})),
        });
        assert_eq!(encode(&event).unwrap(), r#"423["join",{"email":"a@x.com"}]"#);
    }
}
