//! Engine.IO v4 / Socket.IO v5 text framing, default namespace only.

use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use super::error::TransportError;

/// Upper bound on the ping wait, whatever the server advertises.
pub const MAX_LIVENESS_WINDOW: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    pub ping_interval: u64,
    pub ping_timeout: u64,
}

impl Handshake {
    /// How long to wait for the next server ping before the link is dead.
    pub fn liveness_window(&self) -> Duration {
        Duration::from_millis(self.ping_interval.saturating_add(self.ping_timeout))
            .min(MAX_LIVENESS_WINDOW)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Open(Handshake),
    Close,
    Ping,
    Pong,
    Noop,
    Connect(Option<Value>),
    Disconnect,
    Event { name: String, args: Vec<Value> },
    ConnectError(Value),
}

impl Packet {
    pub fn event<T: serde::Serialize>(name: &str, payload: &T) -> Result<Self, TransportError> {
        Ok(Packet::Event {
            name: name.to_string(),
            args: vec![serde_json::to_value(payload)?],
        })
    }

    pub fn parse(frame: &str) -> Result<Self, TransportError> {
        let mut chars = frame.chars();
        let kind = chars.next().ok_or(TransportError::EmptyFrame)?;
        let rest = chars.as_str();

        match kind {
            '0' => Ok(Packet::Open(serde_json::from_str(rest)?)),
            '1' => Ok(Packet::Close),
            '2' => Ok(Packet::Ping),
            '3' => Ok(Packet::Pong),
            '6' => Ok(Packet::Noop),
            '4' => parse_message(rest),
            other => Err(TransportError::UnknownPacket(other)),
        }
    }

    pub fn encode(&self) -> Result<String, TransportError> {
        let frame = match self {
            Packet::Open(h) => format!(
                "0{}",
                serde_json::json!({
                    "sid": h.sid,
                    "pingInterval": h.ping_interval,
                    "pingTimeout": h.ping_timeout,
                })
            ),
            Packet::Close => "1".to_string(),
            Packet::Ping => "2".to_string(),
            Packet::Pong => "3".to_string(),
            Packet::Noop => "6".to_string(),
            Packet::Connect(None) => "40".to_string(),
            Packet::Connect(Some(data)) => format!("40{}", data),
            Packet::Disconnect => "41".to_string(),
            Packet::Event { name, args } => {
                let mut array = Vec::with_capacity(args.len() + 1);
                array.push(Value::String(name.clone()));
                array.extend(args.iter().cloned());
                format!("42{}", serde_json::to_string(&array)?)
            }
            Packet::ConnectError(data) => format!("44{}", data),
        };
        Ok(frame)
    }
}

fn parse_message(body: &str) -> Result<Packet, TransportError> {
    let mut chars = body.chars();
    let kind = chars.next().ok_or(TransportError::EmptyFrame)?;
    let rest = strip_namespace(chars.as_str());

    match kind {
        '0' if rest.is_empty() => Ok(Packet::Connect(None)),
        '0' => Ok(Packet::Connect(Some(serde_json::from_str(rest)?))),
        '1' => Ok(Packet::Disconnect),
        '2' => {
            // Optional ack id precedes the payload array.
            let rest = rest.trim_start_matches(|c: char| c.is_ascii_digit());
            let mut values: Vec<Value> = serde_json::from_str(rest)?;
            if values.is_empty() {
                return Err(TransportError::MalformedEvent);
            }
            let name = match values.remove(0) {
                Value::String(name) => name,
                _ => return Err(TransportError::MalformedEvent),
            };
            Ok(Packet::Event { name, args: values })
        }
        '4' => Ok(Packet::ConnectError(serde_json::from_str(rest)?)),
        other => Err(TransportError::UnknownPacket(other)),
    }
}

fn strip_namespace(rest: &str) -> &str {
    if rest.starts_with('/') {
        match rest.find(',') {
            Some(idx) => &rest[idx + 1..],
            None => "",
        }
    } else {
        rest
    }
}

/// Builds the websocket endpoint for a server base url.
pub fn endpoint_url(base: &str) -> Result<String, TransportError> {
    let base = base.trim().trim_end_matches('/');
    let ws_base = if let Some(host) = base.strip_prefix("https://") {
        format!("wss://{}", host)
    } else if let Some(host) = base.strip_prefix("http://") {
        format!("ws://{}", host)
    } else if base.starts_with("wss://") || base.starts_with("ws://") {
        base.to_string()
    } else {
        return Err(TransportError::InvalidUrl(base.to_string()));
    };
    Ok(format!("{}/socket.io/?EIO=4&transport=websocket", ws_base))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_open_handshake() {
        let packet =
            Packet::parse(r#"0{"sid":"abc","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#)
                .unwrap();
        let Packet::Open(handshake) = packet else {
            panic!("expected open packet");
        };
        assert_eq!(handshake.sid, "abc");
        assert_eq!(handshake.liveness_window(), Duration::from_millis(45000));
    }

    #[test]
    fn oversized_ping_settings_are_capped() {
        let packet = Packet::parse(
            r#"0{"sid":"a","pingInterval":18446744073709551615,"pingTimeout":20000}"#,
        )
        .unwrap();
        let Packet::Open(handshake) = packet else {
            panic!("expected open packet");
        };
        assert_eq!(handshake.liveness_window(), MAX_LIVENESS_WINDOW);

        let deadline = tokio::time::Instant::now().checked_add(handshake.liveness_window());
        assert!(deadline.is_some());
    }

    #[test]
    fn parses_control_packets() {
        assert_eq!(Packet::parse("1").unwrap(), Packet::Close);
        assert_eq!(Packet::parse("2").unwrap(), Packet::Ping);
        assert_eq!(Packet::parse("3").unwrap(), Packet::Pong);
        assert_eq!(Packet::parse("41").unwrap(), Packet::Disconnect);
        assert_eq!(Packet::parse("40").unwrap(), Packet::Connect(None));
    }

    #[test]
    fn parses_namespace_connect_ack() {
        let packet = Packet::parse(r#"40{"sid":"xyz"}"#).unwrap();
        assert_eq!(packet, Packet::Connect(Some(json!({"sid": "xyz"}))));

        let packet = Packet::parse(r#"40/admin,{"sid":"xyz"}"#).unwrap();
        assert_eq!(packet, Packet::Connect(Some(json!({"sid": "xyz"}))));
    }

    #[test]
    fn parses_connect_error() {
        let packet = Packet::parse(r#"44{"message":"Not authorized"}"#).unwrap();
        assert_eq!(packet, Packet::ConnectError(json!({"message": "Not authorized"})));
    }

    #[test]
    fn parses_event_with_ack_id() {
        let packet = Packet::parse(r#"4212["busLocations",{"a":1}]"#).unwrap();
        assert_eq!(
            packet,
            Packet::Event {
                name: "busLocations".into(),
                args: vec![json!({"a": 1})],
            }
        );
    }

    #[test]
    fn encodes_update_location_event() {
        let payload = json!({"busId": "BUS7", "latitude": 12.9});
        let frame = Packet::event("updateLocation", &payload)
            .unwrap()
            .encode()
            .unwrap();
        assert!(frame.starts_with("42[\"updateLocation\","));

        let decoded = Packet::parse(&frame).unwrap();
        assert_eq!(
            decoded,
            Packet::Event {
                name: "updateLocation".into(),
                args: vec![payload],
            }
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(Packet::parse(""), Err(TransportError::EmptyFrame)));
        assert!(matches!(Packet::parse("9"), Err(TransportError::UnknownPacket('9'))));
        assert!(matches!(Packet::parse("42[]"), Err(TransportError::MalformedEvent)));
        assert!(matches!(Packet::parse("42[1]"), Err(TransportError::MalformedEvent)));
    }

    #[test]
    fn builds_endpoint_urls() {
        assert_eq!(
            endpoint_url("https://bus-tracker-server-ajmu.onrender.com").unwrap(),
            "wss://bus-tracker-server-ajmu.onrender.com/socket.io/?EIO=4&transport=websocket"
        );
        assert_eq!(
            endpoint_url("http://localhost:3000/").unwrap(),
            "ws://localhost:3000/socket.io/?EIO=4&transport=websocket"
        );
        assert_eq!(
            endpoint_url("ws://10.0.0.2:3000").unwrap(),
            "ws://10.0.0.2:3000/socket.io/?EIO=4&transport=websocket"
        );
        assert!(endpoint_url("ftp://nope").is_err());
    }
}
