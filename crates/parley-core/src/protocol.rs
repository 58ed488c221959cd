//! Wire protocol between clients and the relay.
//!
//! Every frame is a JSON envelope:
//!
//! ```json
//! { "type": "call", "data": { "to": "quiet-moon-0042", "sdp": "..." } }
//! ```
//!
//! `data` is omitted for events that carry no payload (`failed`, `end` sent
//! by the relay, `init` sent by a client).

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::errors::ProtocolError;
use crate::ids::Identifier;

/// Payload fields of a signaling message, minus routing keys.
pub type Fields = Map<String, Value>;

#[derive(Deserialize)]
struct InboundEnvelope {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    data: Value,
}

/// An event sent by a client.
///
/// `to` is `None` when the payload omits it or it is not a string; the router
/// treats that the same as an unknown destination.
#[derive(Clone, Debug, PartialEq)]
pub enum ClientEvent {
    /// Ask the relay for an identifier.
    Init,
    /// Ask the peer `to` to call back.
    Request {
        /// Destination identifier.
        to: Option<String>,
    },
    /// Forward signaling fields to the peer `to`.
    Call {
        /// Destination identifier.
        to: Option<String>,
        /// Every payload field except `to`.
        fields: Fields,
    },
    /// Tell the peer `to` the call is over.
    End {
        /// Destination identifier.
        to: Option<String>,
    },
}

impl ClientEvent {
    /// Parse one text frame.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let envelope: InboundEnvelope = serde_json::from_str(text)?;
        let Some(kind) = envelope.kind else {
            return Err(ProtocolError::MissingType);
        };
        // init carries no payload, so whatever came with it is ignored.
        if kind == "init" {
            return Ok(Self::Init);
        }
        let mut payload = match envelope.data {
            Value::Null => Map::new(),
            Value::Object(map) => map,
            _ => return Err(ProtocolError::InvalidPayload { event: kind }),
        };

        match kind.as_str() {
            "request" => Ok(Self::Request {
                to: take_destination(&mut payload),
            }),
            "call" => {
                let to = take_destination(&mut payload);
                Ok(Self::Call {
                    to,
                    fields: payload,
                })
            }
            "end" => Ok(Self::End {
                to: take_destination(&mut payload),
            }),
            other => Err(ProtocolError::UnknownEvent(other.to_owned())),
        }
    }

    /// Event name as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Request { .. } => "request",
            Self::Call { .. } => "call",
            Self::End { .. } => "end",
        }
    }
}

fn take_destination(payload: &mut Fields) -> Option<String> {
    match payload.remove("to") {
        Some(Value::String(to)) => Some(to),
        _ => None,
    }
}

/// An event sent by the relay to one client.
#[derive(Clone, Debug, PartialEq)]
pub enum ServerEvent {
    /// The identifier assigned to the receiving client.
    Init {
        /// Assigned identifier.
        id: Identifier,
    },
    /// Peer `from` asks the receiver to call back.
    Request {
        /// Sender identifier.
        from: Identifier,
    },
    /// Signaling fields forwarded from peer `from`.
    Call {
        /// Sender identifier.
        from: Identifier,
        /// Sender's payload without `to`.
        fields: Fields,
    },
    /// A `call` could not be delivered.
    Failed,
    /// The peer ended the call.
    End,
}

impl ServerEvent {
    /// Event name as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::Request { .. } => "request",
            Self::Call { .. } => "call",
            Self::Failed => "failed",
            Self::End => "end",
        }
    }

    /// Build the JSON envelope.
    pub fn to_value(&self) -> Value {
        let data = match self {
            Self::Init { id } => Some(single("id", id)),
            Self::Request { from } => Some(single("from", from)),
            Self::Call { from, fields } => {
                let mut data = fields.clone();
                // The relay's view of the sender wins over anything the client claimed.
                let _ = data.insert("from".into(), Value::String(from.to_string()));
                Some(data)
            }
            Self::Failed | Self::End => None,
        };

        let mut envelope = Map::new();
        let _ = envelope.insert("type".into(), Value::String(self.name().into()));
        if let Some(data) = data {
            let _ = envelope.insert("data".into(), Value::Object(data));
        }
        Value::Object(envelope)
    }

    /// Serialize the envelope to a text frame.
    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }
}

fn single(key: &str, id: &Identifier) -> Fields {
    let mut map = Map::new();
    let _ = map.insert(key.into(), Value::String(id.to_string()));
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn parse_init_without_data() {
        assert_eq!(ClientEvent::parse(r#"{"type":"init"}"#).unwrap(), ClientEvent::Init);
    }

    #[test]
    fn parse_init_ignores_payload() {
        let event = ClientEvent::parse(r#"{"type":"init","data":{"x":1}}"#).unwrap();
        assert_eq!(event, ClientEvent::Init);
    }

    #[test]
    fn parse_init_ignores_non_object_payload() {
        assert_eq!(ClientEvent::parse(r#"{"type":"init","data":"x"}"#).unwrap(), ClientEvent::Init);
        assert_eq!(ClientEvent::parse(r#"{"type":"init","data":[1]}"#).unwrap(), ClientEvent::Init);
    }

    #[test]
    fn parse_request() {
        let event = ClientEvent::parse(r#"{"type":"request","data":{"to":"dark-sea-0001"}}"#).unwrap();
        assert_eq!(
            event,
            ClientEvent::Request {
                to: Some("dark-sea-0001".into())
            }
        );
    }

    #[test]
    fn parse_call_strips_to_and_keeps_fields() {
        let event = ClientEvent::parse(
            r#"{"type":"call","data":{"to":"dark-sea-0001","sdp":"abc","candidate":{"m":0}}}"#,
        )
        .unwrap();
        assert_matches!(event, ClientEvent::Call { to, fields } => {
            assert_eq!(to.as_deref(), Some("dark-sea-0001"));
            assert!(!fields.contains_key("to"));
            assert_eq!(fields["sdp"], "abc");
            assert_eq!(fields["candidate"]["m"], 0);
        });
    }

    #[test]
    fn missing_to_is_none() {
        let event = ClientEvent::parse(r#"{"type":"end","data":{}}"#).unwrap();
        assert_eq!(event, ClientEvent::End { to: None });
        let event = ClientEvent::parse(r#"{"type":"end"}"#).unwrap();
        assert_eq!(event, ClientEvent::End { to: None });
    }

    #[test]
    fn non_string_to_is_none() {
        let event = ClientEvent::parse(r#"{"type":"call","data":{"to":42,"sdp":"x"}}"#).unwrap();
        assert_matches!(event, ClientEvent::Call { to: None, fields } => {
            assert!(!fields.contains_key("to"));
        });
    }

    #[test]
    fn unknown_event_rejected() {
        let err = ClientEvent::parse(r#"{"type":"hangup"}"#).unwrap_err();
        assert_matches!(err, ProtocolError::UnknownEvent(name) if name == "hangup");
    }

    #[test]
    fn non_object_payload_rejected() {
        let err = ClientEvent::parse(r#"{"type":"call","data":[1,2]}"#).unwrap_err();
        assert_matches!(err, ProtocolError::InvalidPayload { event } if event == "call");
    }

    #[test]
    fn garbage_rejected() {
        assert_matches!(ClientEvent::parse("not json"), Err(ProtocolError::InvalidJson(_)));
        assert_matches!(ClientEvent::parse("42"), Err(ProtocolError::InvalidJson(_)));
        assert_matches!(ClientEvent::parse(r#"{"type":7}"#), Err(ProtocolError::InvalidJson(_)));
    }

    #[test]
    fn missing_type_rejected() {
        assert_matches!(ClientEvent::parse(r#"{"data":{}}"#), Err(ProtocolError::MissingType));
        assert_matches!(ClientEvent::parse("{}"), Err(ProtocolError::MissingType));
    }

    #[test]
    fn init_reply_envelope() {
        let event = ServerEvent::Init {
            id: Identifier::from("quiet-moon-0042"),
        };
        assert_eq!(
            event.to_value(),
            json!({"type": "init", "data": {"id": "quiet-moon-0042"}})
        );
    }

    #[test]
    fn request_envelope_carries_from() {
        let event = ServerEvent::Request {
            from: Identifier::from("a"),
        };
        assert_eq!(event.to_value(), json!({"type": "request", "data": {"from": "a"}}));
    }

    #[test]
    fn call_envelope_overwrites_client_from() {
        let mut fields = Fields::new();
        let _ = fields.insert("sdp".into(), json!("abc"));
        let _ = fields.insert("from".into(), json!("spoofed"));
        let event = ServerEvent::Call {
            from: Identifier::from("real"),
            fields,
        };
        assert_eq!(
            event.to_value(),
            json!({"type": "call", "data": {"sdp": "abc", "from": "real"}})
        );
    }

    #[test]
    fn bare_events_have_no_data() {
        assert_eq!(ServerEvent::Failed.to_value(), json!({"type": "failed"}));
        assert_eq!(ServerEvent::End.to_json(), r#"{"type":"end"}"#);
    }

    #[test]
    fn names_match_wire() {
        assert_eq!(ClientEvent::Init.name(), "init");
        assert_eq!(ClientEvent::End { to: None }.name(), "end");
        assert_eq!(ServerEvent::Failed.name(), "failed");
    }
}
