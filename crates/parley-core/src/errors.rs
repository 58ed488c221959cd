//! Error types shared by the relay crates.

use thiserror::Error;

/// A client frame that could not be turned into a [`ClientEvent`].
///
/// [`ClientEvent`]: crate::protocol::ClientEvent
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The frame was not valid JSON or not an envelope object.
    #[error("invalid frame: {0}")]
    InvalidJson(#[from] serde_json::Error),
    /// The envelope has no `type` field.
    #[error("frame has no type")]
    MissingType,
    /// The envelope named an event the relay does not handle.
    #[error("unknown event: {0}")]
    UnknownEvent(String),
    /// The envelope carried a payload that is not a JSON object.
    #[error("payload for {event} must be an object")]
    InvalidPayload {
        /// Event name from the envelope.
        event: String,
    },
}

/// Registry failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Every candidate identifier was already taken.
    #[error("no free identifier after {attempts} attempts")]
    Exhausted {
        /// How many candidates were tried.
        attempts: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_event_display() {
        let err = ProtocolError::UnknownEvent("hangup".into());
        assert_eq!(err.to_string(), "unknown event: hangup");
    }

    #[test]
    fn missing_type_display() {
        assert_eq!(ProtocolError::MissingType.to_string(), "frame has no type");
    }

    #[test]
    fn invalid_payload_display() {
        let err = ProtocolError::InvalidPayload { event: "call".into() };
        assert!(err.to_string().contains("call"));
    }

    #[test]
    fn json_error_converts() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ProtocolError = json_err.into();
        assert!(matches!(err, ProtocolError::InvalidJson(_)));
        assert!(err.to_string().starts_with("invalid frame"));
    }

    #[test]
    fn exhausted_display() {
        let err = RegistryError::Exhausted { attempts: 64 };
        assert_eq!(err.to_string(), "no free identifier after 64 attempts");
    }
}
