//! Codec trait and implementations for turning messages into text frames.
//!
//! The server only needs "something that implements [`Codec`]". Today that
//! is [`JsonCodec`], which is what browser clients speak.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes Rust values into text frames and decodes them back.
///
/// `Send + Sync + 'static` because a single codec lives in the shared
/// server state and is used from every connection task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a text frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the value can't be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Deserializes a text frame into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the frame is malformed or
    /// doesn't match the expected shape.
    fn decode<T: DeserializeOwned>(&self, frame: &str) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ```rust
/// use gameshow_protocol::{ClientMessage, Codec, JsonCodec};
///
/// let codec = JsonCodec;
/// let msg: ClientMessage = codec.decode(r#"{"type":"start_game"}"#).unwrap();
/// assert_eq!(msg, ClientMessage::StartGame);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, frame: &str) -> Result<T, ProtocolError> {
        serde_json::from_str(frame).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{ClientMessage, ServerMessage};

    #[test]
    fn test_json_codec_decodes_client_message() {
        let msg: ClientMessage = JsonCodec
            .decode(r#"{"type":"select_pack","packId":"geo"}"#)
            .unwrap();
        assert_eq!(msg, ClientMessage::SelectPack { pack_id: "geo".into() });
    }

    #[test]
    fn test_json_codec_encodes_server_message_as_text() {
        let text = JsonCodec.encode(&ServerMessage::GameEnded).unwrap();
        assert_eq!(text, r#"{"type":"game_ended"}"#);
    }

    #[test]
    fn test_json_codec_rejects_garbage() {
        let result: Result<ClientMessage, _> = JsonCodec.decode("not json at all");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_json_codec_rejects_missing_field() {
        // join_session without a name is a protocol error, not a default.
        let result: Result<ClientMessage, _> =
            JsonCodec.decode(r#"{"type":"join_session","code":"ABC123"}"#);
        assert!(result.is_err());
    }
}
