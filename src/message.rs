//! Wire protocol definitions
//!
//! Plain UTF-8 text frames with a colon separator, matching both ends of
//! the relay. One socket write carries one logical message; there is no
//! length-prefixing.

use crate::error::FrameError;

/// Client-originated graceful leave notice (no payload)
pub const CLIENT_DISCONNECT: &str = "CLIENT_DISCONNECT";

/// Server-originated shutdown notice (no payload)
pub const SERVER_SHUTDOWN: &str = "SERVER_SHUTDOWN";

/// Prefix reserved for server-to-client informational notices
pub const SYSTEM_PREFIX: &str = "SYSTEM:";

/// A single application message
///
/// `Join` and `Leave` are an encode-side distinction: both serialize as
/// `SYSTEM:` notices, and decoding any `SYSTEM:` frame yields `System`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Chat message: serializes as `<sender>:<body>`
    Chat { sender: String, body: String },
    /// Informational notice: serializes as `SYSTEM:<text>`
    System(String),
    /// A client joined: serializes as `SYSTEM:<name> has joined the chat`
    Join { name: String },
    /// A client left: serializes as `SYSTEM:<name> has left the chat`
    Leave { name: String },
    /// Client-to-server graceful disconnect token
    Disconnect,
    /// Server-to-client shutdown token
    Shutdown,
}

impl Message {
    /// Serialize this message to its wire form
    pub fn encode(&self) -> String {
        match self {
            Message::Chat { sender, body } => format!("{}:{}", sender, body),
            Message::System(text) => format!("{}{}", SYSTEM_PREFIX, text),
            Message::Join { name } => {
                format!("{}{} has joined the chat", SYSTEM_PREFIX, name)
            }
            Message::Leave { name } => {
                format!("{}{} has left the chat", SYSTEM_PREFIX, name)
            }
            Message::Disconnect => CLIENT_DISCONNECT.to_string(),
            Message::Shutdown => SERVER_SHUTDOWN.to_string(),
        }
    }

    /// Parse a raw frame into a message
    ///
    /// Control tokens are matched exactly before any colon-splitting, so a
    /// client named `CLIENT_DISCONNECT` cannot exist but a chat body may
    /// contain the token text. A frame with no colon that is not a control
    /// token is unroutable and rejected.
    pub fn decode(raw: &str) -> Result<Message, FrameError> {
        if raw == CLIENT_DISCONNECT {
            return Ok(Message::Disconnect);
        }
        if raw == SERVER_SHUTDOWN {
            return Ok(Message::Shutdown);
        }
        if let Some(text) = raw.strip_prefix(SYSTEM_PREFIX) {
            return Ok(Message::System(text.to_string()));
        }
        // Chat format: "<name>:<body>", first colon separates
        match raw.split_once(':') {
            Some((sender, body)) => Ok(Message::Chat {
                sender: sender.to_string(),
                body: body.to_string(),
            }),
            None => Err(FrameError::Malformed(raw.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_round_trip_with_colons_in_body() {
        let original = Message::Chat {
            sender: "Alice".to_string(),
            body: "meet at 10:30: ok?".to_string(),
        };
        let decoded = Message::decode(&original.encode()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_control_tokens_exact_match() {
        assert_eq!(Message::decode("CLIENT_DISCONNECT").unwrap(), Message::Disconnect);
        assert_eq!(Message::decode("SERVER_SHUTDOWN").unwrap(), Message::Shutdown);
    }

    #[test]
    fn test_token_text_inside_chat_body_is_chat() {
        let msg = Message::decode("Alice:CLIENT_DISCONNECT").unwrap();
        match msg {
            Message::Chat { sender, body } => {
                assert_eq!(sender, "Alice");
                assert_eq!(body, "CLIENT_DISCONNECT");
            }
            _ => panic!("Wrong variant"),
        }
    }

    #[test]
    fn test_system_prefix_decodes_to_system() {
        let msg = Message::decode("SYSTEM:Bob has joined the chat").unwrap();
        assert_eq!(msg, Message::System("Bob has joined the chat".to_string()));
    }

    #[test]
    fn test_join_leave_encode_as_system_notices() {
        let join = Message::Join { name: "Bob".to_string() };
        assert_eq!(join.encode(), "SYSTEM:Bob has joined the chat");

        let leave = Message::Leave { name: "Alice".to_string() };
        assert_eq!(leave.encode(), "SYSTEM:Alice has left the chat");
    }

    #[test]
    fn test_no_colon_is_malformed() {
        let err = Message::decode("hello there").unwrap_err();
        assert!(matches!(err, FrameError::Malformed(_)));
    }
}
