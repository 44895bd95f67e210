//! Transport-neutral inbound message.

/// Who sent a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub id: i64,
    /// Username, or first name when the account has no username.
    pub display_name: String,
}

/// One inbound chat message, consumed once by the message handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub sender: Sender,
    /// Chat the reply is delivered to.
    pub chat_id: i64,
    /// Raw message text as typed.
    pub text: String,
    /// Argument of an entry command (`/start hello` → `hello`).
    pub payload: Option<String>,
}

impl InboundMessage {
    /// Plain text message from `sender` in their private chat.
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            chat_id: sender.id,
            sender,
            text: text.into(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }
}
