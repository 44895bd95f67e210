//! Chat transport subsystem.
//!
//! # Data Flow
//! ```text
//! Bot API (long poll)
//!     → telegram.rs (getUpdates, parse, extract payload)
//!     → MessageHandler::handle (one task per message)
//!     → ReplySink::send (sendMessage back to the chat)
//! ```
//!
//! # Design Decisions
//! - The handler is registered once and invoked concurrently
//! - Poll errors are retried with backoff; they never stop the bot
//! - Shutdown stops polling first, then waits for in-flight handlers

pub mod message;
pub mod telegram;

use async_trait::async_trait;
use thiserror::Error;

pub use message::{InboundMessage, Sender};
pub use telegram::{TelegramClient, TelegramPoller};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Bot API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Bot API rejected {method}: {description}")]
    Api {
        method: &'static str,
        description: String,
    },

    #[error("invalid Bot API URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Delivers the reply for one inbound message.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), TransportError>;
}

/// Callback the transport invokes for every inbound message.
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    async fn handle(
        &self,
        message: InboundMessage,
        reply: &dyn ReplySink,
    ) -> Result<(), TransportError>;
}
