//! Command normalization and selection.

use std::fmt;

use crate::transport::InboundMessage;

/// Leading marker of a chat command.
pub const COMMAND_MARKER: char = '/';

/// The closed set of commands the bot answers.
///
/// Doubles as the `command` metric label, so anything unrecognised collapses
/// into [`Command::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Hello,
    Time,
    Unknown,
}

impl Command {
    /// Select the command for already normalized text.
    pub fn from_normalized(text: &str) -> Self {
        match text {
            "hello" => Command::Hello,
            "time" => Command::Time,
            _ => Command::Unknown,
        }
    }

    /// Normalize and select the command for an inbound message.
    pub fn resolve(message: &InboundMessage) -> Self {
        Self::from_normalized(&normalize(message.payload.as_deref(), &message.text))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Command::Hello => "hello",
            Command::Time => "time",
            Command::Unknown => "unknown",
        }
    }

    /// Name of the span wrapping this command's execution.
    pub fn span_name(self) -> &'static str {
        match self {
            Command::Hello => "command_hello",
            Command::Time => "command_time",
            Command::Unknown => "command_default",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reduce message text to a command keyword.
///
/// A non-blank payload wins over the raw text. Only the first word is kept,
/// leading markers are stripped and the result is lowercased, so
/// `/Time extra-args` becomes `time`. Blank input yields `""`.
pub fn normalize(payload: Option<&str>, text: &str) -> String {
    let source = match payload {
        Some(payload) if !payload.trim().is_empty() => payload,
        _ => text,
    };

    source
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .trim_start_matches(COMMAND_MARKER)
        .to_lowercase()
}
