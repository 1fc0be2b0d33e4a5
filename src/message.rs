//! Chat messages shown in the transcript.

use chrono::{DateTime, Local, Timelike};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Author of a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// Typed by the person using the widget.
    User,
    /// Produced by the backend or by the widget itself (welcome, errors).
    Bot,
}

impl Sender {
    /// Short label used by text front-ends.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "you",
            Self::Bot => "bot",
        }
    }
}

/// A single transcript entry.
///
/// Messages are immutable once created; the transcript only ever appends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier, used as the DOM id when rendered.
    pub id: Uuid,
    /// Who wrote the message.
    pub sender: Sender,
    /// Message body. Bot text may contain backend markup such as `<b>`.
    pub text: String,
    /// Local time the message was appended.
    pub created_at: DateTime<Local>,
}

impl Message {
    /// Create a message stamped with the current local time.
    #[must_use]
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self::at(sender, text, Local::now())
    }

    /// Create a message with an explicit timestamp.
    #[must_use]
    pub fn at(sender: Sender, text: impl Into<String>, created_at: DateTime<Local>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            text: text.into(),
            created_at,
        }
    }

    /// Create a user-authored message.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text)
    }

    /// Create a bot-authored message.
    #[must_use]
    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(Sender::Bot, text)
    }

    /// Display time in `h:mm AM` form.
    #[must_use]
    pub fn display_time(&self) -> String {
        format_clock(&self.created_at)
    }
}

/// Format a time as a 12-hour clock: unpadded hour, padded minutes.
#[must_use]
pub fn format_clock<T: Timelike>(time: &T) -> String {
    let (is_pm, hour) = time.hour12();
    let suffix = if is_pm { "PM" } else { "AM" };
    format!("{hour}:{:02} {suffix}", time.minute())
}
