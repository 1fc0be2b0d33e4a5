//! Append-only chat transcript and its HTML rendering.
//!
//! The transcript is the ordered list of messages the widget has shown. It
//! never removes or edits an entry, so it grows for the lifetime of the
//! widget. Long-lived sessions would need eviction on top of this.

use crate::message::{Message, Sender};

/// Ordered, append-only sequence of messages.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Create an empty transcript.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to the end of the transcript.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// All messages in append order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Most recently appended message.
    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if nothing has been appended yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Message texts from the given sender, oldest first.
    #[must_use]
    pub fn texts_from(&self, sender: Sender) -> Vec<&str> {
        self.messages
            .iter()
            .filter(|m| m.sender == sender)
            .map(|m| m.text.as_str())
            .collect()
    }

    /// Render the whole transcript as the contents of the chat box.
    #[must_use]
    pub fn render_html(&self, bot_avatar_url: &str) -> String {
        self.messages.iter().fold(String::new(), |mut out, msg| {
            out.push_str(&render_message_html(msg, bot_avatar_url));
            out.push('\n');
            out
        })
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

/// Render a single transcript entry.
///
/// User text is escaped. Bot text is backend-owned markup (bold is sent as
/// `<b>`) and is inserted verbatim. Newlines become `<br>` in both cases.
#[must_use]
pub fn render_message_html(message: &Message, bot_avatar_url: &str) -> String {
    let time = message.display_time();
    let id = message.id;

    match message.sender {
        Sender::User => {
            let body = with_line_breaks(&escape_html(&message.text));
            format!(
                r#"<div id="msg-{id}" class="flex items-end mb-2 justify-end">
    <div class="max-w-xl px-4 py-2 rounded-lg shadow bg-gray-300 text-black">
        <p>{body}</p>
        <span class="block text-xs text-gray-600 mt-1">{time}</span>
    </div>
</div>"#
            )
        }
        Sender::Bot => {
            let body = with_line_breaks(&message.text);
            let avatar = escape_html(bot_avatar_url);
            format!(
                r#"<div id="msg-{id}" class="flex items-end mb-2 justify-start">
    <div class="flex items-center">
        <img src="{avatar}" alt="Bot" class="h-8 w-8 full mr-2">
        <div class="max-w-xl px-4 py-2 rounded-lg shadow bg-[#FF0000] text-white">
            <p>{body}</p>
            <span class="block text-xs text-white-600 mt-1">{time}</span>
        </div>
    </div>
</div>"#
            )
        }
    }
}

fn with_line_breaks(text: &str) -> String {
    text.replace('\n', "<br>")
}

/// Escape the five HTML-significant characters.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
