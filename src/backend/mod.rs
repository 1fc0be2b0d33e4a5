//! Backend contract consumed by the widget.
//!
//! The backend owns two endpoints:
//!
//! - `POST /chat` with form body `message=...`, answering
//!   `{ "bot_response": "...", "ask_user_info": true|false }`
//! - `POST /store_user_info` with form body `name=...&email=...&phone=...`,
//!   answering `{ "bot_response": "...", "status": "ok"|"error" }`
//!
//! [`ChatBackend`] abstracts over the transport so the widget can be driven
//! by the HTTP client in [`http`] or by an in-memory double in tests.

pub mod http;

pub use http::HttpBackend;

use serde::{Deserialize, Serialize};

use crate::contact::ContactInfo;

/// Reply to a chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    /// Text to show as a bot message.
    pub bot_response: String,
    /// Backend wants the contact form shown. Absent means `false`.
    #[serde(default)]
    pub ask_user_info: bool,
}

/// Structured outcome of a contact submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitStatus {
    Ok,
    Error,
}

/// Reply to a contact submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreInfoReply {
    /// Text to show as a bot message.
    pub bot_response: String,
    /// Explicit outcome, when the backend sends one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SubmitStatus>,
}

impl StoreInfoReply {
    /// Whether the backend reported a failure.
    ///
    /// A structured `status` always wins. Without one, any reply whose text
    /// contains the case-sensitive substring `error` counts as a failure.
    /// That fallback misfires on harmless replies that mention the word
    /// and is kept only for backends that predate `status`.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        match self.status {
            Some(status) => status == SubmitStatus::Error,
            None => self.bot_response.contains("error"),
        }
    }
}

/// Failure to obtain a usable reply from the backend.
///
/// The widget reacts to every variant the same way; they differ only in
/// what gets logged.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Connection, timeout, or other request-level failure.
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// Backend answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    /// Body was not the expected JSON document.
    #[error("malformed response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    /// Raised by non-HTTP backends.
    #[error("{0}")]
    Other(String),
}

/// Transport used by the widget to reach the backend.
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send a chat message and return the bot's reply.
    async fn send_chat(&self, message: &str) -> Result<ChatReply, TransportError>;

    /// Submit validated contact details.
    async fn store_user_info(&self, info: &ContactInfo) -> Result<StoreInfoReply, TransportError>;
}
