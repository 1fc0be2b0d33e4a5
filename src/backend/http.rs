//! HTTP implementation of [`ChatBackend`].
//!
//! Requests are form-urlencoded `POST`s, replies are JSON. No retries are
//! made and no timeout is set unless `backend.request_timeout_secs` is
//! configured.
//!
//! The client keeps a cookie store. The backend tracks how many messages a
//! visitor sent and whether contact details were already given in its
//! session cookie, so every request must carry that cookie back.

use std::time::Duration;

use anyhow::Context;
use serde::de::DeserializeOwned;
use url::Url;

use super::{ChatBackend, ChatReply, StoreInfoReply, TransportError};
use crate::config::BackendConfig;
use crate::contact::ContactInfo;

/// Backend reached over HTTP.
#[derive(Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    chat_url: Url,
    store_user_info_url: Url,
    session_url: Option<Url>,
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("chat_url", &self.chat_url.as_str())
            .field("store_user_info_url", &self.store_user_info_url.as_str())
            .field("session_url", &self.session_url.as_ref().map(Url::as_str))
            .finish()
    }
}

impl HttpBackend {
    /// Build a backend from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL or an endpoint path does not form a
    /// valid URL, or the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> anyhow::Result<Self> {
        let base = Url::parse(&config.base_url)
            .with_context(|| format!("invalid backend.base_url: {}", config.base_url))?;

        let chat_url = base
            .join(&config.chat_path)
            .with_context(|| format!("invalid backend.chat_path: {}", config.chat_path))?;
        let store_user_info_url = base.join(&config.store_user_info_path).with_context(|| {
            format!(
                "invalid backend.store_user_info_path: {}",
                config.store_user_info_path
            )
        })?;

        let session_url = match config.session_path.trim() {
            "" => None,
            path => Some(
                base.join(path)
                    .with_context(|| format!("invalid backend.session_path: {path}"))?,
            ),
        };

        let mut builder = reqwest::Client::builder().cookie_store(true);
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().context("failed to build HTTP client")?;

        Ok(Self {
            http,
            chat_url,
            store_user_info_url,
            session_url,
        })
    }

    /// Fetch the session page so the backend sets up its session cookie.
    ///
    /// Does nothing when no session path is configured. The body is
    /// discarded; only the cookies matter.
    pub async fn open_session(&self) -> Result<(), TransportError> {
        let Some(url) = &self.session_url else {
            return Ok(());
        };
        tracing::debug!(name: "backend.session.request", url = %url, "GET session page");

        let resp = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|source| TransportError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status,
            });
        }
        Ok(())
    }

    /// Endpoint used for chat messages.
    #[must_use]
    pub fn chat_url(&self) -> &Url {
        &self.chat_url
    }

    /// Endpoint used for contact submissions.
    #[must_use]
    pub fn store_user_info_url(&self) -> &Url {
        &self.store_user_info_url
    }

    async fn post_form<F, T>(&self, url: &Url, form: &F) -> Result<T, TransportError>
    where
        F: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request_error = |source: reqwest::Error| TransportError::Request {
            url: url.to_string(),
            source,
        };

        let resp = self
            .http
            .post(url.clone())
            .form(form)
            .send()
            .await
            .map_err(request_error)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = resp.bytes().await.map_err(request_error)?;
        serde_json::from_slice(&body).map_err(|source| TransportError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait::async_trait]
impl ChatBackend for HttpBackend {
    async fn send_chat(&self, message: &str) -> Result<ChatReply, TransportError> {
        tracing::debug!(name: "backend.chat.request", url = %self.chat_url, "POST chat message");
        self.post_form(&self.chat_url, &[("message", message)]).await
    }

    async fn store_user_info(&self, info: &ContactInfo) -> Result<StoreInfoReply, TransportError> {
        tracing::debug!(
            name: "backend.store_user_info.request",
            url = %self.store_user_info_url,
            "POST contact info"
        );
        self.post_form(&self.store_user_info_url, info).await
    }
}
