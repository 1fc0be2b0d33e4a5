//! Widget configuration.
//!
//! Sources, lowest priority first:
//!
//! 1. Built-in defaults
//! 2. `./chat-widget.yaml`, if present
//! 3. The file named by `--config` / `CONFIG_FILE`
//! 4. `CHAT_WIDGET_`-prefixed environment variables, `__` between sections
//!    (e.g. `CHAT_WIDGET_BACKEND__BASE_URL`)
//! 5. CLI flags, each of which also reads a plain environment variable

use clap::Parser;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_CHAT_PATH: &str = "/chat";
pub const DEFAULT_STORE_USER_INFO_PATH: &str = "/store_user_info";
pub const DEFAULT_SESSION_PATH: &str = "/chatbot";
pub const DEFAULT_WELCOME: &str = "Welcome to SPR Builders!🎯✨";
pub const DEFAULT_CHAT_ERROR: &str = "An error occurred. Please try again.";
pub const DEFAULT_CONTACT_ERROR: &str = "An error occurred while saving your information.";
pub const DEFAULT_BOT_AVATAR_URL: &str = "https://www.sprbuilders.in/img/logo/logo-spr.svg";

/// Config file picked up from the working directory when no file is named.
const LOCAL_CONFIG_FILE: &str = "chat-widget.yaml";

#[derive(Parser, Debug)]
#[command(author, version, about = "Terminal chat widget", long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Backend base URL
    #[arg(long, env = "BACKEND_URL")]
    pub base_url: Option<String>,

    /// Request timeout in seconds (no timeout when unset)
    #[arg(long, env = "REQUEST_TIMEOUT_SECS")]
    pub timeout: Option<u64>,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum)]
    pub log_format: Option<LogFormat>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct WidgetConfig {
    pub backend: BackendConfig,
    pub messages: MessagesConfig,
    pub log: LogConfig,
}

/// Where and how to reach the backend.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Absolute URL the endpoint paths are resolved against.
    pub base_url: String,
    /// Path of the chat endpoint. A leading `/` replaces any path in `base_url`.
    pub chat_path: String,
    /// Path of the contact-info endpoint.
    pub store_user_info_path: String,
    /// Page fetched once at startup so the backend issues its session
    /// cookie. Empty disables the fetch.
    pub session_path: String,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            chat_path: DEFAULT_CHAT_PATH.to_string(),
            store_user_info_path: DEFAULT_STORE_USER_INFO_PATH.to_string(),
            session_path: DEFAULT_SESSION_PATH.to_string(),
            request_timeout_secs: None,
        }
    }
}

/// Fixed texts shown by the widget itself.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct MessagesConfig {
    pub welcome: String,
    pub chat_error: String,
    pub contact_error: String,
    pub bot_avatar_url: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            welcome: DEFAULT_WELCOME.to_string(),
            chat_error: DEFAULT_CHAT_ERROR.to_string(),
            contact_error: DEFAULT_CONTACT_ERROR.to_string(),
            bot_avatar_url: DEFAULT_BOT_AVATAR_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct LogConfig {
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

impl WidgetConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder()
            .set_default("backend.base_url", DEFAULT_BASE_URL)?
            .set_default("backend.chat_path", DEFAULT_CHAT_PATH)?
            .set_default("backend.store_user_info_path", DEFAULT_STORE_USER_INFO_PATH)?
            .set_default("backend.session_path", DEFAULT_SESSION_PATH)?
            .set_default("messages.welcome", DEFAULT_WELCOME)?
            .set_default("messages.chat_error", DEFAULT_CHAT_ERROR)?
            .set_default("messages.contact_error", DEFAULT_CONTACT_ERROR)?
            .set_default("messages.bot_avatar_url", DEFAULT_BOT_AVATAR_URL)?
            .set_default("log.format", LogFormat::Text.as_str())?;

        builder = builder.add_source(File::new(LOCAL_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(path) = &cli.config {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("CHAT_WIDGET")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(url) = cli.base_url {
            builder = builder.set_override("backend.base_url", url)?;
        }
        if let Some(secs) = cli.timeout {
            builder = builder.set_override("backend.request_timeout_secs", secs)?;
        }
        if let Some(format) = cli.log_format {
            builder = builder.set_override("log.format", format.as_str())?;
        }

        let cfg = builder.build()?;
        cfg.try_deserialize()
    }
}
