//! Chat Widget
//!
//! A small chat client: it keeps a transcript, relays user messages to a
//! backend, and switches into a contact-form mode when the backend asks for
//! the user's details.
//!
//! # Architecture
//!
//! - **Controller**: [`widget::ChatWidget`] owns all state; front-ends draw
//!   [`widget::WidgetView`] projections and listen to [`widget::WidgetEvent`]s
//! - **Backend**: [`backend::ChatBackend`] trait with a reqwest-based
//!   [`backend::HttpBackend`] speaking form-urlencoded requests and JSON replies
//! - **Rendering**: [`transcript`] renders entries as chat box HTML
//!
//! # Modules
//!
//! - [`backend`]: backend contract and HTTP transport
//! - [`config`]: layered configuration (defaults, file, env, CLI)
//! - [`contact`]: contact details and their validation
//! - [`message`]: transcript messages
//! - [`telemetry`]: tracing subscriber setup
//! - [`transcript`]: append-only transcript and HTML rendering
//! - [`widget`]: the controller

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]

pub mod backend;
pub mod config;
pub mod contact;
pub mod message;
pub mod telemetry;
pub mod transcript;
pub mod widget;

pub use backend::{ChatBackend, HttpBackend, TransportError};
pub use contact::{ContactInfo, ValidationError};
pub use message::{Message, Sender};
pub use widget::{ChatWidget, Controls, Mode, WidgetEvent, WidgetView};
