//! Terminal front-end for the chat widget.
//!
//! Lines read from stdin are sent as chat messages. When the backend asks
//! for contact details the next three lines fill in name, email and phone.
//! The transcript is printed to stdout as it grows; logs go to stderr.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::info;

use chat_widget::config::WidgetConfig;
use chat_widget::{ChatWidget, ContactInfo, Controls, HttpBackend, Mode, WidgetEvent, telemetry};

const FIELD_PROMPTS: [&str; 3] = ["name", "email", "phone"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present) before config reads the environment
    let _ = dotenv();

    let config = WidgetConfig::load().context("Configuration error")?;
    telemetry::init(config.log.format)?;

    info!(
        name: "widget.config.loaded",
        base_url = %config.backend.base_url,
        timeout_secs = ?config.backend.request_timeout_secs,
        "Widget configuration loaded"
    );

    let backend = Arc::new(HttpBackend::new(&config.backend)?);
    if let Err(err) = backend.open_session().await {
        tracing::warn!(
            name: "backend.session.failed",
            error = %err,
            "Could not open a backend session; continuing without one"
        );
    }
    let widget = ChatWidget::new(backend, config.messages.clone());

    let printer = tokio::spawn(print_events(widget.subscribe()));
    widget.initialize();

    let pending = read_input(&widget).await?;
    futures::future::join_all(pending).await;

    // Dropping the last handle closes the event channel and stops the printer.
    drop(widget);
    printer.await?;
    Ok(())
}

/// Contact form fields typed so far.
#[derive(Debug, Default)]
struct ContactDraft {
    fields: Vec<String>,
}

impl ContactDraft {
    /// Record one field; returns the complete form once all three are in.
    fn fill(&mut self, value: String) -> Option<ContactInfo> {
        self.fields.push(value);
        if self.fields.len() < FIELD_PROMPTS.len() {
            return None;
        }
        let mut fields = std::mem::take(&mut self.fields).into_iter();
        Some(ContactInfo::new(
            fields.next().unwrap_or_default(),
            fields.next().unwrap_or_default(),
            fields.next().unwrap_or_default(),
        ))
    }

    fn next_prompt(&self) -> &'static str {
        FIELD_PROMPTS[self.fields.len() % FIELD_PROMPTS.len()]
    }

    /// Prompt to print once a submission settled. `None` when the form
    /// closed and chatting resumes.
    fn prompt_after_submit(&self, controls: Controls) -> Option<&'static str> {
        controls.contact_form_visible.then(|| self.next_prompt())
    }
}

async fn read_input(widget: &ChatWidget) -> anyhow::Result<Vec<JoinHandle<()>>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut draft = ContactDraft::default();
    let mut pending = Vec::new();

    while let Some(line) = lines.next_line().await? {
        if !widget.controls().contact_form_visible {
            widget.set_input(line);
            pending.extend(widget.send_message());
            pending.retain(|h| !h.is_finished());
            continue;
        }

        let Some(info) = draft.fill(line) else {
            println!("{}:", draft.next_prompt());
            continue;
        };

        match widget.submit_contact_info(&info) {
            // Settle the mode before reading the next line.
            Ok(Some(handle)) => handle.await?,
            Ok(None) => {}
            Err(err) => println!("! {err}"),
        }
        if let Some(prompt) = draft.prompt_after_submit(widget.controls()) {
            println!("{prompt}:");
        }
    }

    Ok(pending)
}

async fn print_events(mut rx: broadcast::Receiver<WidgetEvent>) {
    loop {
        match rx.recv().await {
            Ok(WidgetEvent::MessageAppended(msg)) => {
                println!("[{}] {}: {}", msg.display_time(), msg.sender.label(), msg.text);
            }
            Ok(WidgetEvent::ModeChanged(Mode::AwaitingContactInfo)) => {
                println!("-- contact form --");
                println!("{}:", FIELD_PROMPTS[0]);
            }
            Ok(WidgetEvent::ModeChanged(Mode::Chatting) | WidgetEvent::InputChanged(_)) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(name: "widget.events.lagged", skipped, "Transcript printer fell behind");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
