//! Chat widget controller.
//!
//! [`ChatWidget`] owns the transcript, the message input and the two-mode
//! UI state. Front-ends never toggle controls directly: they read
//! [`ChatWidget::view`], which derives every enabled/visible flag from
//! [`Mode`], and listen to [`WidgetEvent`]s for incremental rendering.
//!
//! Network calls run as spawned tokio tasks. The state lock is only held
//! for short synchronous updates, never across an `.await`, so two sends
//! issued back to back are both in flight and their replies land in
//! whatever order they arrive.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::backend::ChatBackend;
use crate::config::MessagesConfig;
use crate::contact::{ContactInfo, ValidationError};
use crate::message::{Message, Sender};
use crate::transcript::Transcript;

/// Capacity of the event channel; slow subscribers see `Lagged`.
const EVENT_CAPACITY: usize = 256;

/// Whether the widget is chatting or waiting for contact details.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Chatting,
    /// The backend asked for contact info: form shown, message input disabled.
    AwaitingContactInfo,
}

/// Notification emitted after every state change.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetEvent {
    /// A message was appended to the transcript.
    MessageAppended(Message),
    /// The widget switched mode.
    ModeChanged(Mode),
    /// The message input now holds this text.
    InputChanged(String),
}

/// Everything the widget knows.
#[derive(Debug, Clone, Default)]
pub struct WidgetState {
    transcript: Transcript,
    input: String,
    mode: Mode,
    initialized: bool,
}

impl WidgetState {
    /// Derive which controls are usable in the current mode.
    ///
    /// This is the only place the input/send/form flags are derived.
    #[must_use]
    pub fn controls(&self) -> Controls {
        let chatting = self.mode == Mode::Chatting;
        Controls {
            input_enabled: chatting,
            send_enabled: chatting,
            contact_form_visible: !chatting,
        }
    }

    /// Project the state onto what a front-end shows.
    #[must_use]
    pub fn view(&self) -> WidgetView {
        let controls = self.controls();
        WidgetView {
            mode: self.mode,
            input: self.input.clone(),
            input_enabled: controls.input_enabled,
            send_enabled: controls.send_enabled,
            contact_form_visible: controls.contact_form_visible,
            transcript: self.transcript.clone(),
        }
    }

    fn append(&mut self, message: Message) -> WidgetEvent {
        self.transcript.push(message.clone());
        WidgetEvent::MessageAppended(message)
    }

    fn set_mode(&mut self, mode: Mode) -> Option<WidgetEvent> {
        (self.mode != mode).then(|| {
            self.mode = mode;
            WidgetEvent::ModeChanged(mode)
        })
    }
}

/// Enabled/visible flags without the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub input_enabled: bool,
    pub send_enabled: bool,
    pub contact_form_visible: bool,
}

/// Snapshot of the widget as a front-end should draw it.
#[derive(Debug, Clone)]
pub struct WidgetView {
    pub mode: Mode,
    /// Current content of the message input.
    pub input: String,
    pub input_enabled: bool,
    pub send_enabled: bool,
    pub contact_form_visible: bool,
    pub transcript: Transcript,
}

struct Shared {
    backend: Arc<dyn ChatBackend>,
    messages: MessagesConfig,
    state: Mutex<WidgetState>,
    events: broadcast::Sender<WidgetEvent>,
}

/// Controller mediating between the user and the backend.
///
/// Cloning is cheap and every clone drives the same widget.
#[derive(Clone)]
pub struct ChatWidget {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for ChatWidget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatWidget")
            .field("state", &*self.lock())
            .finish()
    }
}

impl ChatWidget {
    /// Create a widget talking to `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn ChatBackend>, messages: MessagesConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                backend,
                messages,
                state: Mutex::new(WidgetState::default()),
                events,
            }),
        }
    }

    /// Show the welcome message. Only the first call has an effect.
    pub fn initialize(&self) {
        let welcome = self.shared.messages.welcome.clone();
        self.update(|state, events| {
            if state.initialized {
                return;
            }
            state.initialized = true;
            events.push(state.append(Message::bot(welcome)));
        });
        info!(name: "widget.initialized", "Chat widget initialized");
    }

    /// Replace the content of the message input.
    pub fn set_input(&self, text: impl Into<String>) {
        let text = text.into();
        self.update(|state, events| {
            state.input.clone_from(&text);
            events.push(WidgetEvent::InputChanged(text));
        });
    }

    /// Send the content of the message input.
    ///
    /// Does nothing when the trimmed input is empty or the input is
    /// disabled. Otherwise the user message is appended and the input
    /// cleared before this returns; the reply is appended by the returned
    /// task once it arrives.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn send_message(&self) -> Option<JoinHandle<()>> {
        let text = self.update(|state, events| {
            if !state.controls().send_enabled {
                return None;
            }
            let text = state.input.trim().to_string();
            if text.is_empty() {
                return None;
            }
            events.push(state.append(Message::user(text.clone())));
            state.input.clear();
            events.push(WidgetEvent::InputChanged(String::new()));
            Some(text)
        });

        let Some(text) = text else {
            debug!(name: "widget.message.skipped", "Nothing to send");
            return None;
        };

        info!(name: "widget.message.sent", chars = text.chars().count(), "Message sent");
        let widget = self.clone();
        Some(tokio::spawn(async move { widget.deliver_chat(text).await }))
    }

    /// Validate and submit the contact form.
    ///
    /// Returns `Ok(None)` when the form is not visible. A validation failure
    /// is returned to the caller to show as an alert; nothing is appended to
    /// the transcript and no request is made.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn submit_contact_info(
        &self,
        info: &ContactInfo,
    ) -> Result<Option<JoinHandle<()>>, ValidationError> {
        if !self.controls().contact_form_visible {
            debug!(name: "widget.contact.skipped", "Contact form is hidden");
            return Ok(None);
        }

        let info = info.validate().inspect_err(|err| {
            warn!(name: "widget.contact.invalid", reason = %err, "Contact info rejected");
        })?;

        info!(name: "widget.contact.submitted", "Contact info submitted");
        let widget = self.clone();
        Ok(Some(tokio::spawn(async move {
            widget.deliver_contact(info).await;
        })))
    }

    /// Current projection of the widget state.
    #[must_use]
    pub fn view(&self) -> WidgetView {
        self.lock().view()
    }

    /// Current control flags, without cloning the transcript.
    #[must_use]
    pub fn controls(&self) -> Controls {
        self.lock().controls()
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.lock().mode
    }

    /// Receive every state change from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<WidgetEvent> {
        self.shared.events.subscribe()
    }

    /// Render the transcript as chat box HTML.
    #[must_use]
    pub fn render_html(&self) -> String {
        self.lock()
            .transcript
            .render_html(&self.shared.messages.bot_avatar_url)
    }

    async fn deliver_chat(&self, text: String) {
        match self.shared.backend.send_chat(&text).await {
            Ok(reply) => {
                debug!(
                    name: "widget.chat.reply",
                    ask_user_info = reply.ask_user_info,
                    "Chat reply received"
                );
                self.update(|state, events| {
                    events.push(state.append(Message::bot(reply.bot_response)));
                    if reply.ask_user_info {
                        events.extend(state.set_mode(Mode::AwaitingContactInfo));
                    }
                });
            }
            Err(err) => {
                error!(name: "widget.transport.failed", endpoint = "chat", error = %err, "Chat request failed");
                self.append_bot(self.shared.messages.chat_error.clone());
            }
        }
    }

    async fn deliver_contact(&self, info: ContactInfo) {
        match self.shared.backend.store_user_info(&info).await {
            Ok(reply) if reply.is_failure() => {
                warn!(name: "widget.contact.rejected", "Backend rejected contact info");
                self.append_bot(reply.bot_response);
            }
            Ok(reply) => {
                self.update(|state, events| {
                    events.push(state.append(Message::bot(reply.bot_response)));
                    events.extend(state.set_mode(Mode::Chatting));
                });
            }
            Err(err) => {
                error!(
                    name: "widget.transport.failed",
                    endpoint = "store_user_info",
                    error = %err,
                    "Contact submission failed"
                );
                self.append_bot(self.shared.messages.contact_error.clone());
            }
        }
    }

    fn append_bot(&self, text: String) {
        self.update(|state, events| events.push(state.append(Message::new(Sender::Bot, text))));
    }

    /// Mutate the state under the lock, then publish the collected events.
    fn update<R>(&self, f: impl FnOnce(&mut WidgetState, &mut Vec<WidgetEvent>) -> R) -> R {
        let mut events = Vec::new();
        let result = {
            let mut state = self.lock();
            f(&mut state, &mut events)
        };
        for event in events {
            // No subscribers is fine.
            let _ = self.shared.events.send(event);
        }
        result
    }

    fn lock(&self) -> MutexGuard<'_, WidgetState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
