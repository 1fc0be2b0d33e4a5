//! End-to-end tests driving the widget against an in-process mock backend.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Form, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chat_widget::config::{BackendConfig, MessagesConfig};
use chat_widget::{
    ChatWidget, ContactInfo, HttpBackend, Mode, Sender, TransportError, ValidationError,
};
use serde_json::{Value, json};

/// What the mock answers with, in order, per endpoint.
#[derive(Clone)]
enum Reply {
    Json(Value),
    Raw(&'static str),
    Status(StatusCode),
    Slow(Duration, Value),
    WithCookie(&'static str, Value),
}

const SESSION_COOKIE: &str = "session=abc";

impl Reply {
    async fn respond(self) -> Response {
        match self {
            Self::Json(body) => Json(body).into_response(),
            Self::Raw(body) => body.into_response(),
            Self::Status(status) => status.into_response(),
            Self::Slow(delay, body) => {
                tokio::time::sleep(delay).await;
                Json(body).into_response()
            }
            Self::WithCookie(cookie, body) => {
                ([(SET_COOKIE, format!("{cookie}; Path=/"))], Json(body)).into_response()
            }
        }
    }
}

#[derive(Default)]
struct MockState {
    chat_replies: VecDeque<Reply>,
    store_replies: VecDeque<Reply>,
    chat_forms: Vec<HashMap<String, String>>,
    store_forms: Vec<HashMap<String, String>>,
    /// `Cookie` header of every POST, in arrival order.
    cookies: Vec<Option<String>>,
}

type Shared = Arc<Mutex<MockState>>;

fn cookie_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

async fn session_handler() -> Response {
    (
        [(SET_COOKIE, format!("{SESSION_COOKIE}; Path=/"))],
        "<html>chatbot</html>",
    )
        .into_response()
}

async fn chat_handler(
    State(state): State<Shared>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let reply = {
        let mut state = state.lock().unwrap();
        state.cookies.push(cookie_header(&headers));
        state.chat_forms.push(form);
        state.chat_replies.pop_front()
    };
    match reply {
        Some(reply) => reply.respond().await,
        None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn store_handler(
    State(state): State<Shared>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let reply = {
        let mut state = state.lock().unwrap();
        state.cookies.push(cookie_header(&headers));
        state.store_forms.push(form);
        state.store_replies.pop_front()
    };
    match reply {
        Some(reply) => reply.respond().await,
        None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

struct MockBackend {
    addr: SocketAddr,
    state: Shared,
}

impl MockBackend {
    async fn start(chat: Vec<Reply>, store: Vec<Reply>) -> Self {
        let state: Shared = Arc::new(Mutex::new(MockState {
            chat_replies: chat.into(),
            store_replies: store.into(),
            ..MockState::default()
        }));

        let app = Router::new()
            .route("/chatbot", get(session_handler))
            .route("/chat", post(chat_handler))
            .route("/store_user_info", post(store_handler))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    fn config(&self) -> BackendConfig {
        BackendConfig {
            base_url: format!("http://{}", self.addr),
            ..BackendConfig::default()
        }
    }

    fn widget(&self) -> ChatWidget {
        widget_for(&self.config())
    }

    fn chat_forms(&self) -> Vec<HashMap<String, String>> {
        self.state.lock().unwrap().chat_forms.clone()
    }

    fn store_forms(&self) -> Vec<HashMap<String, String>> {
        self.state.lock().unwrap().store_forms.clone()
    }

    fn cookies(&self) -> Vec<Option<String>> {
        self.state.lock().unwrap().cookies.clone()
    }
}

fn widget_for(config: &BackendConfig) -> ChatWidget {
    let backend = Arc::new(HttpBackend::new(config).unwrap());
    let widget = ChatWidget::new(backend, MessagesConfig::default());
    widget.initialize();
    widget
}

async fn send(widget: &ChatWidget, text: &str) {
    widget.set_input(text);
    widget
        .send_message()
        .expect("message should be sent")
        .await
        .unwrap();
}

fn ask_for_contact() -> Reply {
    Reply::Json(json!({
        "bot_response": "Please share your contact.",
        "ask_user_info": true
    }))
}

#[tokio::test]
async fn test_hello_round_trip() {
    let mock = MockBackend::start(
        vec![Reply::Json(json!({"bot_response": "Hi!", "ask_user_info": false}))],
        vec![],
    )
    .await;
    let widget = mock.widget();

    send(&widget, "Hello").await;

    let view = widget.view();
    let texts: Vec<(Sender, &str)> = view
        .transcript
        .messages()
        .iter()
        .map(|m| (m.sender, m.text.as_str()))
        .collect();
    assert_eq!(
        texts[1..],
        [(Sender::User, "Hello"), (Sender::Bot, "Hi!")]
    );
    assert!(view.input_enabled);
    assert!(!view.contact_form_visible);

    let forms = mock.chat_forms();
    assert_eq!(forms.len(), 1);
    assert_eq!(forms[0]["message"], "Hello");
}

#[tokio::test]
async fn test_missing_ask_user_info_keeps_input_enabled() {
    let mock =
        MockBackend::start(vec![Reply::Json(json!({"bot_response": "Sure."}))], vec![]).await;
    let widget = mock.widget();

    send(&widget, "Tell me more").await;

    assert_eq!(widget.mode(), Mode::Chatting);
    assert_eq!(widget.view().transcript.last().unwrap().text, "Sure.");
}

#[tokio::test]
async fn test_message_is_form_encoded() {
    let mock = MockBackend::start(
        vec![Reply::Json(json!({"bot_response": "ok"}))],
        vec![],
    )
    .await;
    let widget = mock.widget();

    send(&widget, "  a&b=c über 100%  ").await;

    assert_eq!(mock.chat_forms()[0]["message"], "a&b=c über 100%");
}

#[tokio::test]
async fn test_contact_flow() {
    let mock = MockBackend::start(
        vec![ask_for_contact()],
        vec![Reply::Json(json!({"bot_response": "Thanks!"}))],
    )
    .await;
    let widget = mock.widget();

    send(&widget, "I need a quote").await;

    let view = widget.view();
    assert!(view.contact_form_visible);
    assert!(!view.input_enabled);
    assert!(!view.send_enabled);

    let contact = ContactInfo::new("Jo", "jo@x.com", "5551234");
    widget
        .submit_contact_info(&contact)
        .unwrap()
        .expect("form is visible")
        .await
        .unwrap();

    let view = widget.view();
    assert!(!view.contact_form_visible);
    assert!(view.input_enabled);
    assert!(view.send_enabled);
    assert_eq!(view.transcript.last().unwrap().text, "Thanks!");

    let forms = mock.store_forms();
    assert_eq!(forms.len(), 1);
    assert_eq!(forms[0]["name"], "Jo");
    assert_eq!(forms[0]["email"], "jo@x.com");
    assert_eq!(forms[0]["phone"], "5551234");
}

#[tokio::test]
async fn test_invalid_contact_never_reaches_backend() {
    let mock = MockBackend::start(vec![ask_for_contact()], vec![]).await;
    let widget = mock.widget();
    send(&widget, "quote please").await;

    let cases = [
        (ContactInfo::new("A", "a@b.co", "1234567"), ValidationError::InvalidName),
        (ContactInfo::new("Al", "not-an-email", "1234567"), ValidationError::InvalidEmail),
        (ContactInfo::new("Al", "a@b.co", "12345"), ValidationError::InvalidPhone),
    ];
    for (contact, expected) in cases {
        assert_eq!(widget.submit_contact_info(&contact).unwrap_err(), expected);
    }

    assert!(mock.store_forms().is_empty());
    assert_eq!(widget.mode(), Mode::AwaitingContactInfo);
}

#[tokio::test]
async fn test_error_reply_keeps_form_open() {
    let mock = MockBackend::start(
        vec![ask_for_contact()],
        vec![Reply::Json(
            json!({"bot_response": "An error occurred while saving your details."}),
        )],
    )
    .await;
    let widget = mock.widget();
    send(&widget, "quote").await;

    widget
        .submit_contact_info(&ContactInfo::new("Jo", "jo@x.com", "5551234"))
        .unwrap()
        .unwrap()
        .await
        .unwrap();

    let view = widget.view();
    assert!(view.contact_form_visible);
    assert!(!view.input_enabled);
    assert_eq!(
        view.transcript.last().unwrap().text,
        "An error occurred while saving your details."
    );
}

#[tokio::test]
async fn test_malformed_reply_shows_generic_error() {
    let mock = MockBackend::start(vec![Reply::Raw("<html>oops</html>")], vec![]).await;
    let widget = mock.widget();

    send(&widget, "Hello").await;

    let view = widget.view();
    assert_eq!(view.transcript.texts_from(Sender::User), vec!["Hello"]);
    assert_eq!(
        view.transcript.last().unwrap().text,
        "An error occurred. Please try again."
    );
    assert_eq!(view.mode, Mode::Chatting);
}

#[tokio::test]
async fn test_server_error_shows_generic_error() {
    let mock = MockBackend::start(
        vec![Reply::Status(StatusCode::SERVICE_UNAVAILABLE)],
        vec![],
    )
    .await;
    let widget = mock.widget();

    send(&widget, "Hello").await;

    assert_eq!(
        widget.view().transcript.last().unwrap().text,
        "An error occurred. Please try again."
    );
}

#[tokio::test]
async fn test_contact_transport_failure_leaves_form_open() {
    let mock = MockBackend::start(
        vec![ask_for_contact()],
        vec![Reply::Status(StatusCode::INTERNAL_SERVER_ERROR)],
    )
    .await;
    let widget = mock.widget();
    send(&widget, "quote").await;

    widget
        .submit_contact_info(&ContactInfo::new("Jo", "jo@x.com", "5551234"))
        .unwrap()
        .unwrap()
        .await
        .unwrap();

    let view = widget.view();
    assert_eq!(view.mode, Mode::AwaitingContactInfo);
    assert_eq!(
        view.transcript.last().unwrap().text,
        "An error occurred while saving your information."
    );
}

#[tokio::test]
async fn test_unreachable_backend() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let widget = widget_for(&BackendConfig {
        base_url: format!("http://{addr}"),
        ..BackendConfig::default()
    });

    send(&widget, "anyone there?").await;

    let view = widget.view();
    assert_eq!(
        view.transcript.last().unwrap().text,
        "An error occurred. Please try again."
    );
    assert!(view.input_enabled);
}

#[tokio::test]
async fn test_configured_timeout_fails_slow_reply() {
    let mock = MockBackend::start(
        vec![Reply::Slow(
            Duration::from_secs(5),
            json!({"bot_response": "too late"}),
        )],
        vec![],
    )
    .await;
    let widget = widget_for(&BackendConfig {
        request_timeout_secs: Some(1),
        ..mock.config()
    });

    send(&widget, "Hello").await;

    assert_eq!(
        widget.view().transcript.last().unwrap().text,
        "An error occurred. Please try again."
    );
}

#[tokio::test]
async fn test_rendered_transcript() {
    let mock = MockBackend::start(
        vec![Reply::Json(json!({"bot_response": "We offer **SEO**.\n- <b>Web</b>"}))],
        vec![],
    )
    .await;
    let widget = mock.widget();

    send(&widget, "<i>services?</i>").await;

    let html = widget.render_html();
    assert!(html.contains("Welcome to SPR Builders!"));
    assert!(html.contains("&lt;i&gt;services?&lt;/i&gt;"));
    assert!(html.contains("We offer **SEO**.<br>- <b>Web</b>"));
}

#[tokio::test]
async fn test_session_cookie_is_sent_back() {
    let mock = MockBackend::start(
        vec![
            Reply::WithCookie(SESSION_COOKIE, json!({"bot_response": "Hi!"})),
            ask_for_contact(),
        ],
        vec![Reply::Json(json!({"bot_response": "Thanks!"}))],
    )
    .await;
    let widget = mock.widget();

    send(&widget, "Hello").await;
    send(&widget, "I need a quote").await;
    assert_eq!(widget.mode(), Mode::AwaitingContactInfo);

    widget
        .submit_contact_info(&ContactInfo::new("Jo", "jo@x.com", "5551234"))
        .unwrap()
        .unwrap()
        .await
        .unwrap();

    assert_eq!(
        mock.cookies(),
        vec![
            None,
            Some(SESSION_COOKIE.to_string()),
            Some(SESSION_COOKIE.to_string()),
        ]
    );
    assert_eq!(widget.mode(), Mode::Chatting);
}

#[tokio::test]
async fn test_open_session_cookie_reaches_first_request() {
    let mock = MockBackend::start(vec![Reply::Json(json!({"bot_response": "Hi!"}))], vec![]).await;
    let backend = Arc::new(HttpBackend::new(&mock.config()).unwrap());
    backend.open_session().await.unwrap();

    let widget = ChatWidget::new(backend, MessagesConfig::default());
    widget.initialize();
    send(&widget, "Hello").await;

    assert_eq!(mock.cookies(), vec![Some(SESSION_COOKIE.to_string())]);
    assert_eq!(widget.view().transcript.last().unwrap().text, "Hi!");
}

#[tokio::test]
async fn test_open_session_reports_missing_page() {
    let mock = MockBackend::start(vec![], vec![]).await;
    let backend = HttpBackend::new(&BackendConfig {
        session_path: "/no-such-page".to_string(),
        ..mock.config()
    })
    .unwrap();

    let err = backend.open_session().await.unwrap_err();
    assert!(
        matches!(err, TransportError::Status { status, .. } if status == StatusCode::NOT_FOUND),
        "unexpected error: {err}"
    );
}

#[tokio::test]
async fn test_open_session_without_path_makes_no_request() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let backend = HttpBackend::new(&BackendConfig {
        base_url: format!("http://{addr}"),
        session_path: String::new(),
        ..BackendConfig::default()
    })
    .unwrap();

    backend.open_session().await.unwrap();
}
