use ::sse::Message;
use axum::response::sse::Event;
use std::borrow::Cow;

/// SSE event name the htmx page listens for (`sse-swap="chat"`).
pub(crate) const HTMX_EVENT_NAME: &str = "chat";

/// How a chat message is framed on a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flavor {
    /// Unnamed event whose data is exactly the message text.
    Plain,
    /// `chat` event carrying the message as an escaped HTML paragraph.
    Htmx,
}

impl Flavor {
    /// Multi-line messages become one `data:` line per text line, so the
    /// listener rebuilds them joined by `\n`.
    pub(crate) fn event(&self, message: &Message) -> Event {
        let text = normalize_line_endings(message.as_str());
        match self {
            Flavor::Plain => Event::default().data(text),
            Flavor::Htmx => Event::default()
                .event(HTMX_EVENT_NAME)
                .data(format!("<p>{}</p>", html_escape(&text))),
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            Flavor::Plain => "plain",
            Flavor::Htmx => "htmx",
        }
    }
}

// `Event::data` breaks lines on `\r` and `\n` alike, so a CRLF pair would
// otherwise come out as an extra empty line.
fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    if text.contains("\r\n") {
        Cow::Owned(text.replace("\r\n", "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

/// Escape HTML entities
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
