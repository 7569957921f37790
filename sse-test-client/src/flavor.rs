/// Which of the two chat endpoints a connection talks to.
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flavor {
    /// `/chat`: raw text bodies, unnamed events carrying the raw text
    Plain,
    /// `/htmx/chat`: form bodies, `chat` events carrying escaped HTML
    Htmx,
}

impl Flavor {
    pub fn path(self) -> &'static str {
        match self {
            Flavor::Plain => "/chat",
            Flavor::Htmx => "/htmx/chat",
        }
    }

    /// Event type as reported by the SSE parser. Unnamed events surface as `message`.
    pub fn event_type(self) -> &'static str {
        match self {
            Flavor::Plain => "message",
            Flavor::Htmx => "chat",
        }
    }

    /// The data a listener should see for a published `text`.
    pub fn expected_data(self, text: &str) -> String {
        match self {
            Flavor::Plain => text.to_string(),
            Flavor::Htmx => format!("<p>{}</p>", escape(text)),
        }
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
