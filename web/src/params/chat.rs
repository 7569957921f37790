use crate::error::{Error, Result};
use utoipa::ToSchema;

/// Name of the form field holding the chat line.
pub(crate) const CHAT_FIELD: &str = "chat";

/// URL-form-encoded body posted by the htmx page
///
/// # Fields
///
/// * `chat` - The decoded chat line to broadcast
#[derive(Debug, ToSchema)]
pub(crate) struct ChatForm {
    pub(crate) chat: String,
}

impl ChatForm {
    /// Decodes `body` as `application/x-www-form-urlencoded`.
    ///
    /// The content type header is not required. A body without a `chat` field is
    /// rejected; if the field repeats, the first occurrence wins.
    pub(crate) fn parse(body: &[u8]) -> Result<Self> {
        url::form_urlencoded::parse(body)
            .find(|(name, _)| name == CHAT_FIELD)
            .map(|(_, value)| ChatForm {
                chat: value.into_owned(),
            })
            .ok_or_else(|| Error::MalformedRequest(format!("missing `{CHAT_FIELD}` form field")))
    }
}
