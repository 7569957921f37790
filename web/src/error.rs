use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::*;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// The request body could not be read or lacked the expected shape.
    /// Nothing was published.
    MalformedRequest(String),
    /// The broadcaster refused the message.
    Broadcast(::sse::Error),
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::MalformedRequest(_) => None,
            Error::Broadcast(err) => Some(err),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        match self {
            Error::MalformedRequest(reason) => write!(fmt, "malformed request: {reason}"),
            Error::Broadcast(err) => write!(fmt, "{err}"),
        }
    }
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::MalformedRequest(reason) => {
                warn!("Rejecting chat request: {reason}");
                (StatusCode::BAD_REQUEST, "BAD REQUEST").into_response()
            }
            Error::Broadcast(::sse::Error::IntakeFull) => {
                warn!("Rejecting chat message, broadcaster is saturated");
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE UNAVAILABLE").into_response()
            }
            Error::Broadcast(::sse::Error::Closed) => {
                info!("Rejecting chat message, broadcaster is shut down");
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE UNAVAILABLE").into_response()
            }
        }
    }
}

impl From<::sse::Error> for Error {
    fn from(err: ::sse::Error) -> Self {
        Error::Broadcast(err)
    }
}
