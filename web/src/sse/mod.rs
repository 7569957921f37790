//! SSE HTTP handlers for the web layer.
//!
//! This module contains only the Axum handlers for the chat streams and the
//! per-flavor event framing. The broadcaster itself lives in the `sse` crate.

pub(crate) mod flavor;
pub(crate) mod handler;
