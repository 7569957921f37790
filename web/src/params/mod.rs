//! Typed request bodies for the publish endpoints.
//!
//! Bodies are decoded and checked here before anything reaches the broadcaster,
//! so a malformed request never produces a broadcast.

pub(crate) mod chat;
