//! UPLIFT streaming chat core: the relay and incremental-render pipeline
//! behind the wellness app's two chat modes.

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Client-side chat core: SSE decoding, sanitization, streaming sessions,
/// conversation state, and persistence.
pub mod chat;
/// HTTP relay server and API routes.
pub mod server;
/// Entry helpers to start the relay server.
pub mod start_uplift;
