//! REST API access for the notes service.
//!
//! `Gateway` wraps every outgoing call: it injects the session's bearer
//! token and transparently refreshes an expired access token once before
//! giving up. `NotesClient` builds typed note and auth operations on top.

pub mod client;
pub mod error;
pub mod gateway;
pub mod request;

pub use client::NotesClient;
pub use error::{ApiError, SESSION_EXPIRED_MESSAGE};
pub use gateway::{Gateway, REFRESH_PATH};
pub use request::{ApiRequest, ApiResponse};
