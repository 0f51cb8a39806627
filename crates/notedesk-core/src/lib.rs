//! Client core for a notes service.
//!
//! The crate holds the in-memory [`SessionStore`], the authenticated
//! [`Gateway`] that refreshes expired access tokens, and [`NotesClient`],
//! which exposes the notes and auth endpoints as typed operations.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod utils;

pub use api::{ApiError, ApiRequest, ApiResponse, Gateway, NotesClient};
pub use auth::{Session, SessionEvent, SessionStore, UserInfo};
pub use config::{Config, RefreshPolicy};
