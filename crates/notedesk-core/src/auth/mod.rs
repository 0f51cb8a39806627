//! Session management.
//!
//! This module provides `SessionStore`, the in-memory holder of the current
//! access token and user identity. The store is injected into the gateway,
//! which is the only component that writes to it during request handling.

pub mod session;

pub use session::{Session, SessionEvent, SessionStore, UserInfo};
