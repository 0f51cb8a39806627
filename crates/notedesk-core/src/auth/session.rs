use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tracing::debug;

/// Capacity of the session event channel. Events are rare (login, refresh,
/// logout), so a small buffer is plenty.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Identity carried in the access token's `UserInfo` claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub username: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl UserInfo {
    /// Decode the user identity from a JWT access token without verifying it.
    /// Returns `None` for tokens that are not JWTs or carry no identity.
    pub fn from_token(token: &str) -> Option<Self> {
        #[derive(Deserialize)]
        struct Claims {
            #[serde(rename = "UserInfo")]
            user_info: Option<UserInfo>,
            sub: Option<String>,
        }

        let payload = token.split('.').nth(1)?;
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .ok()?;
        let claims: Claims = serde_json::from_slice(&bytes).ok()?;

        claims.user_info.or_else(|| {
            claims.sub.map(|username| UserInfo {
                username,
                roles: Vec::new(),
            })
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub access_token: Option<String>,
    pub user: Option<UserInfo>,
}

/// Session changes observable by front-ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A new access token was stored (login or refresh)
    Set,
    /// The session was torn down (logout or expired refresh credential)
    Cleared,
}

/// In-memory holder of the current access token and user identity.
///
/// Shared as `Arc<SessionStore>` between the gateway and the front-end.
/// Reads and writes are synchronous and never held across an await, so a
/// write made by one task is visible to the next read in any task.
pub struct SessionStore {
    state: watch::Sender<Session>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: watch::Sender::new(Session::default()),
            events,
        }
    }

    /// Store a new access token, replacing any previous one.
    /// The user identity is re-derived from the token when possible and
    /// kept otherwise.
    pub fn set_credentials(&self, access_token: impl Into<String>) {
        let access_token = access_token.into();
        let user = UserInfo::from_token(&access_token);
        self.state.send_modify(|session| {
            if let Some(user) = user {
                session.user = Some(user);
            }
            session.access_token = Some(access_token);
        });
        debug!(user = ?self.user().map(|u| u.username), "Session credentials set");
        // No subscribers is fine
        let _ = self.events.send(SessionEvent::Set);
    }

    /// Clear the token and identity
    pub fn log_out(&self) {
        self.state.send_replace(Session::default());
        debug!("Session cleared");
        let _ = self.events.send(SessionEvent::Cleared);
    }

    /// Current bearer token, if any
    pub fn token(&self) -> Option<String> {
        self.state.borrow().access_token.clone()
    }

    pub fn user(&self) -> Option<UserInfo> {
        self.state.borrow().user.clone()
    }

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().access_token.is_some()
    }

    /// Subscribe to session set/cleared events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Watch the session state itself
    pub fn watch(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
