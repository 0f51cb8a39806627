//! Typed client for the notes REST API.
//!
//! `NotesClient` turns note and auth operations into `ApiRequest`s and
//! sends them through the `Gateway`, so every call shares the same session
//! and token refresh behavior.

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auth::SessionStore;
use crate::config::Config;
use crate::models::{BulkReport, NewNote, Note, NoteChanges, NoteId, NotePage, NoteQuery};

use super::{ApiError, ApiRequest, Gateway};

// ============================================================================
// Constants
// ============================================================================

const LOGIN_PATH: &str = "/auth";
const LOGOUT_PATH: &str = "/auth/logout";
const NOTES_PATH: &str = "/notes";

/// Maximum concurrent requests during bulk operations.
/// Keeps a large selection from flooding the server.
const MAX_CONCURRENT_REQUESTS: usize = 10;

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(rename = "accessToken")]
    access_token: String,
}

/// Client for the notes service.
/// Clone is cheap - the gateway shares its connection pool and session.
#[derive(Clone)]
pub struct NotesClient {
    gateway: Gateway,
}

impl NotesClient {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    pub fn from_config(config: &Config, session: Arc<SessionStore>) -> Result<Self, ApiError> {
        Ok(Self::new(Gateway::from_config(config, session)?))
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        self.gateway.session()
    }

    // ===== Auth =====

    /// Log in with username and password and store the access token.
    /// The server also sets the refresh cookie on this response.
    ///
    /// Sent without refresh handling: a 401 here means bad credentials.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ApiError> {
        let request = ApiRequest::post(LOGIN_PATH).json(&LoginRequest { username, password })?;
        let response = self.gateway.execute_once(&request).await?;
        let login: LoginResponse = response.json()?;

        self.session().set_credentials(login.access_token);
        info!(username = username, "Logged in");
        Ok(())
    }

    /// Log out on the server and clear the local session.
    /// The session is cleared even if the server call fails.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let result = self
            .gateway
            .execute_once(&ApiRequest::post(LOGOUT_PATH))
            .await;
        self.session().log_out();

        match result {
            Ok(_) => {
                info!("Logged out");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Server logout failed, local session cleared anyway");
                Err(e)
            }
        }
    }

    /// Obtain an access token from the refresh cookie alone (persistent login)
    pub async fn restore_session(&self) -> Result<(), ApiError> {
        self.gateway.refresh().await.map(|_| ())
    }

    // ===== Notes =====

    /// Fetch one page of notes matching the query
    pub async fn list_notes(&self, query: &NoteQuery) -> Result<NotePage, ApiError> {
        let request = ApiRequest::get(NOTES_PATH).query_pairs(query.to_params());
        let page: NotePage = self.gateway.execute(&request).await?.json()?;
        debug!(
            page = query.current_page(),
            returned = page.notes.len(),
            total = page.total,
            "Fetched notes"
        );
        Ok(page)
    }

    pub async fn get_note(&self, id: NoteId) -> Result<Note, ApiError> {
        let request = ApiRequest::get(Self::note_path(id));
        self.gateway.execute(&request).await?.json()
    }

    pub async fn create_note(&self, note: &NewNote) -> Result<Note, ApiError> {
        note.validate()?;
        let request = ApiRequest::post(NOTES_PATH).json(note)?;
        let created: Note = self.gateway.execute(&request).await?.json()?;
        info!(id = created.note_id, "Note created");
        Ok(created)
    }

    pub async fn update_note(&self, id: NoteId, changes: &NoteChanges) -> Result<Note, ApiError> {
        if changes.is_empty() {
            return Err(ApiError::InvalidRequest("no changes given".to_string()));
        }
        let request = ApiRequest::patch(Self::note_path(id)).json(changes)?;
        self.gateway.execute(&request).await?.json()
    }

    pub async fn delete_note(&self, id: NoteId) -> Result<(), ApiError> {
        let request = ApiRequest::delete(Self::note_path(id));
        self.gateway.execute(&request).await?;
        info!(id = id, "Note deleted");
        Ok(())
    }

    // ===== Bulk =====

    /// Apply the same changes to every listed note
    pub async fn bulk_update(&self, ids: &[NoteId], changes: &NoteChanges) -> BulkReport {
        let this = self;
        let results = stream::iter(Self::unique(ids))
            .map(move |id| async move { (id, this.update_note(id, changes).await.map(|_| ())) })
            .buffer_unordered(MAX_CONCURRENT_REQUESTS)
            .collect::<Vec<_>>()
            .await;
        Self::report(results)
    }

    /// Delete every listed note
    pub async fn bulk_delete(&self, ids: &[NoteId]) -> BulkReport {
        let this = self;
        let results = stream::iter(Self::unique(ids))
            .map(move |id| async move { (id, this.delete_note(id).await) })
            .buffer_unordered(MAX_CONCURRENT_REQUESTS)
            .collect::<Vec<_>>()
            .await;
        Self::report(results)
    }

    fn note_path(id: NoteId) -> String {
        format!("{}/{}", NOTES_PATH, id)
    }

    /// Drop repeated ids, keeping first-seen order
    fn unique(ids: &[NoteId]) -> Vec<NoteId> {
        let mut seen = HashSet::new();
        ids.iter().copied().filter(|id| seen.insert(*id)).collect()
    }

    fn report(results: Vec<(NoteId, Result<(), ApiError>)>) -> BulkReport {
        let mut report = BulkReport::default();
        for (id, result) in results {
            match result {
                Ok(()) => report.succeeded.push(id),
                Err(e) => {
                    warn!(id = id, error = %e, "Bulk item failed");
                    report.failed.push((id, e));
                }
            }
        }
        report.succeeded.sort_unstable();
        report.failed.sort_by_key(|(id, _)| *id);
        debug!(summary = %report.summary(), "Bulk operation finished");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_path() {
        assert_eq!(NotesClient::note_path(42), "/notes/42");
    }

    #[test]
    fn test_unique_keeps_order() {
        assert_eq!(NotesClient::unique(&[3, 1, 3, 2, 1]), vec![3, 1, 2]);
        assert!(NotesClient::unique(&[]).is_empty());
    }

    #[test]
    fn test_report_sorts_and_splits() {
        let report = NotesClient::report(vec![
            (5, Ok(())),
            (2, Err(ApiError::SessionExpired)),
            (1, Ok(())),
        ]);
        assert_eq!(report.succeeded, vec![1, 5]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, 2);
        assert!(report.session_expired());
        assert!(!report.is_complete_success());
        assert_eq!(report.summary(), "2 succeeded, 1 failed");
    }

    #[test]
    fn test_login_body_shape() {
        let body = serde_json::to_value(LoginRequest {
            username: "dave",
            password: "pw",
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"username": "dave", "password": "pw"}));
    }
}
