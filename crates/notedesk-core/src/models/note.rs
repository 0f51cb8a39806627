use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::api::ApiError;

pub type NoteId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub note_id: NoteId,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub deadline: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Note {
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.deadline.map(|d| d < today).unwrap_or(false)
    }

    pub fn deadline_display(&self) -> String {
        match self.deadline {
            Some(d) => d.format("%d/%m/%Y").to_string(),
            None => "-".to_string(),
        }
    }
}

/// One page of the notes list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotePage {
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub pages: u32,
}

/// Body for creating a note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNote {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
}

impl NewNote {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: String::new(),
            deadline: None,
        }
    }

    /// Reject notes the server would refuse anyway
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.title.trim().is_empty() {
            return Err(ApiError::InvalidRequest("note title is required".to_string()));
        }
        Ok(())
    }
}

/// Partial update; absent fields are left unchanged on the server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
}

impl NoteChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.deadline.is_none()
    }
}

/// Per-note outcome of a bulk operation
#[derive(Debug, Default)]
pub struct BulkReport {
    pub succeeded: Vec<NoteId>,
    pub failed: Vec<(NoteId, ApiError)>,
}

impl BulkReport {
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Whether any item failed because the session expired
    pub fn session_expired(&self) -> bool {
        self.failed.iter().any(|(_, e)| e.is_session_expired())
    }

    pub fn summary(&self) -> String {
        format!("{} succeeded, {} failed", self.succeeded.len(), self.failed.len())
    }
}
