//! Data models for the notes service.
//!
//! - `Note`, `NotePage`: records and list pages returned by the API
//! - `NewNote`, `NoteChanges`: create and partial-update bodies
//! - `NoteQuery`, `DateFilter`: list parameters (paging, search, date range)
//! - `BulkReport`: per-note outcome of bulk edits

pub mod note;
pub mod query;

pub use note::{BulkReport, NewNote, Note, NoteChanges, NoteId, NotePage};
pub use query::{page_count, DateFilter, NoteQuery, DEFAULT_PER_PAGE};
