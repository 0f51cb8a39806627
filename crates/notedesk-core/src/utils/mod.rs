//! Utility functions for display formatting.

pub mod format;

// Re-export commonly used functions at module level
pub use format::{describe_filters, format_date, format_timestamp, truncate_string};
