use chrono::{DateTime, NaiveDate, Utc};

use crate::models::NoteQuery;

/// Truncate a string to a maximum number of characters, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Day/month/year, the format the notes UI uses
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    format_date(ts.date_naive())
}

/// One-line summary of the active filters, e.g.
/// `matching term 'milk', not older than 01/01/2024`
pub fn describe_filters(query: &NoteQuery) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(term) = query.search_term() {
        parts.push(format!("matching term '{}'", term));
    }
    if let Some(dates) = query.date_filter() {
        if let Some(from) = dates.from() {
            parts.push(format!("not older than {}", format_date(from)));
        }
        if let Some(to) = dates.to() {
            parts.push(format!("older than {}", format_date(to)));
        }
    }
    (!parts.is_empty()).then(|| parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DateFilter;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
        assert_eq!(truncate_string("héllo wörld", 6), "hél...");
    }

    #[test]
    fn test_format_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(format_date(date), "09/03/2024");
    }

    #[test]
    fn test_describe_filters() {
        assert_eq!(describe_filters(&NoteQuery::new()), None);

        let from = NaiveDate::from_ymd_opt(2024, 1, 1);
        let query = NoteQuery::new()
            .search("Milk")
            .dates(DateFilter::new(from, None).unwrap());
        assert_eq!(
            describe_filters(&query).as_deref(),
            Some("matching term 'milk', not older than 01/01/2024")
        );
    }
}
