use chrono::NaiveDate;

use crate::api::ApiError;

/// Page size used when a caller does not pick one
pub const DEFAULT_PER_PAGE: u32 = 10;

/// Inclusive date range for the notes list. At least one bound is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateFilter {
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

impl DateFilter {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Self, ApiError> {
        match (from, to) {
            (None, None) => Err(ApiError::InvalidQuery(
                "at least one date is required".to_string(),
            )),
            (Some(f), Some(t)) if f > t => Err(ApiError::InvalidQuery(format!(
                "from date {} is after to date {}",
                f, t
            ))),
            _ => Ok(Self { from, to }),
        }
    }

    pub fn from(&self) -> Option<NaiveDate> {
        self.from
    }

    pub fn to(&self) -> Option<NaiveDate> {
        self.to
    }
}

/// Parameters of a notes list request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteQuery {
    page: u32,
    per_page: u32,
    search: Option<String>,
    dates: Option<DateFilter>,
}

impl Default for NoteQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
            search: None,
            dates: None,
        }
    }
}

impl NoteQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pages are 1-based; 0 is treated as the first page
    pub fn page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page.max(1);
        self
    }

    /// Search term, trimmed and lowercased. Blank terms clear the search.
    pub fn search(mut self, term: &str) -> Self {
        let term = term.trim().to_lowercase();
        self.search = (!term.is_empty()).then_some(term);
        self
    }

    pub fn dates(mut self, filter: DateFilter) -> Self {
        self.dates = Some(filter);
        self
    }

    pub fn clear_filters(mut self) -> Self {
        self.search = None;
        self.dates = None;
        self
    }

    pub fn current_page(&self) -> u32 {
        self.page
    }

    pub fn items_per_page(&self) -> u32 {
        self.per_page
    }

    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn date_filter(&self) -> Option<&DateFilter> {
        self.dates.as_ref()
    }

    /// Query string parameters; absent values are omitted entirely
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("page".to_string(), self.page.to_string()),
            ("perPage".to_string(), self.per_page.to_string()),
        ];
        if let Some(ref term) = self.search {
            params.push(("search".to_string(), term.clone()));
        }
        if let Some(ref dates) = self.dates {
            if let Some(from) = dates.from {
                params.push(("fromDate".to_string(), from.format("%Y-%m-%d").to_string()));
            }
            if let Some(to) = dates.to {
                params.push(("toDate".to_string(), to.format("%Y-%m-%d").to_string()));
            }
        }
        params
    }
}

/// Number of pages needed to show `total` items
pub fn page_count(total: u64, per_page: u32) -> u64 {
    if per_page == 0 {
        return 0;
    }
    total.div_ceil(per_page as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_default_params() {
        let params = NoteQuery::new().to_params();
        assert_eq!(
            params,
            vec![
                ("page".to_string(), "1".to_string()),
                ("perPage".to_string(), "10".to_string()),
            ]
        );
    }

    #[test]
    fn test_search_is_normalized() {
        let query = NoteQuery::new().search("  Buy MILK ");
        assert_eq!(query.search_term(), Some("buy milk"));

        let query = query.search("   ");
        assert_eq!(query.search_term(), None);
    }

    #[test]
    fn test_full_params() {
        let filter = DateFilter::new(Some(date(2024, 1, 1)), None).unwrap();
        let params = NoteQuery::new()
            .page(3)
            .per_page(25)
            .search("milk")
            .dates(filter)
            .to_params();
        assert!(params.contains(&("page".to_string(), "3".to_string())));
        assert!(params.contains(&("perPage".to_string(), "25".to_string())));
        assert!(params.contains(&("search".to_string(), "milk".to_string())));
        assert!(params.contains(&("fromDate".to_string(), "2024-01-01".to_string())));
        assert!(!params.iter().any(|(k, _)| k == "toDate"));
    }

    #[test]
    fn test_page_zero_is_first_page() {
        assert_eq!(NoteQuery::new().page(0).current_page(), 1);
        assert_eq!(NoteQuery::new().per_page(0).items_per_page(), 1);
    }

    #[test]
    fn test_date_filter_validation() {
        assert!(matches!(DateFilter::new(None, None), Err(ApiError::InvalidQuery(_))));
        assert!(DateFilter::new(Some(date(2024, 2, 1)), Some(date(2024, 1, 1))).is_err());
        assert!(DateFilter::new(Some(date(2024, 1, 1)), Some(date(2024, 1, 1))).is_ok());
        assert!(DateFilter::new(None, Some(date(2024, 1, 1))).is_ok());
    }

    #[test]
    fn test_clear_filters_keeps_paging() {
        let filter = DateFilter::new(None, Some(date(2024, 1, 1))).unwrap();
        let query = NoteQuery::new().page(2).search("x").dates(filter).clear_filters();
        assert_eq!(query.current_page(), 2);
        assert_eq!(query.search_term(), None);
        assert_eq!(query.date_filter(), None);
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 10), 0);
        assert_eq!(page_count(5, 10), 1);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(11, 10), 2);
        assert_eq!(page_count(11, 0), 0);
    }
}
