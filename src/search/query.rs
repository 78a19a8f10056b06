//! Immutable description of one search request.

use super::{
    error::{Result, SearchError},
    level::LogLevel,
    range::TimeRange,
};
use once_cell::sync::Lazy;
use regex::Regex;

static LEVEL_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"level:\s*([A-Za-z]+)").expect("level token regex"));

/// A search over one time window.
///
/// Built once through [`SearchQueryBuilder`]; afterwards only the range can be
/// swapped, via [`SearchQuery::with_range`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    range: TimeRange,
    text: String,
    limit: Option<u32>,
    offset: Option<u32>,
    filter: Option<String>,
    fields: Option<Vec<String>>,
    sort: Option<String>,
    ascending: bool,
}

impl SearchQuery {
    pub fn builder(range: TimeRange, text: impl Into<String>) -> SearchQueryBuilder {
        SearchQueryBuilder {
            range,
            text: text.into(),
            limit: None,
            offset: None,
            filter: None,
            fields: None,
            sort: None,
            ascending: false,
        }
    }

    /// Copy of this query searching `range` instead
    pub fn with_range(&self, range: TimeRange) -> Self {
        Self { range, ..self.clone() }
    }

    pub fn range(&self) -> &TimeRange {
        &self.range
    }

    /// Filter text with any level name already replaced by its code
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    pub fn offset(&self) -> Option<u32> {
        self.offset
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn fields(&self) -> Option<&[String]> {
        self.fields.as_deref()
    }

    pub fn sort(&self) -> Option<&str> {
        self.sort.as_deref()
    }

    pub fn ascending(&self) -> bool {
        self.ascending
    }

    /// `<field>:asc` or `<field>:desc`; `None` keeps the server's ordering
    pub fn sort_param(&self) -> Option<String> {
        self.sort.as_ref().map(|field| {
            format!("{}:{}", field, if self.ascending { "asc" } else { "desc" })
        })
    }
}

pub struct SearchQueryBuilder {
    range: TimeRange,
    text: String,
    limit: Option<u32>,
    offset: Option<u32>,
    filter: Option<String>,
    fields: Option<Vec<String>>,
    sort: Option<String>,
    ascending: bool,
}

impl SearchQueryBuilder {
    pub fn with_limit(mut self, limit: Option<u32>) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: Option<u32>) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_fields(mut self, fields: Option<Vec<String>>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_sort(mut self, sort: Option<String>, ascending: bool) -> Self {
        self.sort = sort;
        self.ascending = ascending;
        self
    }

    /// Normalize the filter text and freeze the query
    pub fn build(self) -> Result<SearchQuery> {
        Ok(SearchQuery {
            range: self.range,
            text: replace_level_name(&self.text)?,
            limit: self.limit,
            offset: self.offset,
            filter: self.filter,
            fields: self.fields,
            sort: self.sort,
            ascending: self.ascending,
        })
    }
}

/// Rewrite the first `level:<NAME>` token to `level:<code>`.
///
/// Later occurrences are left untouched.
pub fn replace_level_name(text: &str) -> Result<String> {
    let Some(captures) = LEVEL_TOKEN.captures(text) else {
        return Ok(text.to_string());
    };

    let (whole, name) = match (captures.get(0), captures.get(1)) {
        (Some(whole), Some(name)) => (whole, name.as_str()),
        _ => return Ok(text.to_string()),
    };
    let level = LogLevel::from_name(name).ok_or_else(|| SearchError::InvalidLevel {
        name: name.to_uppercase(),
        allowed: LogLevel::vocabulary(),
    })?;

    let mut rewritten = String::with_capacity(text.len());
    rewritten.push_str(&text[..whole.start()]);
    rewritten.push_str(&format!("level:{}", level.code()));
    rewritten.push_str(&text[whole.end()..]);
    Ok(rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn range() -> TimeRange {
        TimeRange::absolute(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 5, 0).unwrap()),
        )
    }

    #[test]
    fn level_name_is_replaced_by_code() {
        assert_eq!(replace_level_name("level:info").unwrap(), "level:6");
        assert_eq!(replace_level_name("level:INFO").unwrap(), "level:6");
        assert_eq!(
            replace_level_name("source:api AND level: Error AND x").unwrap(),
            "source:api AND level:3 AND x"
        );
        assert_eq!(replace_level_name("no level here").unwrap(), "no level here");
        assert_eq!(replace_level_name("level:4").unwrap(), "level:4");
    }

    #[test]
    fn only_first_level_token_is_replaced() {
        assert_eq!(
            replace_level_name("level:debug OR level:critical").unwrap(),
            "level:7 OR level:critical"
        );
    }

    #[test]
    fn unknown_level_fails_construction() {
        let err = SearchQuery::builder(range(), "level:bogus").build().unwrap_err();
        match err {
            SearchError::InvalidLevel { name, allowed } => {
                assert_eq!(name, "BOGUS");
                assert!(allowed.contains("CRITICAL"));
                assert!(allowed.contains("DEBUG"));
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn with_range_only_replaces_range() {
        let query = SearchQuery::builder(range(), "level:warning AND app:web")
            .with_limit(Some(25))
            .with_offset(Some(5))
            .with_filter(Some("streams:abc".to_string()))
            .with_fields(Some(vec!["message".to_string(), "source".to_string()]))
            .with_sort(Some("timestamp".to_string()), true)
            .build()
            .unwrap();

        let new_range = TimeRange::relative(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
        let moved = query.with_range(new_range);

        assert_eq!(moved.range(), &new_range);
        assert_eq!(moved.text(), "level:4 AND app:web");
        assert_eq!(moved.limit(), Some(25));
        assert_eq!(moved.offset(), Some(5));
        assert_eq!(moved.filter(), Some("streams:abc"));
        assert_eq!(moved.fields(), query.fields());
        assert_eq!(moved.sort(), Some("timestamp"));
        assert!(moved.ascending());
        assert_eq!(moved.with_range(*query.range()), query);
    }

    #[test]
    fn sort_param_serialization() {
        let asc = SearchQuery::builder(range(), "*")
            .with_sort(Some("level".to_string()), true)
            .build()
            .unwrap();
        assert_eq!(asc.sort_param().as_deref(), Some("level:asc"));

        let desc = SearchQuery::builder(range(), "*")
            .with_sort(Some("level".to_string()), false)
            .build()
            .unwrap();
        assert_eq!(desc.sort_param().as_deref(), Some("level:desc"));

        let unsorted = SearchQuery::builder(range(), "*").build().unwrap();
        assert_eq!(unsorted.sort_param(), None);
    }
}
