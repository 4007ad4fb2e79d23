//! Query parsing for list and statistics operations
//!
//! Turns loosely typed query-string values into a bounded [`ApiQuery`]:
//! pagination, sort, allow-listed filters and date ranges. None of the
//! functions in this module fail. Unparseable input falls back to a
//! documented default.
//!
//! # Example
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use resource_api::config::ControllerConfig;
//! use resource_api::handlers::QueryParser;
//!
//! let mut raw = BTreeMap::new();
//! raw.insert("offset".to_string(), "20".to_string());
//! raw.insert("sort".to_string(), r#"{"created": -1}"#.to_string());
//! raw.insert("filter".to_string(), "{'type': 'book', 'owner': 'bob'}".to_string());
//!
//! let query = QueryParser::from_config(&ControllerConfig::default()).parse(raw);
//!
//! assert_eq!(query.offset, 20);
//! assert_eq!(query.limit, 100);
//! assert_eq!(query.allowed_filter_values.get("type").map(String::as_str), Some("book"));
//! assert!(query.allowed_filter_values.get("owner").is_none());
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::config::ControllerConfig;
use crate::repository::{Criteria, FindQuery, Populate, SortDirection, SortSpec};

/// Query-string key holding the pagination offset
pub const OFFSET_PARAM: &str = "offset";

/// Query-string key holding the page size
pub const LIMIT_PARAM: &str = "limit";

/// Query-string key holding the sort specification
pub const SORT_PARAM: &str = "sort";

/// Query-string key holding the JSON filter object
pub const FILTER_PARAM: &str = "filter";

/// Query-string key holding the criteria used for the `total` count
pub const TOTAL_PARAM: &str = "total";

/// Normalized list query
///
/// Built by [`QueryParser::parse`] and optionally rewritten by a
/// [`QueryBuilder`](super::QueryBuilder) before it reaches the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiQuery {
    /// Predicate passed to the store
    pub criteria: Criteria,
    /// Number of documents to skip
    pub offset: u64,
    /// Maximum number of documents to return
    pub limit: u64,
    /// Sort order
    pub sort: SortSpec,
    /// Field projection
    pub select: Option<String>,
    /// Relations to expand
    pub populate: Vec<Populate>,
    /// Allow-listed filter values, stringified
    pub allowed_filter_values: BTreeMap<String, String>,
    /// The untouched query-string map
    pub raw: BTreeMap<String, String>,
}

impl Default for ApiQuery {
    fn default() -> Self {
        Self {
            criteria: Value::Object(Map::new()),
            offset: 0,
            limit: 0,
            sort: SortSpec::new(),
            select: None,
            populate: Vec::new(),
            allowed_filter_values: BTreeMap::new(),
            raw: BTreeMap::new(),
        }
    }
}

impl ApiQuery {
    /// Create an empty query over the raw query-string map
    #[must_use]
    pub fn new(raw: BTreeMap<String, String>) -> Self {
        Self {
            raw,
            ..Self::default()
        }
    }

    /// Set the store predicate
    #[must_use]
    pub fn with_criteria(mut self, criteria: Criteria) -> Self {
        self.criteria = criteria;
        self
    }

    /// Set the pagination offset
    #[must_use]
    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Set the page size
    #[must_use]
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// Set the sort order
    #[must_use]
    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = sort;
        self
    }

    /// Set the field projection
    #[must_use]
    pub fn with_select(mut self, select: impl Into<String>) -> Self {
        self.select = Some(select.into());
        self
    }

    /// Set the relations to expand
    #[must_use]
    pub fn with_populate(mut self, populate: Vec<Populate>) -> Self {
        self.populate = populate;
        self
    }

    /// A raw query-string value
    pub fn raw_value(&self, key: &str) -> Option<&str> {
        self.raw.get(key).map(String::as_str)
    }

    /// Translate into the store-side find request
    #[must_use]
    pub fn to_find_query(&self) -> FindQuery {
        FindQuery::new(self.criteria.clone())
            .skip(self.offset)
            .limit(self.limit)
            .sort(self.sort.clone())
            .select(self.select.clone())
            .populate(self.populate.clone())
    }
}

/// Builds the default [`ApiQuery`] for a list request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParser {
    default_offset: u64,
    default_limit: u64,
    max_limit: Option<u64>,
    filter_fields: Vec<String>,
}

impl QueryParser {
    /// Create a parser from the controller settings
    #[must_use]
    pub fn from_config(config: &ControllerConfig) -> Self {
        Self {
            default_offset: config.default_offset,
            default_limit: config.default_limit,
            max_limit: config.max_limit,
            filter_fields: config.filter_fields.clone(),
        }
    }

    /// Fields copied from the `filter` parameter
    pub fn filter_fields(&self) -> &[String] {
        &self.filter_fields
    }

    /// Effective offset for a raw value
    pub fn offset(&self, raw: Option<&str>) -> u64 {
        parse_pagination(raw, self.default_offset)
    }

    /// Effective limit for a raw value, clamped when a maximum is configured
    ///
    /// A zero limit means "unbounded" to the store, so it is clamped too.
    pub fn limit(&self, raw: Option<&str>) -> u64 {
        let limit = parse_pagination(raw, self.default_limit);
        match self.max_limit {
            Some(max) if limit == 0 || limit > max => max,
            _ => limit,
        }
    }

    /// Normalize a raw query-string map
    pub fn parse(&self, raw: BTreeMap<String, String>) -> ApiQuery {
        let offset = self.offset(raw.get(OFFSET_PARAM).map(String::as_str));
        let limit = self.limit(raw.get(LIMIT_PARAM).map(String::as_str));
        let sort = raw
            .get(SORT_PARAM)
            .filter(|value| !value.is_empty())
            .map(|value| parse_sort(value))
            .unwrap_or_default();

        let query = ApiQuery::new(raw)
            .with_offset(offset)
            .with_limit(limit)
            .with_sort(sort);

        parse_filter(query, &self.filter_fields)
    }
}

/// Parse an integer the way JavaScript's `parseInt(value, 10)` does
///
/// Leading whitespace and a sign are accepted and anything after the
/// leading digits is ignored. Returns `None` when there are no digits.
///
/// # Example
///
/// ```rust
/// use resource_api::handlers::parse_int;
///
/// assert_eq!(parse_int("10abc"), Some(10));
/// assert_eq!(parse_int("  -3"), Some(-3));
/// assert_eq!(parse_int("abc"), None);
/// ```
pub fn parse_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let mut value: i64 = 0;
    let mut seen = false;
    for digit in digits.bytes().take_while(u8::is_ascii_digit) {
        seen = true;
        let digit = i64::from(digit - b'0');
        value = value.saturating_mul(10).saturating_add(digit);
    }

    if !seen {
        return None;
    }
    Some(if negative { -value } else { value })
}

/// Normalize a pagination value
///
/// Absent, non-numeric and negative input yield `fallback`.
///
/// # Example
///
/// ```rust
/// use resource_api::handlers::parse_pagination;
///
/// assert_eq!(parse_pagination(Some("25"), 100), 25);
/// assert_eq!(parse_pagination(Some("many"), 100), 100);
/// assert_eq!(parse_pagination(None, 0), 0);
/// ```
pub fn parse_pagination(raw: Option<&str>, fallback: u64) -> u64 {
    raw.and_then(parse_int)
        .and_then(|value| u64::try_from(value).ok())
        .unwrap_or(fallback)
}

/// Parse a sort parameter
///
/// A JSON object maps fields to directions, where a negative number sorts
/// descending. Input that is not JSON at all is taken as a single field
/// name sorted ascending.
///
/// # Example
///
/// ```rust
/// use resource_api::handlers::parse_sort;
/// use resource_api::repository::SortDirection;
///
/// let sort = parse_sort(r#"{"created": -1, "name": 1}"#);
/// assert_eq!(sort.get("created"), Some(SortDirection::Descending));
/// assert_eq!(sort.get("name"), Some(SortDirection::Ascending));
///
/// assert_eq!(parse_sort("type").get("type"), Some(SortDirection::Ascending));
/// ```
pub fn parse_sort(raw: &str) -> SortSpec {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return SortSpec::new();
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(fields)) => {
            let mut sort = SortSpec::new();
            for (field, value) in fields {
                let direction = parse_int(&js_to_string(&value))
                    .map(SortDirection::from_number)
                    .unwrap_or_default();
                sort.push(field, direction);
            }
            sort
        }
        Ok(_) => SortSpec::new(),
        Err(_) => SortSpec::single(trimmed, SortDirection::Ascending),
    }
}

/// Copy allow-listed fields of the `filter` parameter into the query
///
/// Single quotes are accepted in place of double quotes. The copied values
/// are stringified and become the query's default criteria. Keys outside
/// `allowed_fields` are dropped.
pub fn parse_filter(mut query: ApiQuery, allowed_fields: &[String]) -> ApiQuery {
    let filter = query
        .raw
        .get(FILTER_PARAM)
        .and_then(|raw| serde_json::from_str::<Value>(&raw.replace('\'', "\"")).ok())
        .and_then(|value| match value {
            Value::Object(fields) => Some(fields),
            _ => None,
        })
        .unwrap_or_default();

    for field in allowed_fields {
        match filter.get(field) {
            None | Some(Value::Null) => {}
            Some(value) => {
                query
                    .allowed_filter_values
                    .insert(field.clone(), js_to_string(value));
            }
        }
    }

    if let Value::Object(criteria) = &mut query.criteria {
        for (field, value) in &query.allowed_filter_values {
            criteria.insert(field.clone(), Value::String(value.clone()));
        }
    }

    query
}

/// Stringify a JSON value like JavaScript's `toString`
pub fn js_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => match number.as_i64() {
            Some(int) => int.to_string(),
            None => number.as_f64().map(|f| f.to_string()).unwrap_or_default(),
        },
        Value::String(text) => text.clone(),
        Value::Array(items) => items.iter().map(js_to_string).collect::<Vec<_>>().join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Half-open interval of local instants `[from, to)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    /// First instant inside the range
    pub from: DateTime<Local>,
    /// First instant after the range
    pub to: DateTime<Local>,
}

impl DateRange {
    /// Store predicate selecting documents whose `date_field` lies in range
    ///
    /// # Example
    ///
    /// ```rust
    /// use resource_api::handlers::parse_date_range;
    ///
    /// let range = parse_date_range(Some("2018"), None).unwrap();
    /// let criteria = range.to_criteria("date");
    /// assert!(criteria["$and"][0]["date"]["$gte"].is_string());
    /// assert!(criteria["$and"][1]["date"]["$lt"].is_string());
    /// ```
    pub fn to_criteria(&self, date_field: &str) -> Criteria {
        json!({
            "$and": [
                { date_field: { "$gte": self.from } },
                { date_field: { "$lt": self.to } },
            ]
        })
    }
}

/// Derive a date range from `year` and `month` path values
///
/// With a month the range covers that calendar month (months outside 1-12
/// are clamped). Without a usable month it covers the whole year. Returns
/// `None` when the year is not a number.
///
/// # Example
///
/// ```rust
/// use resource_api::handlers::parse_date_range;
///
/// let december = parse_date_range(Some("2018"), Some("12")).unwrap();
/// assert_eq!(december.from.format("%Y-%m-%d").to_string(), "2018-12-01");
/// assert_eq!(december.to.format("%Y-%m-%d").to_string(), "2019-01-01");
///
/// assert!(parse_date_range(Some("foo"), None).is_none());
/// ```
pub fn parse_date_range(year: Option<&str>, month: Option<&str>) -> Option<DateRange> {
    let year = i32::try_from(year.and_then(parse_int)?).ok()?;
    let month = month
        .and_then(parse_int)
        .map(|month| month.clamp(1, 12) as u32);

    let (from, to) = match month {
        Some(12) => ((year, 12), (year.checked_add(1)?, 1)),
        Some(month) => ((year, month), (year, month + 1)),
        None => ((year, 1), (year.checked_add(1)?, 1)),
    };

    Some(DateRange {
        from: local_midnight(from.0, from.1)?,
        to: local_midnight(to.0, to.1)?,
    })
}

/// Start of the first day of `month` in local time
///
/// When midnight falls in a daylight-saving gap the first whole hour that
/// exists locally is used instead.
fn local_midnight(year: i32, month: u32) -> Option<DateTime<Local>> {
    let date = NaiveDate::from_ymd_opt(year, month, 1)?;
    local_day_start(&Local, date)
}

fn local_day_start<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Option<DateTime<Tz>> {
    (0..24)
        .filter_map(|hour| NaiveTime::from_hms_opt(hour, 0, 0))
        .find_map(|time| tz.from_local_datetime(&date.and_time(time)).earliest())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, FixedOffset, LocalResult, NaiveDateTime, Timelike, Utc};

    /// Zone whose clocks skip from 00:00 to 01:00 every day
    #[derive(Clone, Copy)]
    struct MidnightGap;

    impl MidnightGap {
        fn offset() -> FixedOffset {
            FixedOffset::east_opt(0).unwrap()
        }
    }

    impl TimeZone for MidnightGap {
        type Offset = FixedOffset;

        fn from_offset(_: &FixedOffset) -> Self {
            MidnightGap
        }

        fn offset_from_local_date(&self, _: &NaiveDate) -> LocalResult<FixedOffset> {
            LocalResult::Single(Self::offset())
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
            if local.hour() == 0 {
                LocalResult::None
            } else {
                LocalResult::Single(Self::offset())
            }
        }

        fn offset_from_utc_date(&self, _: &NaiveDate) -> FixedOffset {
            Self::offset()
        }

        fn offset_from_utc_datetime(&self, _: &NaiveDateTime) -> FixedOffset {
            Self::offset()
        }
    }

    fn raw(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn parser() -> QueryParser {
        QueryParser::from_config(&ControllerConfig::default())
    }

    #[test]
    fn test_parse_int_prefix_semantics() {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int("10abc"), Some(10));
        assert_eq!(parse_int("  7 "), Some(7));
        assert_eq!(parse_int("+5"), Some(5));
        assert_eq!(parse_int("-12"), Some(-12));
        assert_eq!(parse_int("1.9"), Some(1));
        assert_eq!(parse_int(""), None);
        assert_eq!(parse_int("-"), None);
        assert_eq!(parse_int("abc"), None);
    }

    #[test]
    fn test_parse_int_saturates() {
        assert_eq!(parse_int("99999999999999999999999"), Some(i64::MAX));
    }

    #[test]
    fn test_parse_pagination() {
        assert_eq!(parse_pagination(None, 100), 100);
        assert_eq!(parse_pagination(Some("abc"), 100), 100);
        assert_eq!(parse_pagination(Some("10"), 100), 10);
        assert_eq!(parse_pagination(Some("0"), 100), 0);
        assert_eq!(parse_pagination(Some("-4"), 0), 0);
        assert_eq!(parse_pagination(Some("5000"), 100), 5000);
    }

    #[test]
    fn test_parse_sort_field_name() {
        let sort = parse_sort("type");
        assert_eq!(sort, SortSpec::single("type", SortDirection::Ascending));
    }

    #[test]
    fn test_parse_sort_object() {
        let sort = parse_sort(r#"{"a": -1}"#);
        assert_eq!(sort, SortSpec::single("a", SortDirection::Descending));

        let sort = parse_sort(r#"{"propertyOne": -1, "propertyTwo": 1}"#);
        let keys: Vec<_> = sort.iter().collect();
        assert_eq!(
            keys,
            vec![
                ("propertyOne", SortDirection::Descending),
                ("propertyTwo", SortDirection::Ascending)
            ]
        );
    }

    #[test]
    fn test_parse_sort_coerces_values() {
        let sort = parse_sort(r#"{"a": "bad", "b": "-1", "c": -2.5, "d": true, "e": {}}"#);
        assert_eq!(sort.get("a"), Some(SortDirection::Ascending));
        assert_eq!(sort.get("b"), Some(SortDirection::Descending));
        assert_eq!(sort.get("c"), Some(SortDirection::Descending));
        assert_eq!(sort.get("d"), Some(SortDirection::Ascending));
        assert_eq!(sort.get("e"), Some(SortDirection::Ascending));
    }

    #[test]
    fn test_parse_sort_malformed_json() {
        let raw = r#"{"foo: 1"#;
        assert_eq!(parse_sort(raw), SortSpec::single(raw, SortDirection::Ascending));
    }

    #[test]
    fn test_parse_sort_non_object_json() {
        assert!(parse_sort("[1, 2]").is_empty());
        assert!(parse_sort("5").is_empty());
        assert!(parse_sort("   ").is_empty());
    }

    #[test]
    fn test_parse_filter_copies_allowed_fields_only() {
        let query = ApiQuery::new(raw(&[("filter", r#"{"type": 'foo', "bar": 'baz'}"#)]));
        let query = parse_filter(query, &["type".to_string()]);

        assert_eq!(query.allowed_filter_values.len(), 1);
        assert_eq!(query.allowed_filter_values["type"], "foo");
        assert_eq!(query.criteria, json!({ "type": "foo" }));
    }

    #[test]
    fn test_parse_filter_stringifies_values() {
        let query = ApiQuery::new(raw(&[(
            "filter",
            r#"{"type": 3, "deleted": false, "tags": ["a", 1], "meta": {"x": 1}, "gone": null}"#,
        )]));
        let fields: Vec<String> = ["type", "deleted", "tags", "meta", "gone"]
            .iter()
            .map(|f| f.to_string())
            .collect();
        let query = parse_filter(query, &fields);

        assert_eq!(query.allowed_filter_values["type"], "3");
        assert_eq!(query.allowed_filter_values["deleted"], "false");
        assert_eq!(query.allowed_filter_values["tags"], "a,1");
        assert_eq!(query.allowed_filter_values["meta"], "[object Object]");
        assert!(!query.allowed_filter_values.contains_key("gone"));
    }

    #[test]
    fn test_parse_filter_invalid_input() {
        let query = ApiQuery::new(raw(&[("filter", r#"{"bar": 'foo"#)]));
        let parsed = parse_filter(query.clone(), &["bar".to_string()]);
        assert_eq!(parsed, query);

        let query = ApiQuery::new(raw(&[("filter", "[1]")]));
        let parsed = parse_filter(query.clone(), &["bar".to_string()]);
        assert_eq!(parsed, query);
    }

    #[test]
    fn test_parser_defaults() {
        let query = parser().parse(BTreeMap::new());
        assert_eq!(query.offset, 0);
        assert_eq!(query.limit, 100);
        assert!(query.sort.is_empty());
        assert_eq!(query.criteria, json!({}));
        assert!(query.populate.is_empty());
    }

    #[test]
    fn test_parser_full_query() {
        let query = parser().parse(raw(&[
            ("offset", "10"),
            ("limit", "10"),
            ("sort", "name"),
            ("filter", "{'deleted': true, 'owner': 'x'}"),
            ("custom", "kept"),
        ]));

        assert_eq!(query.offset, 10);
        assert_eq!(query.limit, 10);
        assert_eq!(query.sort, SortSpec::single("name", SortDirection::Ascending));
        assert_eq!(query.criteria, json!({ "deleted": "true" }));
        assert_eq!(query.raw_value("custom"), Some("kept"));

        let find = query.to_find_query();
        assert_eq!(find.skip, 10);
        assert_eq!(find.limit, 10);
    }

    #[test]
    fn test_parser_max_limit() {
        let config = ControllerConfig {
            max_limit: Some(50),
            ..ControllerConfig::default()
        };
        let parser = QueryParser::from_config(&config);
        assert_eq!(parser.limit(Some("500")), 50);
        assert_eq!(parser.limit(None), 50);
        assert_eq!(parser.limit(Some("20")), 20);
        assert_eq!(parser.limit(Some("0")), 50);

        let query = parser.parse(raw(&[(LIMIT_PARAM, "0")]));
        assert_eq!(query.to_find_query().limit, 50);
    }

    #[test]
    fn test_parser_zero_limit_without_max() {
        let parser = QueryParser::from_config(&ControllerConfig::default());
        assert_eq!(parser.limit(Some("0")), 0);
    }

    #[test]
    fn test_day_start_is_midnight() {
        let date = NaiveDate::from_ymd_opt(2018, 3, 1).unwrap();
        let start = local_day_start(&Utc, date).unwrap();
        assert_eq!(start.naive_local(), date.and_time(NaiveTime::MIN));
    }

    #[test]
    fn test_day_start_skips_midnight_gap() {
        let date = NaiveDate::from_ymd_opt(2018, 3, 1).unwrap();
        let start = local_day_start(&MidnightGap, date).unwrap();
        assert_eq!(start.naive_local(), date.and_hms_opt(1, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_date_range_month() {
        let range = parse_date_range(Some("2018"), Some("12")).unwrap();
        assert_eq!((range.from.year(), range.from.month(), range.from.day()), (2018, 12, 1));
        assert_eq!((range.to.year(), range.to.month(), range.to.day()), (2019, 1, 1));
        assert_eq!(range.from.time(), NaiveTime::MIN);
    }

    #[test]
    fn test_parse_date_range_year() {
        let range = parse_date_range(Some("2018"), None).unwrap();
        assert_eq!((range.from.year(), range.from.month(), range.from.day()), (2018, 1, 1));
        assert_eq!((range.to.year(), range.to.month(), range.to.day()), (2019, 1, 1));

        let range = parse_date_range(Some("2018"), Some("abc")).unwrap();
        assert_eq!(range.from.month(), 1);
        assert_eq!(range.to.year(), 2019);
    }

    #[test]
    fn test_parse_date_range_clamps_month() {
        let range = parse_date_range(Some("2018"), Some("15")).unwrap();
        assert_eq!(range.from.month(), 12);
        assert_eq!(range.to.year(), 2019);

        let range = parse_date_range(Some("2018"), Some("0")).unwrap();
        assert_eq!(range.from.month(), 1);
        assert_eq!(range.to.month(), 2);
    }

    #[test]
    fn test_parse_date_range_invalid_year() {
        assert!(parse_date_range(Some("foo"), Some("3")).is_none());
        assert!(parse_date_range(None, None).is_none());
        assert!(parse_date_range(Some("99999999999"), None).is_none());
    }

    #[test]
    fn test_date_range_criteria_uses_field() {
        let range = parse_date_range(Some("2020"), Some("2")).unwrap();
        let criteria = range.to_criteria("published");
        let clauses = criteria["$and"].as_array().unwrap();
        assert_eq!(clauses.len(), 2);
        assert!(clauses[0]["published"]["$gte"].is_string());
        assert!(clauses[1]["published"]["$lt"].is_string());
    }
}
