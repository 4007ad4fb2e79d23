//! Query values handed to the store
//!
//! A [`FindQuery`] is the chainable equivalent of a document-store cursor:
//! criteria, skip, limit, sort, projection and relation expansion.
//!
//! # Example
//!
//! ```rust
//! use resource_api::repository::{FindQuery, Populate, SortDirection, SortSpec};
//! use serde_json::json;
//!
//! let query = FindQuery::new(json!({ "type": "book" }))
//!     .skip(20)
//!     .limit(10)
//!     .sort(SortSpec::single("created", SortDirection::Descending))
//!     .populate(vec![Populate::path("author")]);
//!
//! assert_eq!(query.skip, 20);
//! assert_eq!(query.limit, 10);
//! ```

use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// An opaque store predicate
pub type Criteria = Value;

/// The predicate matching every document
pub fn match_all() -> Criteria {
    Value::Object(Map::new())
}

/// Direction of a sort key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// Ascending, encoded as `1`
    #[default]
    Ascending,
    /// Descending, encoded as `-1`
    Descending,
}

impl SortDirection {
    /// Numeric encoding used by document stores
    #[must_use]
    pub const fn as_i8(&self) -> i8 {
        match self {
            Self::Ascending => 1,
            Self::Descending => -1,
        }
    }

    /// Negative numbers sort descending, everything else ascending
    #[must_use]
    pub const fn from_number(value: i64) -> Self {
        if value < 0 {
            Self::Descending
        } else {
            Self::Ascending
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i8())
    }
}

/// Ordered sort specification, field name to direction
///
/// Key order is significant, the first key is the primary sort.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSpec(Vec<(String, SortDirection)>);

impl SortSpec {
    /// An empty specification (store order)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A single-key specification
    #[must_use]
    pub fn single(field: impl Into<String>, direction: SortDirection) -> Self {
        Self(vec![(field.into(), direction)])
    }

    /// Set the direction for `field`, keeping its original position if present
    pub fn push(&mut self, field: impl Into<String>, direction: SortDirection) {
        let field = field.into();
        match self.0.iter_mut().find(|(name, _)| *name == field) {
            Some(entry) => entry.1 = direction,
            None => self.0.push((field, direction)),
        }
    }

    /// Direction for `field`, if sorted on
    pub fn get(&self, field: &str) -> Option<SortDirection> {
        self.0
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, direction)| *direction)
    }

    /// Iterate keys in priority order
    pub fn iter(&self) -> impl Iterator<Item = (&str, SortDirection)> {
        self.0.iter().map(|(name, direction)| (name.as_str(), *direction))
    }

    /// Number of sort keys
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no sort keys are set
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for SortSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, direction) in &self.0 {
            map.serialize_entry(field, &direction.as_i8())?;
        }
        map.end()
    }
}

/// A relation to expand when loading documents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Populate {
    /// Path of the reference field
    pub path: String,
    /// Projection applied to the related documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select: Option<String>,
}

impl Populate {
    /// Expand `path` with every field of the related document
    pub fn path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            select: None,
        }
    }

    /// Restrict the fields loaded from the related document
    #[must_use]
    pub fn with_select(mut self, select: impl Into<String>) -> Self {
        self.select = Some(select.into());
        self
    }
}

/// A find request against the store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FindQuery {
    /// Predicate documents must match
    pub criteria: Criteria,
    /// Number of matching documents to skip
    pub skip: u64,
    /// Maximum number of documents to return, 0 meaning no limit
    pub limit: u64,
    /// Sort order
    pub sort: SortSpec,
    /// Field projection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select: Option<String>,
    /// Relations to expand
    pub populate: Vec<Populate>,
}

impl FindQuery {
    /// Start a query for `criteria`
    #[must_use]
    pub fn new(criteria: Criteria) -> Self {
        Self {
            criteria,
            skip: 0,
            limit: 0,
            sort: SortSpec::new(),
            select: None,
            populate: Vec::new(),
        }
    }

    /// Set the maximum number of documents to return
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// Set the number of documents to skip
    #[must_use]
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    /// Set the sort order
    #[must_use]
    pub fn sort(mut self, sort: SortSpec) -> Self {
        self.sort = sort;
        self
    }

    /// Set the field projection
    #[must_use]
    pub fn select(mut self, select: Option<String>) -> Self {
        self.select = select;
        self
    }

    /// Set the relations to expand
    #[must_use]
    pub fn populate(mut self, populate: Vec<Populate>) -> Self {
        self.populate = populate;
        self
    }
}
