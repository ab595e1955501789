//! List query model shared by every repository implementation.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::{Record, RepositoryError};

/// Pagination parameters for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
}

impl Pagination {
    pub const DEFAULT_LIMIT: u32 = 50;
    pub const MAX_LIMIT: u32 = 1000;

    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(Self::DEFAULT_LIMIT).clamp(1, Self::MAX_LIMIT),
            offset: offset.unwrap_or(0),
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// How a sortable/rangeable JSON field compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Case-insensitive string order.
    Text,
    Numeric,
    /// RFC 3339 timestamp.
    Timestamp,
    /// `YYYY-MM-DD` calendar date.
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub direction: Direction,
}

impl Sort {
    /// Parse `field` (ascending) or `-field` (descending).
    pub fn parse(raw: &str) -> Self {
        match raw.trim().strip_prefix('-') {
            Some(field) => Sort { field: field.to_string(), direction: Direction::Desc },
            None => Sort { field: raw.trim().to_string(), direction: Direction::Asc },
        }
    }
}

/// Inclusive bounds on a record's range field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn is_empty(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.is_none_or(|f| at >= f) && self.to.is_none_or(|t| at <= t)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Case-insensitive substring over the record's search fields.
    pub search: Option<String>,
    /// Exact matches on whitelisted fields, AND-ed.
    pub filters: Vec<(String, String)>,
    pub range: TimeRange,
    pub sort: Option<Sort>,
    pub pagination: Pagination,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn sorted_by(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn between(mut self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        self.range = TimeRange { from, to };
        self
    }

    pub fn paginate(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    /// Non-blank search term, trimmed.
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Check every field name against `R`'s whitelists and resolve them to
    /// their static names.
    pub fn resolve<R: Record>(&self) -> Result<ResolvedQuery<'_>, RepositoryError> {
        let mut filters = Vec::with_capacity(self.filters.len());
        for (field, value) in &self.filters {
            let name = R::FILTER_FIELDS
                .iter()
                .copied()
                .find(|f| *f == field.as_str())
                .ok_or_else(|| RepositoryError::InvalidQuery(format!("cannot filter {} by '{field}'", R::RESOURCE)))?;
            filters.push((name, value.as_str()));
        }

        let (sort_field, sort_kind, direction) = match &self.sort {
            Some(sort) => {
                let (name, kind) = R::SORT_FIELDS
                    .iter()
                    .copied()
                    .find(|(f, _)| *f == sort.field.as_str())
                    .ok_or_else(|| RepositoryError::InvalidQuery(format!("cannot sort {} by '{}'", R::RESOURCE, sort.field)))?;
                (name, kind, sort.direction)
            }
            None => {
                let (name, direction) = R::DEFAULT_SORT;
                let kind = R::SORT_FIELDS
                    .iter()
                    .find(|(f, _)| *f == name)
                    .map(|(_, k)| *k)
                    .unwrap_or(FieldKind::Text);
                (name, kind, direction)
            }
        };

        let range = if self.range.is_empty() {
            None
        } else {
            let (field, kind) = R::RANGE_FIELD.ok_or_else(|| {
                RepositoryError::InvalidQuery(format!("{} does not support from/to", R::RESOURCE))
            })?;
            Some((field, kind, self.range))
        };

        Ok(ResolvedQuery {
            search: self.search_term(),
            filters,
            range,
            sort_field,
            sort_kind,
            direction,
            pagination: self.pagination,
        })
    }
}

/// A [`ListQuery`] whose field names have been matched to a record's whitelist.
#[derive(Debug, Clone)]
pub struct ResolvedQuery<'q> {
    pub search: Option<&'q str>,
    pub filters: Vec<(&'static str, &'q str)>,
    pub range: Option<(&'static str, FieldKind, TimeRange)>,
    pub sort_field: &'static str,
    pub sort_kind: FieldKind,
    pub direction: Direction,
    pub pagination: Pagination,
}

/// One page of results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<R> {
    pub items: Vec<R>,
    /// Number of records matching the query across all pages.
    pub total: u64,
    pub pagination: Pagination,
    pub has_more: bool,
}

impl<R> Page<R> {
    pub fn new(items: Vec<R>, total: u64, pagination: Pagination) -> Self {
        let has_more = total > pagination.offset as u64 + items.len() as u64;
        Self { items, total, pagination, has_more }
    }
}

/// Render a JSON field the way Postgres' `->>` operator does.
pub(crate) fn field_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

pub(crate) fn field_time(value: &JsonValue, kind: FieldKind) -> Option<DateTime<Utc>> {
    let text = value.as_str()?;
    match kind {
        FieldKind::Timestamp => DateTime::parse_from_rfc3339(text).ok().map(|t| t.with_timezone(&Utc)),
        FieldKind::Date => NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|d| d.and_utc()),
        FieldKind::Text | FieldKind::Numeric => None,
    }
}
