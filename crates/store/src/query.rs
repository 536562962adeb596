//! Filters, sorts and updates.

use crate::document::{compare_values, get_path, push_path, set_path, sort_cmp, values_equal};
use crate::document::Document;
use crate::error::StoreResult;
use serde_json::Value;
use std::cmp::Ordering;

/// A predicate over documents.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    /// Matches every document.
    All,
    /// The value at `field` equals `value`.
    Eq { field: String, value: Value },
    /// The value at `field` lies within the inclusive bounds. A missing bound is open.
    Range {
        field: String,
        gte: Option<Value>,
        lte: Option<Value>,
    },
    /// Every inner filter matches.
    And(Vec<Filter>),
}

impl Filter {
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Inclusive range on `field`.
    ///
    /// With neither bound supplied this collapses to [`Filter::All`], so callers can pass
    /// optional query parameters straight through.
    pub fn range(field: impl Into<String>, gte: Option<Value>, lte: Option<Value>) -> Self {
        if gte.is_none() && lte.is_none() {
            return Filter::All;
        }
        Filter::Range {
            field: field.into(),
            gte,
            lte,
        }
    }

    /// Conjunction of `self` and `other`.
    pub fn and(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::All, f) | (f, Filter::All) => f,
            (Filter::And(mut left), Filter::And(right)) => {
                left.extend(right);
                Filter::And(left)
            }
            (Filter::And(mut left), f) => {
                left.push(f);
                Filter::And(left)
            }
            (f, Filter::And(mut right)) => {
                right.insert(0, f);
                Filter::And(right)
            }
            (left, right) => Filter::And(vec![left, right]),
        }
    }

    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq { field, value } => {
                get_path(document, field).is_some_and(|actual| values_equal(actual, value))
            }
            Filter::Range { field, gte, lte } => {
                let Some(actual) = get_path(document, field) else {
                    return false;
                };
                let above_lower = gte.as_ref().map_or(true, |lower| {
                    matches!(
                        compare_values(actual, lower),
                        Some(Ordering::Greater | Ordering::Equal)
                    )
                });
                let below_upper = lte.as_ref().map_or(true, |upper| {
                    matches!(
                        compare_values(actual, upper),
                        Some(Ordering::Less | Ordering::Equal)
                    )
                });
                above_lower && below_upper
            }
            Filter::And(filters) => filters.iter().all(|f| f.matches(document)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Sort on a single field.
#[derive(Clone, Debug, PartialEq)]
pub struct Sort {
    pub field: String,
    pub order: SortOrder,
}

impl Sort {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Ascending,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Descending,
        }
    }

    pub(crate) fn compare(&self, a: &Document, b: &Document) -> Ordering {
        let ordering = sort_cmp(get_path(a, &self.field), get_path(b, &self.field));
        match self.order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }
}

/// Filter, optional sort and optional limit for [`crate::DocumentStore::find`].
#[derive(Clone, Debug, PartialEq)]
pub struct FindQuery {
    pub filter: Filter,
    pub sort: Option<Sort>,
    pub limit: Option<usize>,
}

impl FindQuery {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            sort: None,
            limit: None,
        }
    }

    pub fn all() -> Self {
        Self::new(Filter::All)
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sorts (stable, so ties keep insertion order) and truncates already-filtered documents.
    pub(crate) fn finish(&self, mut documents: Vec<Document>) -> Vec<Document> {
        if let Some(sort) = &self.sort {
            documents.sort_by(|a, b| sort.compare(a, b));
        }
        if let Some(limit) = self.limit {
            documents.truncate(limit);
        }
        documents
    }
}

/// A partial update: overwrite values at paths, then append onto arrays.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Update {
    set: Vec<(String, Value)>,
    push: Vec<(String, Value)>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set.push((path.into(), value.into()));
        self
    }

    pub fn push(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push.push((path.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.push.is_empty()
    }

    pub(crate) fn apply(&self, document: &mut Document) -> StoreResult<()> {
        for (path, value) in &self.set {
            set_path(document, path, value.clone())?;
        }
        for (path, value) in &self.push {
            push_path(document, path, value.clone())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().expect("test document must be an object")
    }

    #[test]
    fn test_range_is_inclusive_on_both_bounds() {
        let filter = Filter::range(
            "timestamp",
            Some(json!("2024-01-01T00:00:00Z")),
            Some(json!("2024-01-01T00:10:00Z")),
        );
        assert!(filter.matches(&doc(json!({"timestamp": "2024-01-01T00:00:00Z"}))));
        assert!(filter.matches(&doc(json!({"timestamp": "2024-01-01T00:10:00.000Z"}))));
        assert!(!filter.matches(&doc(json!({"timestamp": "2024-01-01T00:10:00.001Z"}))));
        assert!(!filter.matches(&doc(json!({}))));
    }

    #[test]
    fn test_range_without_bounds_is_all() {
        assert_eq!(Filter::range("timestamp", None, None), Filter::All);
    }

    #[test]
    fn test_and_flattens_and_drops_all() {
        let f = Filter::All
            .and(Filter::equals("a", 1))
            .and(Filter::equals("b", 2))
            .and(Filter::All);
        assert_eq!(
            f,
            Filter::And(vec![Filter::equals("a", 1), Filter::equals("b", 2)])
        );
        assert!(f.matches(&doc(json!({"a": 1, "b": 2.0}))));
        assert!(!f.matches(&doc(json!({"a": 1}))));
    }

    #[test]
    fn test_find_query_sorts_descending_then_limits() {
        let docs = vec![
            doc(json!({"n": 1})),
            doc(json!({"n": 3})),
            doc(json!({})),
            doc(json!({"n": 2})),
        ];
        let out = FindQuery::all().sort(Sort::descending("n")).limit(2).finish(docs);
        assert_eq!(out, vec![doc(json!({"n": 3})), doc(json!({"n": 2}))]);
    }

    #[test]
    fn test_find_query_limit_zero_returns_nothing() {
        let out = FindQuery::all().limit(0).finish(vec![doc(json!({"n": 1}))]);
        assert!(out.is_empty());
    }

    #[test]
    fn test_update_sets_then_pushes() {
        let mut d = doc(json!({"status": "active", "events": []}));
        Update::new()
            .set("status", "completed")
            .set("nested.value", 5)
            .push("events", json!({"type": "quake"}))
            .apply(&mut d)
            .expect("update should apply");
        assert_eq!(
            d,
            doc(json!({
                "status": "completed",
                "nested": {"value": 5},
                "events": [{"type": "quake"}]
            }))
        );
    }
}
