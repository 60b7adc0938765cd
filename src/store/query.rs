// Copyright (c) 2025 - Cowboy AI, Inc.
//! Queries and batched writes
//!
//! Queries are evaluated in process by every backend through
//! [`Query::apply`], so filter and ordering semantics are identical for the
//! in-memory and NATS stores.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::{Collection, Document};

/// Field filter
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Field equals value (`id` matches the document id)
    Eq {
        /// Field name
        field: String,
        /// Expected value
        value: Value,
    },

    /// Field is strictly less than value (numbers numerically, strings
    /// lexicographically); documents without the field never match
    Lt {
        /// Field name
        field: String,
        /// Exclusive upper bound
        value: Value,
    },
}

impl Filter {
    fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::Eq { field, value } => lookup(doc, field).as_ref() == Some(value),
            Filter::Lt { field, value } => lookup(doc, field)
                .and_then(|actual| compare_values(&actual, value))
                .map(|ordering| ordering == Ordering::Less)
                .unwrap_or(false),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Smallest first
    Ascending,
    /// Largest first
    Descending,
}

/// Collection query
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Collection to read
    pub collection: Collection,
    /// All filters must match
    pub filters: Vec<Filter>,
    /// Sort field and direction; ties are broken by id in the same direction
    pub order_by: Option<(String, Direction)>,
    /// Maximum number of documents
    pub limit: Option<usize>,
}

impl Query {
    /// Query every document of a collection
    pub fn collection(collection: Collection) -> Self {
        Self {
            collection,
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    /// Add an equality filter
    pub fn filter_eq(mut self, field: impl Into<String>, value: Value) -> Self {
        self.filters.push(Filter::Eq {
            field: field.into(),
            value,
        });
        self
    }

    /// Add a less-than filter
    pub fn filter_lt(mut self, field: impl Into<String>, value: Value) -> Self {
        self.filters.push(Filter::Lt {
            field: field.into(),
            value,
        });
        self
    }

    /// Order results
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    /// Cap the result size
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a document satisfies every filter
    pub fn matches(&self, doc: &Document) -> bool {
        self.filters.iter().all(|filter| filter.matches(doc))
    }

    /// Filter, order and limit a set of documents of this query's collection
    pub fn apply(&self, docs: impl IntoIterator<Item = Document>) -> Vec<Document> {
        let mut selected: Vec<Document> = docs.into_iter().filter(|doc| self.matches(doc)).collect();

        if let Some((field, direction)) = &self.order_by {
            selected.sort_by(|a, b| {
                let primary = match (lookup(a, field), lookup(b, field)) {
                    (Some(x), Some(y)) => compare_values(&x, &y).unwrap_or(Ordering::Equal),
                    (Some(_), None) => Ordering::Greater,
                    (None, Some(_)) => Ordering::Less,
                    (None, None) => Ordering::Equal,
                };
                let ordering = primary.then_with(|| a.id.cmp(&b.id));
                match direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }

        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected
    }
}

fn lookup(doc: &Document, field: &str) -> Option<Value> {
    if field == "id" {
        return Some(Value::String(doc.id.clone()));
    }
    doc.data.get(field).cloned()
}

/// Compare two JSON scalars of the same kind
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
        },
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// One write inside a batch
#[derive(Debug, Clone, PartialEq)]
pub enum BatchWrite {
    /// Create a document with a store-assigned id
    Create {
        /// Target collection
        collection: Collection,
        /// Document fields
        data: Map<String, Value>,
    },

    /// Delete a document (absent documents are skipped)
    Delete {
        /// Target collection
        collection: Collection,
        /// Document id
        id: String,
    },
}

/// Ordered set of writes committed together
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    /// Writes in commit order
    pub writes: Vec<BatchWrite>,
}

impl WriteBatch {
    /// Empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a create
    pub fn create(&mut self, collection: Collection, data: Map<String, Value>) {
        self.writes.push(BatchWrite::Create { collection, data });
    }

    /// Queue a delete
    pub fn delete(&mut self, collection: Collection, id: impl Into<String>) {
        self.writes.push(BatchWrite::Delete {
            collection,
            id: id.into(),
        });
    }

    /// Number of queued writes
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    /// Whether the batch is empty
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}
