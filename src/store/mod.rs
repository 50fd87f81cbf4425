//! Document store abstraction
//!
//! This module defines the capability the pagination core is built on:
//! - Counting the documents matching a filter set
//! - Cursor range queries over an ordered, filtered collection
//!
//! Two backends are provided: [`MemoryStore`] (ordered in-memory
//! collections) and [`MongoStore`] (MongoDB through the official driver).

use async_trait::async_trait;
use bson::{Bson, Document};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{QueryError, StoreResult};

pub mod filter;
pub mod memory;
pub mod mongo;
pub mod ordering;

pub use filter::{Filter, FilterOp};
pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Field under which every returned document carries its store identifier.
pub const ID_FIELD: &str = "id";

/// Sort direction of the order field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    /// Sort value understood by MongoDB (`1` / `-1`)
    pub fn sort_value(self) -> i32 {
        match self {
            Direction::Asc => 1,
            Direction::Desc => -1,
        }
    }

    /// The opposite direction
    pub fn reversed(self) -> Self {
        match self {
            Direction::Asc => Direction::Desc,
            Direction::Desc => Direction::Asc,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Asc => write!(f, "asc"),
            Direction::Desc => write!(f, "desc"),
        }
    }
}

impl FromStr for Direction {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" | "ascending" | "1" => Ok(Direction::Asc),
            "desc" | "descending" | "-1" => Ok(Direction::Desc),
            other => Err(QueryError::InvalidSpec(format!(
                "unknown sort direction '{other}'"
            ))),
        }
    }
}

/// Position of one document under the active ordering.
///
/// `value` is the order field's value (null when absent) and `key` the
/// store identifier that breaks ties between equal values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    pub value: Bson,
    pub key: Bson,
}

impl Cursor {
    pub fn new(value: impl Into<Bson>, key: impl Into<Bson>) -> Self {
        Self {
            value: value.into(),
            key: key.into(),
        }
    }

    /// Whether both cursors point at the same document
    pub fn same_document(&self, other: &Cursor) -> bool {
        self.key == other.key
    }
}

/// Where a range query starts or ends
#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
    /// From the beginning of the ordering
    Start,

    /// Strictly after the cursor
    After(Cursor),

    /// The trailing `limit` documents strictly before the cursor
    BeforeLast(Cursor),
}

/// A single range query against a collection
#[derive(Debug, Clone, PartialEq)]
pub struct PageQuery {
    pub collection: String,
    pub order_field: String,
    pub direction: Direction,
    pub filters: Vec<Filter>,
    pub limit: usize,
    pub bound: Bound,
}

/// One bounded batch of documents plus the cursors of its first and last entry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub documents: Vec<Document>,
    pub first: Option<Cursor>,
    pub last: Option<Cursor>,
}

impl Page {
    /// Build a page from `(cursor, document)` pairs already in ordering order
    pub fn from_positioned(entries: Vec<(Cursor, Document)>) -> Self {
        let first = entries.first().map(|(c, _)| c.clone());
        let last = entries.last().map(|(c, _)| c.clone());
        Self {
            documents: entries.into_iter().map(|(_, d)| d).collect(),
            first,
            last,
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Ordered document collection with count and cursor range queries
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Count the documents of `collection` matching every filter
    async fn count(&self, collection: &str, filters: &[Filter]) -> StoreResult<u64>;

    /// Run one range query and return the page with its boundary cursors
    async fn query_page(&self, query: &PageQuery) -> StoreResult<Page>;
}

/// Resolve a possibly dotted field path inside a document
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Bson::Document(inner) => inner.get(part)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Render a store key the way it is merged into documents under [`ID_FIELD`]
pub fn key_to_id(key: &Bson) -> Bson {
    match key {
        Bson::ObjectId(oid) => Bson::String(oid.to_hex()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn test_direction_parsing() {
        assert_eq!("asc".parse::<Direction>().unwrap(), Direction::Asc);
        assert_eq!("DESC".parse::<Direction>().unwrap(), Direction::Desc);
        assert!("sideways".parse::<Direction>().is_err());
        assert_eq!(Direction::Asc.reversed(), Direction::Desc);
        assert_eq!(Direction::Desc.sort_value(), -1);
    }

    #[test]
    fn test_lookup_nested_path() {
        let doc = doc! { "meta": { "owner": { "name": "Alice" } }, "count": 3 };
        assert_eq!(
            lookup(&doc, "meta.owner.name"),
            Some(&Bson::String("Alice".to_string()))
        );
        assert_eq!(lookup(&doc, "count"), Some(&Bson::Int32(3)));
        assert_eq!(lookup(&doc, "count.inner"), None);
        assert_eq!(lookup(&doc, "missing"), None);
    }

    #[test]
    fn test_page_from_positioned() {
        let page = Page::from_positioned(vec![
            (Cursor::new(1, "a"), doc! { "id": "a" }),
            (Cursor::new(2, "b"), doc! { "id": "b" }),
        ]);
        assert_eq!(page.len(), 2);
        assert_eq!(page.first, Some(Cursor::new(1, "a")));
        assert_eq!(page.last, Some(Cursor::new(2, "b")));
        assert!(Page::from_positioned(Vec::new()).first.is_none());
    }

    #[test]
    fn test_key_to_id() {
        let oid = bson::oid::ObjectId::new();
        assert_eq!(key_to_id(&Bson::ObjectId(oid)), Bson::String(oid.to_hex()));
        assert_eq!(key_to_id(&Bson::Int64(7)), Bson::Int64(7));
    }
}
