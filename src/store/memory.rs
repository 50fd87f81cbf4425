//! In-memory document store
//!
//! Collections are plain vectors of BSON documents keyed by their `id`
//! field. Queries sort by `(order field, id)` on every request, which keeps
//! the store trivially consistent under inserts between pages.
//!
//! Besides backing the CLI's fixture mode, the store carries a few knobs used
//! by tests: injected failures, per-request latency and request counters.

use async_trait::async_trait;
use bson::{Bson, Document};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::Duration;
use tracing::debug;

use super::ordering::compare_directed;
use super::{Bound, Cursor, DocumentStore, Filter, ID_FIELD, Page, PageQuery, lookup};
use crate::error::{QueryError, Result, StoreResult, ZetoError};

/// Ordered in-memory collections
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Documents per collection, in insertion order
    collections: RwLock<HashMap<String, Vec<Document>>>,

    /// Number of upcoming requests that will be rejected
    pending_failures: AtomicUsize,

    /// Artificial latency applied to page queries
    page_latency: Mutex<Duration>,

    /// Count requests served so far
    count_calls: AtomicUsize,

    /// Page requests served so far
    page_calls: AtomicUsize,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document into a collection.
    ///
    /// The document must carry a string or integer `id`; one is generated
    /// when it is missing.
    pub fn insert(&self, collection: &str, mut document: Document) {
        if !document.contains_key(ID_FIELD) {
            document.insert(ID_FIELD, uuid::Uuid::new_v4().simple().to_string());
        }

        let mut collections = self
            .collections
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        collections
            .entry(collection.to_string())
            .or_default()
            .push(document);
    }

    /// Insert many documents at once
    pub fn insert_many(&self, collection: &str, documents: impl IntoIterator<Item = Document>) {
        for document in documents {
            self.insert(collection, document);
        }
    }

    /// Remove the document with the given id; returns whether it existed
    pub fn remove(&self, collection: &str, id: impl Into<Bson>) -> bool {
        let id = id.into();
        let mut collections = self
            .collections
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match collections.get_mut(collection) {
            Some(docs) => {
                let before = docs.len();
                docs.retain(|doc| doc.get(ID_FIELD) != Some(&id));
                docs.len() != before
            }
            None => false,
        }
    }

    /// Names of the collections currently held
    pub fn collection_names(&self) -> Vec<String> {
        let collections = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = collections.keys().cloned().collect();
        names.sort();
        names
    }

    /// Load a fixture file: a JSON object mapping collection names to arrays
    /// of (extended JSON) documents.
    pub fn from_fixture_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_fixture_str(&content)
    }

    /// Parse fixture content, see [`MemoryStore::from_fixture_file`]
    pub fn from_fixture_str(content: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(content)?;
        let serde_json::Value::Object(collections) = value else {
            return Err(ZetoError::Serialization(
                "fixture must be a JSON object of collections".to_string(),
            ));
        };

        let store = Self::new();
        for (name, documents) in collections {
            let serde_json::Value::Array(documents) = documents else {
                return Err(ZetoError::Serialization(format!(
                    "fixture collection '{name}' must be an array"
                )));
            };

            for document in documents {
                match Bson::try_from(document) {
                    Ok(Bson::Document(doc)) => store.insert(&name, doc),
                    Ok(other) => {
                        return Err(ZetoError::Serialization(format!(
                            "fixture entry in '{name}' is not a document: {other}"
                        )));
                    }
                    Err(e) => return Err(ZetoError::Serialization(e.to_string())),
                }
            }
        }

        Ok(store)
    }

    /// Reject the next `count` requests (count or page queries)
    pub fn fail_next_requests(&self, count: usize) {
        self.pending_failures.store(count, AtomicOrdering::SeqCst);
    }

    /// Delay every subsequent page query by `latency`
    pub fn set_page_latency(&self, latency: Duration) {
        *self
            .page_latency
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = latency;
    }

    /// Number of count requests served
    pub fn count_calls(&self) -> usize {
        self.count_calls.load(AtomicOrdering::SeqCst)
    }

    /// Number of page requests served
    pub fn page_calls(&self) -> usize {
        self.page_calls.load(AtomicOrdering::SeqCst)
    }

    /// Consume one injected failure, if any is pending
    fn take_failure(&self) -> bool {
        self.pending_failures
            .fetch_update(AtomicOrdering::SeqCst, AtomicOrdering::SeqCst, |n| {
                n.checked_sub(1)
            })
            .is_ok()
    }

    /// Documents of a collection matching every filter, with their positions
    fn positioned(
        &self,
        collection: &str,
        order_field: &str,
        filters: &[Filter],
    ) -> Vec<(Cursor, Document)> {
        let collections = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| filters.iter().all(|f| f.matches(doc)))
                    .map(|doc| {
                        let value = lookup(doc, order_field).cloned().unwrap_or(Bson::Null);
                        let key = doc.get(ID_FIELD).cloned().unwrap_or(Bson::Null);
                        (Cursor { value, key }, doc.clone())
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn count(&self, collection: &str, filters: &[Filter]) -> StoreResult<u64> {
        self.count_calls.fetch_add(1, AtomicOrdering::SeqCst);
        if self.take_failure() {
            return Err(QueryError::CountFailed {
                collection: collection.to_string(),
                reason: "injected failure".to_string(),
            });
        }

        let collections = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let count = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| filters.iter().all(|f| f.matches(doc)))
                    .count()
            })
            .unwrap_or(0);

        debug!("Counted {} document(s) in '{}'", count, collection);
        Ok(count as u64)
    }

    async fn query_page(&self, query: &PageQuery) -> StoreResult<Page> {
        self.page_calls.fetch_add(1, AtomicOrdering::SeqCst);

        let latency = *self
            .page_latency
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if self.take_failure() {
            return Err(QueryError::PageFailed {
                collection: query.collection.clone(),
                reason: "injected failure".to_string(),
            });
        }

        let mut entries = self.positioned(&query.collection, &query.order_field, &query.filters);
        entries.sort_by(|(a, _), (b, _)| compare_directed(a, b, query.direction));

        let selected: Vec<(Cursor, Document)> = match &query.bound {
            Bound::Start => entries.into_iter().take(query.limit).collect(),
            Bound::After(cursor) => entries
                .into_iter()
                .filter(|(pos, _)| compare_directed(pos, cursor, query.direction).is_gt())
                .take(query.limit)
                .collect(),
            Bound::BeforeLast(cursor) => {
                let before: Vec<_> = entries
                    .into_iter()
                    .filter(|(pos, _)| compare_directed(pos, cursor, query.direction).is_lt())
                    .collect();
                let skip = before.len().saturating_sub(query.limit);
                before.into_iter().skip(skip).collect()
            }
        };

        debug!(
            "Page query on '{}' ({:?}) returned {} document(s)",
            query.collection,
            query.bound,
            selected.len()
        );
        Ok(Page::from_positioned(selected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Direction;
    use bson::{Decimal128, doc};

    fn store_with_numbers(n: i32) -> MemoryStore {
        let store = MemoryStore::new();
        for i in 1..=n {
            store.insert("items", doc! { "id": format!("item-{i:02}"), "rank": i });
        }
        store
    }

    fn query(bound: Bound, limit: usize, direction: Direction) -> PageQuery {
        PageQuery {
            collection: "items".to_string(),
            order_field: "rank".to_string(),
            direction,
            filters: Vec::new(),
            limit,
            bound,
        }
    }

    fn ranks(page: &Page) -> Vec<i32> {
        page.documents
            .iter()
            .map(|d| d.get_i32("rank").unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_count_with_filters() {
        let store = store_with_numbers(10);
        assert_eq!(store.count("items", &[]).await.unwrap(), 10);
        assert_eq!(
            store.count("items", &[Filter::gt("rank", 7)]).await.unwrap(),
            3
        );
        assert_eq!(store.count("unknown", &[]).await.unwrap(), 0);
        assert_eq!(store.count_calls(), 3);
    }

    #[tokio::test]
    async fn test_start_after_and_before_last() {
        let store = store_with_numbers(10);

        let first = store
            .query_page(&query(Bound::Start, 4, Direction::Asc))
            .await
            .unwrap();
        assert_eq!(ranks(&first), vec![1, 2, 3, 4]);

        let after = store
            .query_page(&query(Bound::After(first.last.clone().unwrap()), 4, Direction::Asc))
            .await
            .unwrap();
        assert_eq!(ranks(&after), vec![5, 6, 7, 8]);

        let before = store
            .query_page(&query(Bound::BeforeLast(after.first.clone().unwrap()), 3, Direction::Asc))
            .await
            .unwrap();
        assert_eq!(ranks(&before), vec![2, 3, 4]);
    }

    #[tokio::test]
    async fn test_descending_order() {
        let store = store_with_numbers(5);
        let page = store
            .query_page(&query(Bound::Start, 2, Direction::Desc))
            .await
            .unwrap();
        assert_eq!(ranks(&page), vec![5, 4]);

        let next = store
            .query_page(&query(Bound::After(page.last.unwrap()), 2, Direction::Desc))
            .await
            .unwrap();
        assert_eq!(ranks(&next), vec![3, 2]);
    }

    #[tokio::test]
    async fn test_duplicate_order_values_are_tie_broken_by_id() {
        let store = MemoryStore::new();
        for id in ["c", "a", "b", "d"] {
            store.insert("items", doc! { "id": id, "rank": 1 });
        }

        let first = store
            .query_page(&query(Bound::Start, 2, Direction::Asc))
            .await
            .unwrap();
        let second = store
            .query_page(&query(Bound::After(first.last.unwrap()), 2, Direction::Asc))
            .await
            .unwrap();

        let ids: Vec<&str> = first
            .documents
            .iter()
            .chain(second.documents.iter())
            .map(|d| d.get_str("id").unwrap())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_decimal_order_values() {
        let store = MemoryStore::new();
        for (id, rank) in [("a", "30"), ("b", "10"), ("c", "20")] {
            let rank: Decimal128 = rank.parse().unwrap();
            store.insert("items", doc! { "id": id, "rank": rank });
        }

        let page = store
            .query_page(&query(Bound::Start, 3, Direction::Asc))
            .await
            .unwrap();
        let ids: Vec<&str> = page
            .documents
            .iter()
            .map(|d| d.get_str("id").unwrap())
            .collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[tokio::test]
    async fn test_missing_order_values_sort_first() {
        let store = MemoryStore::new();
        store.insert("items", doc! { "id": "a" });
        store.insert("items", doc! { "id": "b", "rank": 5 });
        store.insert("items", doc! { "id": "c", "rank": Bson::Null });

        let first = store
            .query_page(&query(Bound::Start, 1, Direction::Asc))
            .await
            .unwrap();
        let second = store
            .query_page(&query(Bound::After(first.last.clone().unwrap()), 2, Direction::Asc))
            .await
            .unwrap();
        let ids: Vec<&str> = first
            .documents
            .iter()
            .chain(second.documents.iter())
            .map(|d| d.get_str("id").unwrap())
            .collect();
        assert_eq!(ids, vec!["a", "c", "b"]);

        let back = store
            .query_page(&query(Bound::BeforeLast(Cursor::new(5, "b")), 5, Direction::Desc))
            .await
            .unwrap();
        assert!(back.documents.is_empty());
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = store_with_numbers(3);
        store.fail_next_requests(1);

        let err = store.count("items", &[]).await.unwrap_err();
        assert!(matches!(err, QueryError::CountFailed { .. }));
        assert_eq!(store.count("items", &[]).await.unwrap(), 3);
    }

    #[test]
    fn test_fixture_loading() {
        let store = MemoryStore::from_fixture_str(
            r#"{ "projects": [
                { "id": "1", "name": "Project Alpha", "createdAt": { "$date": "2024-04-24T10:00:00Z" } },
                { "name": "Research Study" }
            ] }"#,
        )
        .unwrap();

        assert_eq!(store.collection_names(), vec!["projects".to_string()]);
        assert!(store.remove("projects", "1"));
        assert!(!store.remove("projects", "1"));

        assert!(MemoryStore::from_fixture_str("[1, 2]").is_err());
        assert!(MemoryStore::from_fixture_str(r#"{ "projects": 3 }"#).is_err());
    }
}
