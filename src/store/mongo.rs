//! MongoDB document store
//!
//! Range queries are expressed with `(order field, _id)` so that page
//! boundaries stay exact when order values repeat:
//!
//! ```text
//! after (v, k), ascending:  { $or: [ { f: { $gt: v } }, { f: v, _id: { $gt: k } } ] }
//! before (v, k), ascending: { $or: [ { f: { $lt: v } }, { f: null }, { f: v, _id: { $lt: k } } ] }
//! ```
//!
//! Backward pages are fetched in reverse order and flipped client side, the
//! equivalent of Firestore's `endBefore` + `limitToLast`.
//!
//! Null and missing order values sort first and are handled separately, see
//! `range_clause`. Otherwise comparison operators only match values of the
//! operand's BSON type, so the order field is expected to hold one type
//! across the collection.

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{Bson, Document};
use futures::stream::TryStreamExt;
use mongodb::{Collection, Database};
use tracing::debug;

use super::filter::combine;
use super::{Bound, Cursor, Direction, DocumentStore, Filter, ID_FIELD, Page, PageQuery};
use super::{key_to_id, lookup};
use crate::connection::ConnectionManager;
use crate::error::{QueryError, Result, StoreResult};

const KEY_FIELD: &str = "_id";

/// Document store backed by a MongoDB database
#[derive(Debug, Clone)]
pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    /// Wrap a database handle
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Build a store from a connected manager
    pub fn from_manager(manager: &ConnectionManager) -> Result<Self> {
        Ok(Self::new(manager.get_database()?))
    }

    /// Insert documents, moving their `id` field to `_id`
    pub async fn insert_documents(&self, collection: &str, documents: Vec<Document>) -> Result<usize> {
        let coll: Collection<Document> = self.database.collection(collection);
        let documents: Vec<Document> = documents.into_iter().map(to_stored).collect();
        if documents.is_empty() {
            return Ok(0);
        }

        let result = coll.insert_many(documents).await?;
        debug!(
            "Inserted {} document(s) into '{}'",
            result.inserted_ids.len(),
            collection
        );
        Ok(result.inserted_ids.len())
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.database.collection(name)
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn count(&self, collection: &str, filters: &[Filter]) -> StoreResult<u64> {
        let filter = combine(&stored_filters(filters), None);
        debug!("Counting '{}' with filter: {:?}", collection, filter);

        self.collection(collection)
            .count_documents(filter)
            .await
            .map_err(|e| QueryError::CountFailed {
                collection: collection.to_string(),
                reason: e.to_string(),
            })
    }

    async fn query_page(&self, query: &PageQuery) -> StoreResult<Page> {
        let order_field = stored_field(&query.order_field);
        let (range, direction, reverse) = match &query.bound {
            Bound::Start => (None, query.direction, false),
            Bound::After(cursor) => (
                Some(range_clause(order_field, cursor, query.direction, true)),
                query.direction,
                false,
            ),
            Bound::BeforeLast(cursor) => (
                Some(range_clause(order_field, cursor, query.direction, false)),
                query.direction.reversed(),
                true,
            ),
        };

        let filter = combine(&stored_filters(&query.filters), range);
        let mut sort = Document::new();
        sort.insert(order_field, direction.sort_value());
        sort.insert(KEY_FIELD, direction.sort_value());

        let mut find_options = mongodb::options::FindOptions::default();
        find_options.sort = Some(sort);
        find_options.limit = Some(query.limit as i64);

        debug!(
            "Executing page query on '{}' with filter: {:?}",
            query.collection, filter
        );

        let page_failed = |e: mongodb::error::Error| QueryError::PageFailed {
            collection: query.collection.clone(),
            reason: e.to_string(),
        };

        let cursor = self
            .collection(&query.collection)
            .find(filter)
            .with_options(find_options)
            .await
            .map_err(page_failed)?;
        let mut documents: Vec<Document> = cursor.try_collect().await.map_err(page_failed)?;

        if reverse {
            documents.reverse();
        }

        let entries = documents
            .into_iter()
            .map(|doc| from_stored(doc, order_field))
            .collect();
        Ok(Page::from_positioned(entries))
    }
}

/// Strict range condition relative to a cursor.
///
/// Null and missing order values sort below every other value but are never
/// matched by `$gt`/`$lt`, so they get explicit branches: above a null cursor
/// every non-null value qualifies, and below a non-null cursor every null
/// value does.
fn range_clause(field: &str, cursor: &Cursor, direction: Direction, after: bool) -> Document {
    let upward = matches!(direction, Direction::Asc) == after;
    let op = if upward { "$gt" } else { "$lt" };
    let null_cursor = matches!(cursor.value, Bson::Null | Bson::Undefined);

    let mut branches = Vec::with_capacity(3);
    match (null_cursor, upward) {
        (true, true) => {
            let mut non_null = Document::new();
            non_null.insert(field, single("$ne", Bson::Null));
            branches.push(non_null);
        }
        (true, false) => {}
        (false, upward) => {
            let mut beyond_value = Document::new();
            beyond_value.insert(field, single(op, cursor.value.clone()));
            branches.push(beyond_value);
            if !upward {
                let mut null_value = Document::new();
                null_value.insert(field, Bson::Null);
                branches.push(null_value);
            }
        }
    }

    let mut same_value = Document::new();
    same_value.insert(field, cursor.value.clone());
    same_value.insert(KEY_FIELD, single(op, cursor.key.clone()));
    branches.push(same_value);

    let mut clause = Document::new();
    clause.insert(
        "$or",
        branches.into_iter().map(Bson::Document).collect::<Vec<_>>(),
    );
    clause
}

fn single(op: &str, value: Bson) -> Document {
    let mut doc = Document::new();
    doc.insert(op, value);
    doc
}

/// Stored name of a field: the merged `id` lives in `_id`
fn stored_field(field: &str) -> &str {
    if field == ID_FIELD { KEY_FIELD } else { field }
}

/// Point filters on `id` at `_id`, turning ObjectId hex strings back into
/// ObjectIds
fn stored_filters(filters: &[Filter]) -> Vec<Filter> {
    filters
        .iter()
        .map(|filter| {
            if filter.field == ID_FIELD {
                Filter::new(KEY_FIELD, filter.op, id_to_key(&filter.value))
            } else {
                filter.clone()
            }
        })
        .collect()
}

fn id_to_key(id: &Bson) -> Bson {
    match id {
        Bson::String(hex) => ObjectId::parse_str(hex)
            .map(Bson::ObjectId)
            .unwrap_or_else(|_| id.clone()),
        Bson::Array(ids) => Bson::Array(ids.iter().map(id_to_key).collect()),
        other => other.clone(),
    }
}

/// Split a stored document into its position and the `id`-merged view
fn from_stored(stored: Document, order_field: &str) -> (Cursor, Document) {
    let key = stored.get(KEY_FIELD).cloned().unwrap_or(Bson::Null);
    let value = lookup(&stored, order_field).cloned().unwrap_or(Bson::Null);

    let mut merged = Document::new();
    merged.insert(ID_FIELD, key_to_id(&key));
    for (name, field) in stored {
        if name != KEY_FIELD && name != ID_FIELD {
            merged.insert(name, field);
        }
    }

    (Cursor { value, key }, merged)
}

/// Move a document's `id` into `_id` for storage
fn to_stored(mut document: Document) -> Document {
    if let Some(id) = document.remove(ID_FIELD) {
        let mut stored = Document::new();
        stored.insert(KEY_FIELD, id);
        for (name, value) in document {
            stored.insert(name, value);
        }
        stored
    } else {
        document
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn test_range_clause_after_ascending() {
        let cursor = Cursor::new(5, "k5");
        assert_eq!(
            range_clause("rank", &cursor, Direction::Asc, true),
            doc! { "$or": [
                { "rank": { "$gt": 5 } },
                { "rank": 5, "_id": { "$gt": "k5" } }
            ] }
        );
    }

    #[test]
    fn test_range_clause_flips_for_descending_and_before() {
        let cursor = Cursor::new(5, "k5");
        let desc_after = range_clause("rank", &cursor, Direction::Desc, true);
        let asc_before = range_clause("rank", &cursor, Direction::Asc, false);
        assert_eq!(desc_after, asc_before);
        assert_eq!(
            asc_before,
            doc! { "$or": [
                { "rank": { "$lt": 5 } },
                { "rank": null },
                { "rank": 5, "_id": { "$lt": "k5" } }
            ] }
        );
    }

    #[test]
    fn test_range_clause_null_cursor() {
        let cursor = Cursor::new(Bson::Null, 1);
        assert_eq!(
            range_clause("createdAt", &cursor, Direction::Asc, true),
            doc! { "$or": [
                { "createdAt": { "$ne": null } },
                { "createdAt": null, "_id": { "$gt": 1 } }
            ] }
        );

        let desc_after = range_clause("createdAt", &cursor, Direction::Desc, true);
        assert_eq!(desc_after, range_clause("createdAt", &cursor, Direction::Asc, false));
        assert_eq!(
            desc_after,
            doc! { "$or": [
                { "createdAt": null, "_id": { "$lt": 1 } }
            ] }
        );
    }

    #[test]
    fn test_id_filters_target_key_field() {
        let oid = ObjectId::new();
        let filters = [
            Filter::eq("id", oid.to_hex()),
            Filter::any_of("id", vec!["p-1".into(), oid.to_hex().into()]),
            Filter::eq("status", "active"),
        ];

        assert_eq!(
            combine(&stored_filters(&filters), None),
            doc! { "$and": [
                { "_id": { "$eq": oid } },
                { "_id": { "$in": ["p-1", oid] } },
                { "status": { "$eq": "active" } }
            ] }
        );
        assert_eq!(stored_field("id"), "_id");
        assert_eq!(stored_field("createdAt"), "createdAt");
    }

    #[test]
    fn test_from_stored_merges_id() {
        let oid = bson::oid::ObjectId::new();
        let (cursor, merged) = from_stored(
            doc! { "_id": oid, "name": "Client Proposal", "createdAt": 3 },
            "createdAt",
        );

        assert_eq!(cursor, Cursor::new(3, oid));
        assert_eq!(merged.get_str("id").unwrap(), oid.to_hex());
        assert!(!merged.contains_key("_id"));
        assert_eq!(merged.get_str("name").unwrap(), "Client Proposal");
    }

    #[test]
    fn test_to_stored_moves_id() {
        let stored = to_stored(doc! { "id": "p-1", "name": "Project Alpha" });
        assert_eq!(stored, doc! { "_id": "p-1", "name": "Project Alpha" });
        assert_eq!(to_stored(doc! { "name": "x" }), doc! { "name": "x" });
    }
}
