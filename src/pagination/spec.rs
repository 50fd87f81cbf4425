use serde::{Deserialize, Serialize};

use crate::config::PaginationConfig;
use crate::error::{QueryError, StoreResult};
use crate::store::{Bound, Direction, Filter, PageQuery};

/// Page size used when none is given
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// What one pagination session reads: collection, ordering, page size and
/// filters. Two sessions with equal specifications are interchangeable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySpec {
    pub collection: String,
    pub order_field: String,
    #[serde(default)]
    pub direction: Direction,
    pub page_size: usize,
    #[serde(default)]
    pub filters: Vec<Filter>,
}

impl QuerySpec {
    /// Ascending specification with the default page size and no filters
    pub fn new(collection: impl Into<String>, order_field: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            order_field: order_field.into(),
            direction: Direction::Asc,
            page_size: DEFAULT_PAGE_SIZE,
            filters: Vec::new(),
        }
    }

    /// Specification for `collection` using the configured defaults
    pub fn from_config(collection: impl Into<String>, config: &PaginationConfig) -> Self {
        Self {
            collection: collection.into(),
            order_field: config.order_field.clone(),
            direction: config.direction,
            page_size: config.page_size,
            filters: Vec::new(),
        }
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filters.extend(filters);
        self
    }

    /// Reject specifications no store can execute
    pub fn validate(&self) -> StoreResult<()> {
        if self.collection.trim().is_empty() {
            return Err(QueryError::InvalidSpec("collection is empty".to_string()));
        }
        if self.order_field.trim().is_empty() {
            return Err(QueryError::InvalidSpec("order field is empty".to_string()));
        }
        if self.page_size == 0 {
            return Err(QueryError::InvalidSpec(
                "page size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of pages for `total` documents, never less than one
    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(self.page_size.max(1) as u64).max(1)
    }

    /// Range query of one page from `bound`
    pub(crate) fn page_query(&self, bound: Bound) -> PageQuery {
        PageQuery {
            collection: self.collection.clone(),
            order_field: self.order_field.clone(),
            direction: self.direction,
            filters: self.filters.clone(),
            limit: self.page_size,
            bound,
        }
    }

    /// Single-document query for the true first document of the ordering
    pub(crate) fn lookahead_query(&self) -> PageQuery {
        PageQuery {
            limit: 1,
            ..self.page_query(Bound::Start)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(QuerySpec::new("projects", "createdAt").validate().is_ok());
        assert!(QuerySpec::new("", "createdAt").validate().is_err());
        assert!(QuerySpec::new("projects", " ").validate().is_err());
        assert!(
            QuerySpec::new("projects", "createdAt")
                .with_page_size(0)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_total_pages() {
        let spec = QuerySpec::new("projects", "createdAt").with_page_size(10);
        assert_eq!(spec.total_pages(0), 1);
        assert_eq!(spec.total_pages(10), 1);
        assert_eq!(spec.total_pages(11), 2);
        assert_eq!(spec.total_pages(25), 3);
    }

    #[test]
    fn test_lookahead_keeps_filters() {
        let spec = QuerySpec::new("projects", "createdAt")
            .with_direction(Direction::Desc)
            .with_filter(Filter::eq("status", "active"));
        let lookahead = spec.lookahead_query();

        assert_eq!(lookahead.limit, 1);
        assert_eq!(lookahead.bound, Bound::Start);
        assert_eq!(lookahead.direction, Direction::Desc);
        assert_eq!(lookahead.filters, spec.filters);
    }

    #[test]
    fn test_from_config() {
        let config = PaginationConfig::default();
        let spec = QuerySpec::from_config("contracts", &config);
        assert_eq!(spec.order_field, "createdAt");
        assert_eq!(spec.direction, Direction::Desc);
        assert_eq!(spec.page_size, 10);
    }
}
