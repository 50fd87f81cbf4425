//! Explicit persistence of the last viewed page

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

use super::QuerySpec;
use crate::error::Result;
use crate::store::Direction;

/// Position of a paged session, tied to the query it was taken from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageBookmark {
    pub collection: String,
    pub order_field: String,
    pub direction: Direction,
    pub page_size: usize,
    pub page_index: usize,
}

impl PageBookmark {
    pub fn capture(spec: &QuerySpec, page_index: usize) -> Self {
        Self {
            collection: spec.collection.clone(),
            order_field: spec.order_field.clone(),
            direction: spec.direction,
            page_size: spec.page_size,
            page_index: page_index.max(1),
        }
    }

    /// Whether the bookmark was taken from a session reading the same
    /// ordering of the same collection with the same page size
    pub fn matches(&self, spec: &QuerySpec) -> bool {
        self.collection == spec.collection
            && self.order_field == spec.order_field
            && self.direction == spec.direction
            && self.page_size == spec.page_size
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.to_json()?)?;
        debug!("Saved bookmark to {}", path.display());
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_ignores_filters() {
        let spec = QuerySpec::new("projects", "createdAt").with_page_size(5);
        let bookmark = PageBookmark::capture(&spec, 3);

        assert!(bookmark.matches(&spec));
        assert!(bookmark.matches(&spec.clone().with_filter(crate::store::Filter::eq("type", "chart"))));
        assert!(!bookmark.matches(&spec.clone().with_page_size(10)));
        assert!(!bookmark.matches(&spec.with_direction(Direction::Desc)));
    }

    #[test]
    fn test_json_uses_camel_case() {
        let bookmark = PageBookmark::capture(&QuerySpec::new("contracts", "createdAt"), 0);
        let json = bookmark.to_json().unwrap();

        assert!(json.contains("\"pageIndex\": 1"));
        assert!(json.contains("\"orderField\": \"createdAt\""));
        assert_eq!(PageBookmark::from_json(&json).unwrap(), bookmark);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir()
            .join(format!("zeto-bookmark-{}", uuid::Uuid::new_v4()))
            .join("page.json");
        let bookmark = PageBookmark::capture(&QuerySpec::new("projects", "createdAt"), 4);

        bookmark.save(&path).unwrap();
        assert_eq!(PageBookmark::load(&path).unwrap(), bookmark);
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
