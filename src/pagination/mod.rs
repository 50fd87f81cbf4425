//! Cursor pagination sessions
//!
//! Two access patterns over one [`QuerySpec`]:
//! - [`PagedPaginator`]: page-by-page navigation (next, previous, first) with a
//!   total page count
//! - [`InfinitePaginator`]: infinite scrolling, every fetch is appended to a
//!   growing result set
//!
//! Paginator handles are cheap to clone; all clones drive the same session.
//! Navigation requests are gated on a single `loading` flag, and every result
//! is checked against the session epoch before it is applied, so a slow
//! response never overwrites a newer initialize, refresh or reconfigure.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use bson::doc;
//! use zeto::pagination::{PagedPaginator, QuerySpec};
//! use zeto::store::MemoryStore;
//!
//! # tokio_test::block_on(async {
//! let store = Arc::new(MemoryStore::new());
//! for i in 0..25 {
//!     store.insert("projects", doc! { "id": format!("p{i:02}"), "createdAt": i });
//! }
//!
//! let pager = PagedPaginator::new(store, QuerySpec::new("projects", "createdAt"))?;
//! pager.initialize().await?;
//! pager.next().await?;
//!
//! let view = pager.view();
//! assert_eq!(view.page, 2);
//! assert_eq!(view.total_pages, 3);
//! # Ok::<(), zeto::ZetoError>(())
//! # }).unwrap();
//! ```

use bson::Document;
use serde::Serialize;
use std::fmt;

pub mod bookmark;
pub mod infinite;
pub mod paged;
mod session;
mod spec;


pub use bookmark::PageBookmark;
pub use infinite::InfinitePaginator;
pub use paged::PagedPaginator;
pub use spec::{DEFAULT_PAGE_SIZE, QuerySpec};

/// What a pagination call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// A page was fetched and applied
    Loaded,

    /// A forward fetch came back empty; the session is now on its last page
    ReachedEnd,

    /// A backward fetch came back empty; the session was re-initialized
    Recovered,

    /// Nothing was requested
    Skipped(SkipReason),

    /// The result arrived after the session moved on and was discarded
    Stale,
}

/// Why a call was a no-op
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another request is in flight
    Loading,

    /// Already on the first page
    FirstPage,

    /// Already on the last page
    LastPage,

    /// No page has been fetched yet
    NoCursor,

    /// Infinite mode has nothing more to load
    Exhausted,
}

impl fmt::Display for Navigation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Navigation::Loaded => write!(f, "loaded"),
            Navigation::ReachedEnd => write!(f, "reached end"),
            Navigation::Recovered => write!(f, "recovered to first page"),
            Navigation::Skipped(reason) => write!(f, "skipped ({reason})"),
            Navigation::Stale => write!(f, "stale result discarded"),
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Loading => write!(f, "request in flight"),
            SkipReason::FirstPage => write!(f, "already on first page"),
            SkipReason::LastPage => write!(f, "already on last page"),
            SkipReason::NoCursor => write!(f, "nothing fetched yet"),
            SkipReason::Exhausted => write!(f, "nothing more to load"),
        }
    }
}

/// Snapshot of a paged session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageView {
    pub collection: String,
    pub items: Vec<Document>,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: u64,
    pub total_count: u64,
    pub is_first_page: bool,
    pub is_last_page: bool,
    pub has_more: bool,
    pub loading: bool,
    pub error: Option<String>,
}

/// Snapshot of an infinite session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedView {
    pub collection: String,
    pub items: Vec<Document>,
    pub fetches: usize,
    pub page_size: usize,
    pub total_pages: u64,
    pub total_count: u64,
    pub has_more: bool,
    pub loading: bool,
    pub error: Option<String>,
}
