//! Page-by-page navigation
//!
//! A [`PagedPaginator`] shows exactly one page at a time. Forward pages are
//! fetched strictly after the last visible document, backward pages as the
//! trailing `page_size` documents strictly before the first visible one.
//! Because a backward page cannot tell on its own whether it reached the
//! start of the ordering, `previous` confirms it with a one-document
//! lookahead query.

use bson::Document;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::session::{Gate, Session, Ticket};
use super::{Navigation, PageBookmark, PageView, QuerySpec, SkipReason};
use crate::error::{QueryError, Result};
use crate::store::{Bound, Cursor, DocumentStore};

/// Bookkeeping of the page currently shown
#[derive(Debug, Clone)]
pub(crate) struct PagedState {
    items: Vec<Document>,
    first_visible: Option<Cursor>,
    last_visible: Option<Cursor>,
    page_index: usize,
    is_first_page: bool,
    is_last_page: bool,

    /// A first page has been applied in this epoch
    fetched: bool,
}

impl Default for PagedState {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            first_visible: None,
            last_visible: None,
            page_index: 1,
            is_first_page: true,
            is_last_page: false,
            fetched: false,
        }
    }
}

/// Paged cursor navigation over a [`DocumentStore`]
pub struct PagedPaginator<S: DocumentStore + ?Sized = dyn DocumentStore> {
    store: Arc<S>,
    session: Session<PagedState>,
}

impl<S: DocumentStore + ?Sized> Clone for PagedPaginator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            session: self.session.clone(),
        }
    }
}

impl<S: DocumentStore + ?Sized> PagedPaginator<S> {
    /// Create an uninitialized session
    ///
    /// # Arguments
    /// * `store` - Document store to read from
    /// * `spec` - Query specification, validated here
    pub fn new(store: Arc<S>, spec: QuerySpec) -> Result<Self> {
        spec.validate()?;
        Ok(Self {
            store,
            session: Session::new(spec),
        })
    }

    /// Active query specification
    pub fn spec(&self) -> QuerySpec {
        self.session.read(|inner| inner.spec.clone())
    }

    /// Documents of the current page
    pub fn items(&self) -> Vec<Document> {
        self.session.read(|inner| inner.state.items.clone())
    }

    /// 1-based index of the current page
    pub fn page_index(&self) -> usize {
        self.session.read(|inner| inner.state.page_index)
    }

    pub fn is_first_page(&self) -> bool {
        self.session.read(|inner| inner.state.is_first_page)
    }

    pub fn is_last_page(&self) -> bool {
        self.session.read(|inner| inner.state.is_last_page)
    }

    /// Count snapshot taken at the last initialize or refresh
    pub fn total_count(&self) -> u64 {
        self.session.read(|inner| inner.total_count)
    }

    pub fn total_pages(&self) -> u64 {
        self.session
            .read(|inner| inner.spec.total_pages(inner.total_count))
    }

    pub fn is_loading(&self) -> bool {
        self.session.read(|inner| inner.loading)
    }

    pub fn last_error(&self) -> Option<QueryError> {
        self.session.read(|inner| inner.last_error.clone())
    }

    /// Cursors of the first and last document on the current page
    pub fn visible_range(&self) -> (Option<Cursor>, Option<Cursor>) {
        self.session.read(|inner| {
            (
                inner.state.first_visible.clone(),
                inner.state.last_visible.clone(),
            )
        })
    }

    /// Snapshot of the whole session
    pub fn view(&self) -> PageView {
        self.session.read(|inner| PageView {
            collection: inner.spec.collection.clone(),
            items: inner.state.items.clone(),
            page: inner.state.page_index,
            page_size: inner.spec.page_size,
            total_pages: inner.spec.total_pages(inner.total_count),
            total_count: inner.total_count,
            is_first_page: inner.state.is_first_page,
            is_last_page: inner.state.is_last_page,
            has_more: !inner.state.is_last_page,
            loading: inner.loading,
            error: inner.last_error.as_ref().map(ToString::to_string),
        })
    }

    /// Fetch the total count, then the first page.
    ///
    /// Starts a new epoch: anything still in flight is discarded when it
    /// resolves.
    pub async fn initialize(&self) -> Result<Navigation> {
        let ticket = self.session.start_epoch()?;
        info!("Initializing paged session on '{}'", ticket.spec.collection);
        self.load_first(&ticket).await
    }

    /// Fetch the page after the current one
    pub async fn next(&self) -> Result<Navigation> {
        let gate = self.session.begin(|inner| {
            let state = &inner.state;
            if state.is_last_page {
                return Err(SkipReason::LastPage);
            }
            state.last_visible.clone().ok_or(SkipReason::NoCursor)
        })?;
        let (ticket, cursor) = match gate {
            Gate::Proceed(ticket, cursor) => (ticket, cursor),
            Gate::Skip(reason) => {
                debug!("next() skipped: {}", reason);
                return Ok(Navigation::Skipped(reason));
            }
        };

        let query = ticket.spec.page_query(Bound::After(cursor));
        let page = match self.store.query_page(&query).await {
            Ok(page) => page,
            Err(e) => return self.session.reject(&ticket, e),
        };

        if page.is_empty() {
            let applied = self.session.commit(&ticket, |inner| {
                inner.state.is_last_page = true;
            });
            if !applied {
                return Ok(self.stale(&ticket));
            }
            warn!(
                "Forward page on '{}' came back empty, marking last page",
                ticket.spec.collection
            );
            return Ok(Navigation::ReachedEnd);
        }

        let returned = page.len();
        let mut page_index = 0;
        let applied = self.session.commit(&ticket, |inner| {
            let size = inner.spec.page_size;
            let state = &mut inner.state;
            state.page_index += 1;
            state.is_first_page = false;
            state.is_last_page = returned < size
                || (state.page_index as u64) * (size as u64) >= inner.total_count;
            state.items = page.documents;
            state.first_visible = page.first;
            state.last_visible = page.last;
            page_index = state.page_index;
        });
        if !applied {
            return Ok(self.stale(&ticket));
        }

        debug!(
            "Moved to page {} of '{}' ({} document(s))",
            page_index, ticket.spec.collection, returned
        );
        Ok(Navigation::Loaded)
    }

    /// Fetch the page before the current one
    pub async fn previous(&self) -> Result<Navigation> {
        let gate = self.session.begin(|inner| {
            let state = &inner.state;
            if state.is_first_page {
                return Err(SkipReason::FirstPage);
            }
            state
                .first_visible
                .clone()
                .map(|cursor| (cursor, state.page_index))
                .ok_or(SkipReason::NoCursor)
        })?;
        let (ticket, (cursor, page_index)) = match gate {
            Gate::Proceed(ticket, position) => (ticket, position),
            Gate::Skip(reason) => {
                debug!("previous() skipped: {}", reason);
                return Ok(Navigation::Skipped(reason));
            }
        };

        let query = ticket.spec.page_query(Bound::BeforeLast(cursor));
        let page = match self.store.query_page(&query).await {
            Ok(page) => page,
            Err(e) => return self.session.reject(&ticket, e),
        };

        if page.is_empty() {
            warn!(
                "Backward page on '{}' came back empty, recovering to the first page",
                ticket.spec.collection
            );
            return match self.load_first(&ticket).await? {
                Navigation::Loaded => Ok(Navigation::Recovered),
                other => Ok(other),
            };
        }

        if !self.session.is_current(&ticket) {
            return Ok(self.stale(&ticket));
        }

        // The backward page alone cannot tell whether it starts the ordering
        let (is_first_page, lookahead_error) =
            match self.store.query_page(&ticket.spec.lookahead_query()).await {
                Ok(head) => match (&head.first, &page.first) {
                    (Some(head), Some(first)) => (head.same_document(first), None),
                    _ => (true, None),
                },
                Err(e) => {
                    warn!(
                        "First-page lookahead on '{}' failed: {}",
                        ticket.spec.collection, e
                    );
                    (page_index <= 2, Some(e))
                }
            };

        let returned = page.len();
        let applied = self.session.commit(&ticket, |inner| {
            let state = &mut inner.state;
            state.page_index = if is_first_page {
                1
            } else {
                page_index.saturating_sub(1).max(2)
            };
            state.is_first_page = is_first_page;
            state.is_last_page = false;
            state.items = page.documents;
            state.first_visible = page.first;
            state.last_visible = page.last;
            inner.last_error = lookahead_error;
        });
        if !applied {
            return Ok(self.stale(&ticket));
        }

        debug!(
            "Moved back on '{}' ({} document(s), first page: {})",
            ticket.spec.collection, returned, is_first_page
        );
        Ok(Navigation::Loaded)
    }

    /// Re-run the first page query; a no-op when already there
    pub async fn go_to_first_page(&self) -> Result<Navigation> {
        let gate = self.session.begin(|inner| {
            if inner.state.fetched && inner.state.is_first_page {
                Err(SkipReason::FirstPage)
            } else {
                Ok(())
            }
        })?;
        match gate {
            Gate::Proceed(ticket, ()) => self.load_first(&ticket).await,
            Gate::Skip(reason) => {
                debug!("go_to_first_page() skipped: {}", reason);
                Ok(Navigation::Skipped(reason))
            }
        }
    }

    /// Re-fetch the total count and the first page, superseding anything
    /// in flight
    pub async fn refresh(&self) -> Result<Navigation> {
        let ticket = self.session.start_epoch()?;
        info!("Refreshing paged session on '{}'", ticket.spec.collection);
        self.load_first(&ticket).await
    }

    /// Swap the query specification.
    ///
    /// A different specification discards all state and in-flight results;
    /// call [`initialize`](Self::initialize) afterwards. Returns whether
    /// anything changed.
    pub fn reconfigure(&self, spec: QuerySpec) -> Result<bool> {
        let changed = self.session.reconfigure(spec)?;
        if changed {
            info!("Paged session reconfigured");
        }
        Ok(changed)
    }

    /// Tear the session down; pending results are ignored and further calls
    /// fail with [`QueryError::SessionClosed`]
    pub fn close(&self) {
        self.session.close();
        debug!("Paged session closed");
    }

    /// Capture the current position for later restoration
    pub fn bookmark(&self) -> PageBookmark {
        self.session
            .read(|inner| PageBookmark::capture(&inner.spec, inner.state.page_index))
    }

    /// Re-open the page a bookmark points at.
    ///
    /// Initializes, then steps forward until the bookmarked page or the last
    /// page is reached.
    pub async fn restore(&self, bookmark: &PageBookmark) -> Result<Navigation> {
        let spec = self.spec();
        if !bookmark.matches(&spec) {
            return Err(QueryError::InvalidSpec(format!(
                "bookmark for '{}' does not match the active query on '{}'",
                bookmark.collection, spec.collection
            ))
            .into());
        }

        let outcome = self.initialize().await?;
        if outcome != Navigation::Loaded {
            return Ok(outcome);
        }

        while self.page_index() < bookmark.page_index {
            match self.next().await? {
                Navigation::Loaded => continue,
                Navigation::Stale => return Ok(Navigation::Stale),
                _ => break,
            }
        }

        info!(
            "Restored '{}' at page {} (bookmarked {})",
            spec.collection,
            self.page_index(),
            bookmark.page_index
        );
        Ok(Navigation::Loaded)
    }

    /// Count, then first page, committed together under `ticket`
    async fn load_first(&self, ticket: &Ticket) -> Result<Navigation> {
        let spec = &ticket.spec;
        let total = match self.store.count(&spec.collection, &spec.filters).await {
            Ok(total) => total,
            Err(e) => return self.session.reject(ticket, e),
        };
        if !self.session.is_current(ticket) {
            return Ok(self.stale(ticket));
        }

        let page = match self.store.query_page(&spec.page_query(Bound::Start)).await {
            Ok(page) => page,
            Err(e) => return self.session.reject(ticket, e),
        };

        let returned = page.len();
        let applied = self.session.commit(ticket, |inner| {
            let size = inner.spec.page_size;
            inner.total_count = total;
            inner.state = PagedState {
                items: page.documents,
                first_visible: page.first,
                last_visible: page.last,
                page_index: 1,
                is_first_page: true,
                is_last_page: returned < size || returned as u64 >= total,
                fetched: true,
            };
        });
        if !applied {
            return Ok(self.stale(ticket));
        }

        info!(
            "Loaded first page of '{}': {} of {} document(s) in {:?}",
            spec.collection,
            returned,
            total,
            self.session.elapsed()
        );
        Ok(Navigation::Loaded)
    }

    fn stale(&self, ticket: &Ticket) -> Navigation {
        warn!(
            "Discarding stale result for '{}'",
            ticket.spec.collection
        );
        Navigation::Stale
    }
}
