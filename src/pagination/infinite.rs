//! Infinite scrolling
//!
//! An [`InfinitePaginator`] keeps every fetched page. `has_more` is
//! recomputed after each append against the cumulative item count, and once
//! it turns false only a refresh can bring it back.

use bson::Document;
use std::sync::Arc;
use tracing::{debug, info};

use super::session::{Gate, Session, Ticket};
use super::{FeedView, Navigation, QuerySpec, SkipReason};
use crate::error::{QueryError, Result};
use crate::store::{Bound, Cursor, DocumentStore};

#[derive(Debug, Clone, Default)]
pub(crate) struct InfiniteState {
    items: Vec<Document>,
    last_visible: Option<Cursor>,

    /// Number of pages fetched, zero before the first
    page_index: usize,
    has_more: bool,
}

/// Append-only cursor pagination over a [`DocumentStore`]
pub struct InfinitePaginator<S: DocumentStore + ?Sized = dyn DocumentStore> {
    store: Arc<S>,
    session: Session<InfiniteState>,
}

impl<S: DocumentStore + ?Sized> Clone for InfinitePaginator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            session: self.session.clone(),
        }
    }
}

impl<S: DocumentStore + ?Sized> InfinitePaginator<S> {
    pub fn new(store: Arc<S>, spec: QuerySpec) -> Result<Self> {
        spec.validate()?;
        Ok(Self {
            store,
            session: Session::new(spec),
        })
    }

    pub fn spec(&self) -> QuerySpec {
        self.session.read(|inner| inner.spec.clone())
    }

    /// Every document fetched so far, in fetch order
    pub fn items(&self) -> Vec<Document> {
        self.session.read(|inner| inner.state.items.clone())
    }

    pub fn len(&self) -> usize {
        self.session.read(|inner| inner.state.items.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of pages fetched
    pub fn page_index(&self) -> usize {
        self.session.read(|inner| inner.state.page_index)
    }

    pub fn has_more(&self) -> bool {
        self.session.read(|inner| inner.state.has_more)
    }

    pub fn total_count(&self) -> u64 {
        self.session.read(|inner| inner.total_count)
    }

    pub fn is_loading(&self) -> bool {
        self.session.read(|inner| inner.loading)
    }

    pub fn last_error(&self) -> Option<QueryError> {
        self.session.read(|inner| inner.last_error.clone())
    }

    pub fn view(&self) -> FeedView {
        self.session.read(|inner| FeedView {
            collection: inner.spec.collection.clone(),
            items: inner.state.items.clone(),
            fetches: inner.state.page_index,
            page_size: inner.spec.page_size,
            total_pages: inner.spec.total_pages(inner.total_count),
            total_count: inner.total_count,
            has_more: inner.state.has_more,
            loading: inner.loading,
            error: inner.last_error.as_ref().map(ToString::to_string),
        })
    }

    /// Fetch the total count, then the first page
    pub async fn initialize(&self) -> Result<Navigation> {
        let ticket = self.session.start_epoch()?;
        info!("Initializing feed on '{}'", ticket.spec.collection);
        self.load_first(&ticket).await
    }

    /// Append the next page
    pub async fn load_more(&self) -> Result<Navigation> {
        let gate = self.session.begin(|inner| {
            if !inner.state.has_more {
                return Err(SkipReason::Exhausted);
            }
            inner.state.last_visible.clone().ok_or(SkipReason::NoCursor)
        })?;
        let (ticket, cursor) = match gate {
            Gate::Proceed(ticket, cursor) => (ticket, cursor),
            Gate::Skip(reason) => {
                debug!("load_more() skipped: {}", reason);
                return Ok(Navigation::Skipped(reason));
            }
        };

        let query = ticket.spec.page_query(Bound::After(cursor));
        let page = match self.store.query_page(&query).await {
            Ok(page) => page,
            Err(e) => return self.session.reject(&ticket, e),
        };

        let returned = page.len();
        let mut accumulated = 0;
        let mut has_more = false;
        let applied = self.session.commit(&ticket, |inner| {
            let size = inner.spec.page_size;
            let state = &mut inner.state;
            state.items.extend(page.documents);
            if page.last.is_some() {
                state.last_visible = page.last;
            }
            state.page_index += 1;
            state.has_more =
                returned == size && (state.items.len() as u64) < inner.total_count;
            accumulated = state.items.len();
            has_more = state.has_more;
        });
        if !applied {
            debug!("Discarding stale page for '{}'", ticket.spec.collection);
            return Ok(Navigation::Stale);
        }

        debug!(
            "Appended {} document(s) to '{}' feed ({} total, more: {})",
            returned, ticket.spec.collection, accumulated, has_more
        );
        if has_more {
            Ok(Navigation::Loaded)
        } else {
            Ok(Navigation::ReachedEnd)
        }
    }

    /// Drop everything fetched and start over with a fresh count
    pub async fn refresh(&self) -> Result<Navigation> {
        let ticket = self.session.start_epoch()?;
        self.session.reset_state();
        info!("Refreshing feed on '{}'", ticket.spec.collection);
        self.load_first(&ticket).await
    }

    /// Swap the query specification; returns whether anything changed
    pub fn reconfigure(&self, spec: QuerySpec) -> Result<bool> {
        self.session.reconfigure(spec)
    }

    pub fn close(&self) {
        self.session.close();
    }

    async fn load_first(&self, ticket: &Ticket) -> Result<Navigation> {
        let spec = &ticket.spec;
        let total = match self.store.count(&spec.collection, &spec.filters).await {
            Ok(total) => total,
            Err(e) => return self.session.reject(ticket, e),
        };
        if !self.session.is_current(ticket) {
            return Ok(Navigation::Stale);
        }

        let page = match self.store.query_page(&spec.page_query(Bound::Start)).await {
            Ok(page) => page,
            Err(e) => return self.session.reject(ticket, e),
        };

        let returned = page.len();
        let applied = self.session.commit(ticket, |inner| {
            let has_more = returned == inner.spec.page_size && (returned as u64) < total;
            inner.total_count = total;
            inner.state = InfiniteState {
                items: page.documents,
                last_visible: page.last,
                page_index: 1,
                has_more,
            };
        });
        if !applied {
            debug!("Discarding stale first page for '{}'", spec.collection);
            return Ok(Navigation::Stale);
        }

        info!(
            "Loaded feed head of '{}': {} of {} document(s) in {:?}",
            spec.collection,
            returned,
            total,
            self.session.elapsed()
        );
        Ok(Navigation::Loaded)
    }
}
