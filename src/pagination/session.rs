use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{Navigation, QuerySpec, SkipReason};
use crate::error::{QueryError, Result};

/// State shared between clones of one paginator handle.
///
/// The mutex is only held for synchronous reads and commits, never across a
/// store request.
#[derive(Debug)]
pub(crate) struct Session<T> {
    inner: Arc<Mutex<SessionInner<T>>>,
}

impl<T> Clone for Session<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[derive(Debug)]
pub(crate) struct SessionInner<T> {
    /// Active specification
    pub spec: QuerySpec,

    /// Regenerated by initialize/refresh/reconfigure/close; results carrying
    /// an older epoch are discarded
    pub epoch: Uuid,

    /// Set once by `close`
    pub closed: bool,

    /// A request of the current epoch is in flight
    pub loading: bool,

    /// Error of the most recent failed request
    pub last_error: Option<QueryError>,

    /// Count snapshot taken at the last initialize
    pub total_count: u64,

    /// When the current epoch started
    pub started_at: Instant,

    /// Mode-specific page bookkeeping
    pub state: T,
}

/// Proof that a request belongs to a particular epoch
#[derive(Debug, Clone)]
pub(crate) struct Ticket {
    pub epoch: Uuid,
    pub spec: QuerySpec,
}

/// Outcome of gating a navigation request
pub(crate) enum Gate<R> {
    Proceed(Ticket, R),
    Skip(SkipReason),
}

impl<T: Default> Session<T> {
    pub fn new(spec: QuerySpec) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionInner {
                spec,
                epoch: Uuid::new_v4(),
                closed: false,
                loading: false,
                last_error: None,
                total_count: 0,
                started_at: Instant::now(),
                state: T::default(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read the session under the lock
    pub fn read<R>(&self, f: impl FnOnce(&SessionInner<T>) -> R) -> R {
        f(&*self.lock())
    }

    /// Start a new epoch, invalidating every in-flight request
    pub fn start_epoch(&self) -> Result<Ticket> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(QueryError::SessionClosed.into());
        }

        inner.epoch = Uuid::new_v4();
        inner.started_at = Instant::now();
        inner.loading = true;
        inner.last_error = None;
        Ok(Ticket {
            epoch: inner.epoch,
            spec: inner.spec.clone(),
        })
    }

    /// Gate a navigation request on the `loading` flag and a mode-specific
    /// check, then mark the session as loading
    pub fn begin<R>(
        &self,
        check: impl FnOnce(&SessionInner<T>) -> std::result::Result<R, SkipReason>,
    ) -> Result<Gate<R>> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(QueryError::SessionClosed.into());
        }
        if inner.loading {
            return Ok(Gate::Skip(SkipReason::Loading));
        }

        match check(&*inner) {
            Ok(value) => {
                inner.loading = true;
                inner.last_error = None;
                let ticket = Ticket {
                    epoch: inner.epoch,
                    spec: inner.spec.clone(),
                };
                Ok(Gate::Proceed(ticket, value))
            }
            Err(reason) => Ok(Gate::Skip(reason)),
        }
    }

    /// Whether the ticket's epoch is still the live one
    pub fn is_current(&self, ticket: &Ticket) -> bool {
        let inner = self.lock();
        !inner.closed && inner.epoch == ticket.epoch
    }

    /// Apply a result if its ticket is still current; returns whether it was
    /// applied. Always clears `loading` when applied.
    pub fn commit(&self, ticket: &Ticket, f: impl FnOnce(&mut SessionInner<T>)) -> bool {
        let mut inner = self.lock();
        if inner.closed || inner.epoch != ticket.epoch {
            return false;
        }
        f(&mut *inner);
        inner.loading = false;
        true
    }

    /// Record a failed request; returns whether it was still current
    pub fn fail(&self, ticket: &Ticket, error: QueryError) -> bool {
        self.commit(ticket, |inner| inner.last_error = Some(error))
    }

    /// Settle a failed request: current failures are recorded and returned,
    /// stale ones are dropped
    pub fn reject(&self, ticket: &Ticket, error: QueryError) -> Result<Navigation> {
        if self.fail(ticket, error.clone()) {
            warn!("Request on '{}' failed: {}", ticket.spec.collection, error);
            Err(error.into())
        } else {
            debug!(
                "Discarding stale failure on '{}': {}",
                ticket.spec.collection, error
            );
            Ok(Navigation::Stale)
        }
    }

    /// Time since the current epoch started
    pub fn elapsed(&self) -> Duration {
        self.lock().started_at.elapsed()
    }

    /// Swap the specification. Returns false when it is unchanged.
    pub fn reconfigure(&self, spec: QuerySpec) -> Result<bool> {
        spec.validate()?;

        let mut inner = self.lock();
        if inner.closed {
            return Err(QueryError::SessionClosed.into());
        }
        if inner.spec == spec {
            return Ok(false);
        }

        inner.spec = spec;
        inner.epoch = Uuid::new_v4();
        inner.started_at = Instant::now();
        inner.loading = false;
        inner.last_error = None;
        inner.total_count = 0;
        inner.state = T::default();
        Ok(true)
    }

    /// Reset the mode-specific bookkeeping without touching the epoch
    pub fn reset_state(&self) {
        self.lock().state = T::default();
    }

    /// Tear the session down; later results are ignored
    pub fn close(&self) {
        let mut inner = self.lock();
        inner.closed = true;
        inner.epoch = Uuid::new_v4();
        inner.loading = false;
        inner.state = T::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Counter {
        value: u32,
    }

    fn session() -> Session<Counter> {
        Session::new(QuerySpec::new("projects", "createdAt"))
    }

    #[test]
    fn test_begin_gates_on_loading() {
        let session = session();
        let Gate::Proceed(ticket, ()) = session.begin(|_| Ok(())).unwrap() else {
            panic!("first request should proceed");
        };
        assert!(matches!(
            session.begin(|_| Ok(())).unwrap(),
            Gate::Skip(SkipReason::Loading)
        ));

        assert!(session.commit(&ticket, |inner| inner.state.value = 1));
        assert!(!session.read(|inner| inner.loading));
        assert_eq!(session.read(|inner| inner.state.value), 1);
    }

    #[test]
    fn test_new_epoch_discards_old_ticket() {
        let session = session();
        let old = session.start_epoch().unwrap();
        let new = session.start_epoch().unwrap();

        assert!(!session.is_current(&old));
        assert!(!session.commit(&old, |inner| inner.state.value = 7));
        assert!(session.read(|inner| inner.loading));

        assert!(session.commit(&new, |inner| inner.state.value = 3));
        assert_eq!(session.read(|inner| inner.state.value), 3);
    }

    #[test]
    fn test_reconfigure_resets_only_on_change() {
        let session = session();
        let ticket = session.start_epoch().unwrap();
        session.commit(&ticket, |inner| {
            inner.state.value = 5;
            inner.total_count = 12;
        });

        assert!(!session.reconfigure(QuerySpec::new("projects", "createdAt")).unwrap());
        assert_eq!(session.read(|inner| inner.state.value), 5);

        assert!(session.reconfigure(QuerySpec::new("contracts", "createdAt")).unwrap());
        assert_eq!(session.read(|inner| inner.state.value), 0);
        assert_eq!(session.read(|inner| inner.total_count), 0);
        assert!(session.reconfigure(QuerySpec::new("", "createdAt")).is_err());
    }

    #[test]
    fn test_reject_returns_current_failures_only() {
        let session = session();
        let stale = session.start_epoch().unwrap();
        let current = session.start_epoch().unwrap();
        let error = QueryError::PageFailed {
            collection: "projects".to_string(),
            reason: "timeout".to_string(),
        };

        assert_eq!(session.reject(&stale, error.clone()).unwrap(), Navigation::Stale);
        assert!(session.read(|inner| inner.last_error.is_none()));

        assert!(session.reject(&current, error.clone()).is_err());
        assert_eq!(session.read(|inner| inner.last_error.clone()), Some(error));
        assert!(!session.read(|inner| inner.loading));
    }

    #[test]
    fn test_close_rejects_further_requests() {
        let session = session();
        let ticket = session.start_epoch().unwrap();
        session.close();

        assert!(!session.fail(&ticket, QueryError::SessionClosed));
        assert!(session.start_epoch().is_err());
        assert!(session.begin(|_| Ok(())).is_err());
    }
}
