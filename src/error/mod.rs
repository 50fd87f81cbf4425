//! Error handling module.
//!
//! Every store failure is funnelled into [`QueryError`] at the document store
//! boundary. Paginators record the last one in their state and also return it,
//! wrapped in [`ZetoError`], to the caller.
//!
//! # Example
//!
//! ```rust
//! use zeto::error::{QueryError, Result, ZetoError};
//!
//! fn reject() -> Result<()> {
//!     Err(QueryError::InvalidSpec("page size must be positive".into()).into())
//! }
//!
//! assert!(matches!(reject(), Err(ZetoError::Query(_))));
//! ```

pub mod kinds;

// Re-export commonly used types
pub use kinds::{ConfigError, ConnectionError, QueryError, Result, StoreResult, ZetoError};
