//! zeto library
//!
//! Cursor pagination sessions over document collections, the stores they
//! read from, and the role-based route guard used by the dashboard.
//!
//! # Modules
//!
//! - `cli`: Command-line interface and argument parsing
//! - `config`: Configuration management
//! - `connection`: MongoDB connection management
//! - `error`: Error types and handling
//! - `formatter`: Output formatting of pages, feeds and guard decisions
//! - `guard`: Role-based route access
//! - `pagination`: Paged and infinite cursor pagination sessions
//! - `seed`: Mock project documents
//! - `store`: Document store contract with MongoDB and in-memory backends
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use zeto::{Config, ConnectionManager, MongoStore, PagedPaginator, QuerySpec};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let mut manager = ConnectionManager::new(config.store.clone());
//!     manager.connect().await?;
//!
//!     let store = Arc::new(MongoStore::from_manager(&manager)?);
//!     let pager = PagedPaginator::new(store, QuerySpec::from_config("projects", &config.pagination))?;
//!     pager.initialize().await?;
//!     println!("{} document(s) on page 1", pager.items().len());
//!
//!     manager.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod connection;
pub mod error;
pub mod formatter;
pub mod guard;
pub mod pagination;
pub mod seed;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use connection::ConnectionManager;
pub use error::{Result, ZetoError};
pub use formatter::Formatter;
pub use guard::{GuardDecision, Role, RouteGuard};
pub use pagination::{InfinitePaginator, Navigation, PagedPaginator, QuerySpec};
pub use store::{DocumentStore, MemoryStore, MongoStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
