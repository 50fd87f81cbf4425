use std::{fmt, io};

/// Crate-wide `Result` type using [`ZetoError`] as the error.
///
/// This alias is re-exported by the parent `error` module and is intended
/// to be used throughout the crate for fallible operations.
pub type Result<T> = std::result::Result<T, ZetoError>;

/// Result type returned by document store backends.
pub type StoreResult<T> = std::result::Result<T, QueryError>;

/// Top-level error type for zeto operations.
///
/// This type wraps more specific error kinds and provides a single
/// error type that can be used throughout the crate.
#[derive(Debug)]
pub enum ZetoError {
    /// Store rejected a count or page request, or the query was malformed.
    Query(QueryError),

    /// Configuration errors.
    Config(ConfigError),

    /// Connection-related errors.
    Connection(ConnectionError),

    /// I/O errors.
    Io(io::Error),

    /// MongoDB driver errors outside of pagination queries.
    MongoDb(mongodb::error::Error),

    /// JSON/BSON (de)serialization errors.
    Serialization(String),

    /// Generic error with a free-form message.
    Generic(String),
}

/// Errors raised at the document store boundary.
///
/// Cloneable so a paginator can keep the last one in its state while also
/// returning it to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The count request was rejected (network, permission, quota).
    CountFailed { collection: String, reason: String },

    /// A page request was rejected (network, permission, quota).
    PageFailed { collection: String, reason: String },

    /// The query specification cannot be executed.
    InvalidSpec(String),

    /// The pagination session was closed.
    SessionClosed,
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Missing required field.
    MissingField(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },
}

/// Connection-specific errors.
#[derive(Debug)]
pub enum ConnectionError {
    /// Failed to establish a connection.
    ConnectionFailed(String),

    /// Invalid connection URI.
    InvalidUri(String),

    /// Not currently connected to MongoDB.
    NotConnected,

    /// Ping command failed.
    PingFailed(String),
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for ZetoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZetoError::Query(e) => write!(f, "Query error: {e}"),
            ZetoError::Config(e) => write!(f, "Configuration error: {e}"),
            ZetoError::Connection(e) => write!(f, "Connection error: {e}"),
            ZetoError::Io(e) => write!(f, "I/O error: {e}"),
            ZetoError::MongoDb(e) => write!(f, "MongoDB error: {e}"),
            ZetoError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            ZetoError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::CountFailed { collection, reason } => {
                write!(f, "count on '{collection}' failed: {reason}")
            }
            QueryError::PageFailed { collection, reason } => {
                write!(f, "page query on '{collection}' failed: {reason}")
            }
            QueryError::InvalidSpec(msg) => write!(f, "invalid query specification: {msg}"),
            QueryError::SessionClosed => write!(f, "pagination session is closed"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::MissingField(field) => write!(f, "Missing required field: {field}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::ConnectionFailed(msg) => write!(f, "Failed to connect: {msg}"),
            ConnectionError::InvalidUri(uri) => write!(f, "Invalid connection URI: {uri}"),
            ConnectionError::NotConnected => write!(f, "Not connected to MongoDB"),
            ConnectionError::PingFailed(msg) => write!(f, "Ping failed: {msg}"),
        }
    }
}

impl std::error::Error for ZetoError {}
impl std::error::Error for QueryError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for ConnectionError {}

/* ========================= Conversions to ZetoError ========================= */

impl From<io::Error> for ZetoError {
    fn from(err: io::Error) -> Self {
        ZetoError::Io(err)
    }
}

impl From<mongodb::error::Error> for ZetoError {
    fn from(err: mongodb::error::Error) -> Self {
        ZetoError::MongoDb(err)
    }
}

impl From<QueryError> for ZetoError {
    fn from(err: QueryError) -> Self {
        ZetoError::Query(err)
    }
}

impl From<ConfigError> for ZetoError {
    fn from(err: ConfigError) -> Self {
        ZetoError::Config(err)
    }
}

impl From<ConnectionError> for ZetoError {
    fn from(err: ConnectionError) -> Self {
        ZetoError::Connection(err)
    }
}

impl From<serde_json::Error> for ZetoError {
    fn from(err: serde_json::Error) -> Self {
        ZetoError::Serialization(err.to_string())
    }
}

impl From<bson::ser::Error> for ZetoError {
    fn from(err: bson::ser::Error) -> Self {
        ZetoError::Serialization(err.to_string())
    }
}

impl From<String> for ZetoError {
    fn from(msg: String) -> Self {
        ZetoError::Generic(msg)
    }
}

impl From<&str> for ZetoError {
    fn from(msg: &str) -> Self {
        ZetoError::Generic(msg.to_owned())
    }
}
