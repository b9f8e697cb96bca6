//! Error type definitions for the catalog ingestion job
//!
//! Errors are split by scope. Fatal errors (`ConnectionError`, `StreamError`)
//! end a run and are carried in [`IngestError`]. Row-scoped errors
//! (`SchemaError`, `LoadError`) only ever reject a single line and are
//! recorded in the run outcome while processing continues.

use thiserror::Error;

/// Fatal error that terminates an ingestion run
#[derive(Error, Debug)]
pub enum IngestError {
    /// The database could not be reached or refused the credentials
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// The source object could not be opened or failed mid-read
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    /// Configuration could not be resolved
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The trigger event did not name an object
    #[error("Trigger error: {0}")]
    Trigger(#[from] TriggerError),
}

/// Database connection failures
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// The connection URL could not be built from the configured parts
    #[error("Invalid connection URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// The driver failed to open a connection
    #[error("Failed to connect to {driver} database: {source}")]
    ConnectFailed {
        driver: String,
        #[source]
        source: sqlx::Error,
    },
}

/// Source stream failures
#[derive(Error, Debug)]
pub enum StreamError {
    /// The object could not be opened (missing object, bad credentials, ...)
    #[error("Failed to open object {location}: {message}")]
    OpenFailed { location: String, message: String },

    /// Reading from an already opened stream failed
    #[error("Read failed at line {line_index}: {source}")]
    ReadFailed {
        line_index: usize,
        #[source]
        source: std::io::Error,
    },

    /// The object store backend could not be configured
    #[error("Object store setup failed: {message}")]
    StoreSetup { message: String },
}

/// A decoded line did not have the expected number of fields
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Line {line_index}: expected {expected_count} columns, found {actual_count}")]
pub struct SchemaError {
    pub line_index: usize,
    pub actual_count: usize,
    pub expected_count: usize,
}

/// The insert for a structurally valid record failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Insert failed: {cause}")]
pub struct LoadError {
    pub cause: String,
}

/// Failure while releasing the connection during shutdown.
///
/// Source streams are released by dropping them, which cannot fail.
#[derive(Error, Debug)]
pub enum ResourceReleaseError {
    #[error("Failed to close database connection: {0}")]
    Connection(#[source] sqlx::Error),
}

/// Configuration resolution errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required key was not set
    #[error("Missing configuration value: {key}")]
    Missing { key: String },

    /// A key was set but could not be interpreted
    #[error("Invalid configuration value for {key}: {message}")]
    Invalid { key: String, message: String },

    /// A configuration file could not be read
    #[error("Failed to read configuration file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A configuration file could not be parsed
    #[error("Failed to parse configuration file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Trigger event decoding errors
#[derive(Error, Debug)]
pub enum TriggerError {
    #[error("Event contains no records")]
    NoRecords,

    #[error("Malformed event: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Object key could not be decoded: {message}")]
    InvalidKey { message: String },
}

impl LoadError {
    /// Create a load error from any displayable cause
    pub fn new<S: Into<String>>(cause: S) -> Self {
        Self {
            cause: cause.into(),
        }
    }
}

impl From<sqlx::Error> for LoadError {
    fn from(err: sqlx::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl StreamError {
    /// Create an open failure for an object location
    pub fn open_failed<L: Into<String>, M: Into<String>>(location: L, message: M) -> Self {
        Self::OpenFailed {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Create a store setup failure
    pub fn store_setup<M: Into<String>>(message: M) -> Self {
        Self::StoreSetup {
            message: message.into(),
        }
    }
}

impl ConfigError {
    /// Create a missing-key error
    pub fn missing<K: Into<String>>(key: K) -> Self {
        Self::Missing { key: key.into() }
    }

    /// Create an invalid-value error
    pub fn invalid<K: Into<String>, M: Into<String>>(key: K, message: M) -> Self {
        Self::Invalid {
            key: key.into(),
            message: message.into(),
        }
    }
}

impl IngestError {
    /// Whether this failure happened before any row could be read
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Whether this failure came from the source stream
    pub fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }
}
