//! Centralized error handling for the catalog ingestion job
//!
//! # Error Categories
//!
//! - **Fatal**: [`ConnectionError`], [`StreamError`], wrapped in [`IngestError`]
//! - **Row-scoped**: [`SchemaError`], [`LoadError`], recorded per line
//! - **Shutdown**: [`ResourceReleaseError`], logged only
//! - **Setup**: [`ConfigError`], [`TriggerError`]

pub mod types;

pub use types::*;

/// Convenience type alias for Results using IngestError
pub type IngestResult<T> = Result<T, IngestError>;

/// Convenience type alias for configuration Results
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Convenience type alias for stream Results
pub type StreamResult<T> = Result<T, StreamError>;
