//! Event-driven loader for delimited product catalog exports.
//!
//! An upload notification names one object; the object is streamed line by
//! line, each data row is checked for shape and inserted into the product
//! table. Bad rows are logged and skipped, the run only fails when the
//! database is unreachable or the source stream breaks.

pub mod config;
pub mod database;
pub mod errors;
pub mod ingestor;
pub mod models;
pub mod sources;
pub mod trigger;

pub use config::Config;
pub use errors::{IngestError, IngestResult};
pub use ingestor::IngestionOrchestrator;
pub use models::{RunOutcome, RunStatus};
