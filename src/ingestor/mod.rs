pub mod decoder;
pub mod lines;
pub mod orchestrator;
pub mod validator;

pub use decoder::{classify, decode};
pub use orchestrator::IngestionOrchestrator;
pub use validator::validate;
