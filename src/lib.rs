pub mod config;
pub mod error;
pub mod features;
pub mod fetch;
pub mod ingest;
pub mod pipeline;
pub mod schema;
pub mod session;
pub mod table;

pub use config::{PipelineConfig, SourceLocation};
pub use error::{PipelineError, Result};
pub use pipeline::RunSummary;
pub use session::Session;
