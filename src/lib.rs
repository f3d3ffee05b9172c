pub mod enhance;
pub mod error;
pub mod parser;
pub mod pdf;
pub mod pipeline;
pub mod schema;
pub mod settings;

pub use error::{EnhancementError, PipelineError, ValidationError, Violation};
pub use pipeline::{EnhancementStatus, Extraction, Pipeline, Stage};
pub use schema::{DocumentRecord, Field};
pub use settings::{ProviderKind, Settings};
