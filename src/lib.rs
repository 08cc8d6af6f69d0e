pub mod analyzer;
pub mod cleaner;
pub mod dedupe;
pub mod error;
pub mod logging;
pub mod models;
pub mod normalizer;
pub mod parser;
pub mod pipeline;
pub mod ranking;
pub mod source;
pub mod store;

pub use error::{PipelineError, PipelineResult};
pub use models::{CleanedEntry, Config, Division};
pub use pipeline::{process, run, ProcessOptions, RunReport};
