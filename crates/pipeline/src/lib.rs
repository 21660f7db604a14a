pub mod gaps;
pub mod orchestrator;

pub use orchestrator::{
    DatabaseStatus, Freshness, Pipeline, PipelineConfig, ScanOptions, ScanOutcome,
};
