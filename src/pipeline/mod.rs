//! Job pipeline

pub mod orchestrator;

pub use orchestrator::{run, run_with, validate_run, Job, JobFailure, JobStage, PipelineResult};
