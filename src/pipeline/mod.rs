//! Menu digitization pipeline
//!
//! Sequences upload, text extraction, menu parsing and per-dish image
//! resolution while tracking the status of each named step.

mod orchestrator;
mod types;

pub use orchestrator::MenuPipeline;
pub use types::{
    EnrichedMenu, MenuUpload, PipelineError, PipelineProgress, ProcessStep, StepId, StepStatus,
};
