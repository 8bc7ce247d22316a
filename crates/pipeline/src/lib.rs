//! Hourly batch cycle orchestration.

pub mod cycle;
pub mod scheduler;

pub use cycle::{CycleReport, PipelineCycle};
pub use scheduler::PipelineScheduler;
