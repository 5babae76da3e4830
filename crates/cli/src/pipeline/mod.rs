//! Pipeline orchestration module.

mod orchestrator;
mod sink;
mod stats;

pub use orchestrator::{InputSource, Pipeline, PipelineConfig};
pub use sink::CountingSink;
pub use stats::PipelineStats;
