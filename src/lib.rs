//! `trunk-opt`: run TrunkIR passes over modules in textual form.

pub mod pipeline;

pub use pipeline::{PipelineError, PipelineOptions, PipelineOutput, lower_file, lower_source};
