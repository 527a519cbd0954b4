//! Query compilation pipeline.
//!
//! Turns logical queries into id-tagged data-plane / stream-plane query
//! pairs by driving the refiner, partitioner, plan selector and compiler.

mod core;
mod error;

pub use self::core::{
    Collaborators, PassOutput, PipelineConfig, QueryPipeline, DEFAULT_PARTITION_CANDIDATES,
};
pub use error::{PipelineError, Stage};
