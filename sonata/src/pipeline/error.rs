//! Error types for the query pipeline.
//!
//! Errors are categorized by pipeline stage and carry the indices of the
//! query that failed so a fatal error can be traced back to the input.

use std::fmt;

use thiserror::Error;

use crate::query::{CollaboratorError, Plane, QueryId};

/// Pipeline stage a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Refine,
    Partition,
    Compile,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Refine => "refine",
            Stage::Partition => "partition",
            Stage::Compile => "compile",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that abort a pipeline pass.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The refiner rejected a logical query.
    #[error("refine stage failed for logical query {logical_index}: {source}")]
    Refine {
        logical_index: usize,
        #[source]
        source: CollaboratorError,
    },

    /// The partitioner failed to propose plans.
    #[error(
        "partition stage failed for logical query {logical_index}, variant {variant}: {source}"
    )]
    Partition {
        logical_index: usize,
        variant: usize,
        #[source]
        source: CollaboratorError,
    },

    /// No candidate plan was proposed or the selector chose none.
    #[error("partition stage found no usable plan for logical query {logical_index}, variant {variant}")]
    NoPartitionPlan { logical_index: usize, variant: usize },

    /// Compilation failed for one plane; neither half was committed.
    #[error(
        "compile stage failed for query {qid} ({plane}) of logical query {logical_index}, variant {variant}: {source}"
    )]
    Compile {
        logical_index: usize,
        variant: usize,
        qid: QueryId,
        plane: Plane,
        #[source]
        source: CollaboratorError,
    },
}

impl PipelineError {
    /// The stage that failed.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Refine { .. } => Stage::Refine,
            Self::Partition { .. } | Self::NoPartitionPlan { .. } => Stage::Partition,
            Self::Compile { .. } => Stage::Compile,
        }
    }

    /// Index of the logical query that failed.
    pub fn logical_index(&self) -> usize {
        match self {
            Self::Refine { logical_index, .. }
            | Self::Partition { logical_index, .. }
            | Self::NoPartitionPlan { logical_index, .. }
            | Self::Compile { logical_index, .. } => *logical_index,
        }
    }

    /// Query id assigned before the failure, if any.
    pub fn query_id(&self) -> Option<QueryId> {
        match self {
            Self::Compile { qid, .. } => Some(*qid),
            _ => None,
        }
    }
}
