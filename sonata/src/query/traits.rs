//! Collaborator traits consumed by the query pipeline.
//!
//! Refinement, partitioning and compilation are external algorithms. The
//! pipeline depends only on these traits, so real implementations and test
//! stubs plug in the same way.
//!
//! ```text
//! LogicalQuery ──► Refiner ──► RefinedQuery* ──► Partitioner ──► PartitionPlan*
//!                                                     │
//!                                              PlanSelector
//!                                                     ▼
//!                              Compiler ◄── RefinedQuery + final plan + QueryId
//!                                 │
//!                    CompiledDpQuery + CompiledSpQuery
//! ```

use thiserror::Error;

use super::types::{
    CompiledDpQuery, CompiledSpQuery, LogicalQuery, PartitionPlan, QueryId, RefinedQuery,
};

/// Failure reported by an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CollaboratorError(pub String);

impl CollaboratorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Expands a logical query into executable variants.
pub trait Refiner: Send + Sync {
    /// Returns the refined variants in order. An empty result is valid.
    fn refine(
        &self,
        query: &LogicalQuery,
        logical_index: usize,
    ) -> Result<Vec<RefinedQuery>, CollaboratorError>;
}

/// Proposes candidate partition plans for a refined query.
pub trait Partitioner: Send + Sync {
    /// Returns at most `max_candidates` plans, best first.
    fn propose_partitions(
        &self,
        query: &RefinedQuery,
        max_candidates: usize,
    ) -> Result<Vec<PartitionPlan>, CollaboratorError>;
}

/// Compiles a partitioned refined query for each plane.
///
/// Both methods receive a query whose `partition_plan_final` is set.
pub trait Compiler: Send + Sync {
    fn compile_dp(
        &self,
        query: &RefinedQuery,
        qid: QueryId,
    ) -> Result<CompiledDpQuery, CollaboratorError>;

    fn compile_sp(
        &self,
        query: &RefinedQuery,
        qid: QueryId,
    ) -> Result<CompiledSpQuery, CollaboratorError>;
}

/// Chooses the final partition plan among the candidates.
pub trait PlanSelector: Send + Sync {
    /// Returns the index of the chosen candidate, or `None` if none is usable.
    fn select(&self, query: &RefinedQuery, candidates: &[PartitionPlan]) -> Option<usize>;
}

/// Selects the first candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstCandidate;

impl PlanSelector for FirstCandidate {
    fn select(&self, _query: &RefinedQuery, candidates: &[PartitionPlan]) -> Option<usize> {
        if candidates.is_empty() {
            None
        } else {
            Some(0)
        }
    }
}
