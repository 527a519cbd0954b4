//! Query model and the collaborator seams of the compilation pipeline.
//!
//! - [`types`] - logical, refined and compiled query types
//! - [`traits`] - refiner, partitioner, compiler and plan-selection traits
//! - [`builtin`] - reference collaborators over operator chains
//! - [`loader`] - JSON query files

mod builtin;
mod loader;
mod traits;
mod types;

pub use builtin::{ChainCompiler, LevelRefiner, SplitPartitioner};
pub use loader::{load_queries, QueryFileError};
pub use traits::{CollaboratorError, Compiler, FirstCandidate, Partitioner, PlanSelector, Refiner};
pub use types::{
    CompiledDpQuery, CompiledSpQuery, LogicalQuery, PartitionPlan, Plane, QueryId, RefinedQuery,
};
