//! Query data model.
//!
//! A [`LogicalQuery`] is what users write. The refiner turns it into one or
//! more [`RefinedQuery`] variants, each of which is partitioned, assigned a
//! [`QueryId`], and compiled into a [`CompiledDpQuery`] / [`CompiledSpQuery`]
//! pair that share that id.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier of a compiled query.
///
/// Assigned by the pipeline, starting at 1, strictly increasing, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryId(u64);

impl QueryId {
    /// The first id handed out by a fresh pipeline.
    pub const FIRST: QueryId = QueryId(1);

    /// Create a query id from a raw value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw numeric value.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// The id following this one.
    pub fn next(&self) -> QueryId {
        QueryId(self.0 + 1)
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user-supplied monitoring query.
///
/// Operators are opaque expression strings in dataflow order
/// (e.g. `filter(proto == 17)`, `map(dIP)`, `reduce(sum)`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalQuery {
    /// Human-readable name, used in logs.
    pub name: String,

    /// Operator expressions in dataflow order.
    pub operators: Vec<String>,

    /// Refinement levels to expand the query over (coarsest first).
    #[serde(default)]
    pub refinement_levels: Vec<u8>,
}

impl LogicalQuery {
    /// Create a query without refinement levels.
    pub fn new(name: impl Into<String>, operators: Vec<String>) -> Self {
        Self {
            name: name.into(),
            operators,
            refinement_levels: Vec::new(),
        }
    }

    /// Set the refinement levels.
    pub fn with_refinement_levels(mut self, levels: Vec<u8>) -> Self {
        self.refinement_levels = levels;
        self
    }
}

/// How a refined query's computation is split between the two planes.
///
/// `split` counts the operators executed on the data plane; the remainder
/// runs on the stream plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionPlan {
    pub split: usize,
}

impl PartitionPlan {
    pub fn new(split: usize) -> Self {
        Self { split }
    }
}

/// One executable variant of a logical query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefinedQuery {
    /// Position of the originating logical query in the pipeline input.
    pub logical_index: usize,

    /// Position of this variant among its siblings.
    pub variant: usize,

    /// Name of the originating logical query.
    pub name: String,

    /// Operator expressions for this variant.
    pub operators: Vec<String>,

    /// Refinement level this variant runs at, if any.
    pub refinement_level: Option<u8>,

    /// Candidate plans proposed by the partitioner.
    pub partition_plans: Vec<PartitionPlan>,

    /// The plan chosen by the selection policy.
    pub partition_plan_final: Option<PartitionPlan>,
}

impl RefinedQuery {
    /// Create an unpartitioned variant.
    pub fn new(
        logical_index: usize,
        variant: usize,
        name: impl Into<String>,
        operators: Vec<String>,
        refinement_level: Option<u8>,
    ) -> Self {
        Self {
            logical_index,
            variant,
            name: name.into(),
            operators,
            refinement_level,
            partition_plans: Vec::new(),
            partition_plan_final: None,
        }
    }
}

/// Data-plane compiled form of a refined query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledDpQuery {
    pub qid: QueryId,
    pub expr: String,
}

/// Stream-plane compiled form of a refined query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledSpQuery {
    pub qid: QueryId,
    pub expr: String,
}

/// Compilation target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plane {
    Data,
    Stream,
}

impl Plane {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plane::Data => "data-plane",
            Plane::Stream => "stream-plane",
        }
    }
}

impl fmt::Display for Plane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
