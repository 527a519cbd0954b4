//! The query pipeline.
//!
//! [`QueryPipeline`] owns the query id counter and the two compiled query
//! collections. A pass walks the logical queries in input order:
//!
//! ```text
//! LogicalQuery ─► refine ─► RefinedQuery ─► partition ─► select ─► assign id
//!                                                                      │
//!                        dp_queries ◄── commit ◄── compile dp + sp ◄───┘
//!                        sp_queries ◄──┘
//! ```
//!
//! Both compiled halves are produced before either is committed, so
//! `dp_queries` and `sp_queries` always have equal length and matching ids.

use std::sync::Arc;

use tracing::{debug, info};

use super::error::PipelineError;
use crate::query::{
    ChainCompiler, CompiledDpQuery, CompiledSpQuery, Compiler, FirstCandidate, LevelRefiner,
    LogicalQuery, Partitioner, Plane, PlanSelector, QueryId, RefinedQuery, Refiner,
    SplitPartitioner,
};

/// Default number of candidate partition plans requested per refined query.
pub const DEFAULT_PARTITION_CANDIDATES: usize = 4;

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Upper bound on candidate plans requested from the partitioner.
    pub partition_candidates: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            partition_candidates: DEFAULT_PARTITION_CANDIDATES,
        }
    }
}

impl From<&crate::config::PipelineSettings> for PipelineConfig {
    fn from(settings: &crate::config::PipelineSettings) -> Self {
        Self {
            partition_candidates: settings.partition_candidates,
        }
    }
}

/// The external algorithms a pipeline drives.
#[derive(Clone)]
pub struct Collaborators {
    pub refiner: Arc<dyn Refiner>,
    pub partitioner: Arc<dyn Partitioner>,
    pub compiler: Arc<dyn Compiler>,
    pub selector: Arc<dyn PlanSelector>,
}

impl Collaborators {
    /// Create a collaborator set that selects the first candidate plan.
    pub fn new(
        refiner: Arc<dyn Refiner>,
        partitioner: Arc<dyn Partitioner>,
        compiler: Arc<dyn Compiler>,
    ) -> Self {
        Self {
            refiner,
            partitioner,
            compiler,
            selector: Arc::new(FirstCandidate),
        }
    }

    /// The reference operator-chain collaborators.
    pub fn reference() -> Self {
        Self::new(
            Arc::new(LevelRefiner),
            Arc::new(SplitPartitioner),
            Arc::new(ChainCompiler),
        )
    }

    /// Replace the plan selection policy.
    pub fn with_selector(mut self, selector: Arc<dyn PlanSelector>) -> Self {
        self.selector = selector;
        self
    }
}

/// Queries compiled during one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassOutput {
    pub dp_queries: Vec<CompiledDpQuery>,
    pub sp_queries: Vec<CompiledSpQuery>,
}

impl PassOutput {
    pub fn len(&self) -> usize {
        self.dp_queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dp_queries.is_empty()
    }
}

/// Refines, partitions and compiles logical queries.
///
/// Collections only grow: entries are appended in assignment order and
/// never reordered or removed, except by [`QueryPipeline::reset`].
pub struct QueryPipeline {
    collaborators: Collaborators,
    config: PipelineConfig,
    next_qid: QueryId,
    dp_queries: Vec<CompiledDpQuery>,
    sp_queries: Vec<CompiledSpQuery>,
    passes: u64,
}

impl QueryPipeline {
    pub fn new(collaborators: Collaborators, config: PipelineConfig) -> Self {
        Self {
            collaborators,
            config,
            next_qid: QueryId::FIRST,
            dp_queries: Vec::new(),
            sp_queries: Vec::new(),
            passes: 0,
        }
    }

    /// Run one pass over `queries`.
    ///
    /// On error the pass stops; queries committed earlier in the pass stay
    /// in the collections.
    pub fn run(&mut self, queries: &[LogicalQuery]) -> Result<PassOutput, PipelineError> {
        self.passes += 1;
        info!(
            pass = self.passes,
            logical_queries = queries.len(),
            "Starting pipeline pass"
        );

        let mut output = PassOutput::default();

        for (logical_index, query) in queries.iter().enumerate() {
            let refined = self
                .collaborators
                .refiner
                .refine(query, logical_index)
                .map_err(|source| PipelineError::Refine {
                    logical_index,
                    source,
                })?;

            if refined.is_empty() {
                debug!(
                    logical_index,
                    name = %query.name,
                    "Refinement produced no variants, skipping"
                );
                continue;
            }

            for mut refined_query in refined {
                let (dp, sp) = self.compile_variant(logical_index, &mut refined_query)?;
                output.dp_queries.push(dp.clone());
                output.sp_queries.push(sp.clone());
                self.dp_queries.push(dp);
                self.sp_queries.push(sp);
            }
        }

        info!(
            pass = self.passes,
            compiled = output.len(),
            total = self.dp_queries.len(),
            "Pipeline pass complete"
        );

        Ok(output)
    }

    fn compile_variant(
        &mut self,
        logical_index: usize,
        query: &mut RefinedQuery,
    ) -> Result<(CompiledDpQuery, CompiledSpQuery), PipelineError> {
        let variant = query.variant;

        let candidates = self
            .collaborators
            .partitioner
            .propose_partitions(query, self.config.partition_candidates)
            .map_err(|source| PipelineError::Partition {
                logical_index,
                variant,
                source,
            })?;

        let chosen = self
            .collaborators
            .selector
            .select(query, &candidates)
            .and_then(|index| candidates.get(index).copied())
            .ok_or(PipelineError::NoPartitionPlan {
                logical_index,
                variant,
            })?;

        query.partition_plans = candidates;
        query.partition_plan_final = Some(chosen);

        let qid = self.assign_query_id();
        info!(
            qid = %qid,
            name = %query.name,
            logical_index,
            variant,
            level = ?query.refinement_level,
            split = chosen.split,
            "Refined query"
        );

        let compiler = &self.collaborators.compiler;
        let dp = compiler
            .compile_dp(query, qid)
            .map_err(|source| PipelineError::Compile {
                logical_index,
                variant,
                qid,
                plane: Plane::Data,
                source,
            })?;
        let sp = compiler
            .compile_sp(query, qid)
            .map_err(|source| PipelineError::Compile {
                logical_index,
                variant,
                qid,
                plane: Plane::Stream,
                source,
            })?;

        debug!(qid = %qid, expr = %dp.expr, "DP query");
        debug!(qid = %qid, expr = %sp.expr, "SP query");

        Ok((dp, sp))
    }

    fn assign_query_id(&mut self) -> QueryId {
        let qid = self.next_qid;
        self.next_qid = qid.next();
        qid
    }

    /// All data-plane queries compiled so far, in assignment order.
    pub fn dp_queries(&self) -> &[CompiledDpQuery] {
        &self.dp_queries
    }

    /// All stream-plane queries compiled so far, in assignment order.
    pub fn sp_queries(&self) -> &[CompiledSpQuery] {
        &self.sp_queries
    }

    /// The id the next compiled query will receive.
    pub fn next_query_id(&self) -> QueryId {
        self.next_qid
    }

    /// Number of passes started.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Clear both collections and restart ids at 1.
    pub fn reset(&mut self) {
        self.next_qid = QueryId::FIRST;
        self.dp_queries.clear();
        self.sp_queries.clear();
        self.passes = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Stage;
    use crate::query::{CollaboratorError, PartitionPlan};

    fn query(name: &str, operators: &[&str]) -> LogicalQuery {
        LogicalQuery::new(name, operators.iter().map(|s| s.to_string()).collect())
    }

    fn pipeline() -> QueryPipeline {
        QueryPipeline::new(Collaborators::reference(), PipelineConfig::default())
    }

    /// Compiler that fails the stream-plane half for one query id.
    struct FailingSpCompiler {
        fail_at: QueryId,
    }

    impl Compiler for FailingSpCompiler {
        fn compile_dp(
            &self,
            query: &RefinedQuery,
            qid: QueryId,
        ) -> Result<CompiledDpQuery, CollaboratorError> {
            ChainCompiler.compile_dp(query, qid)
        }

        fn compile_sp(
            &self,
            query: &RefinedQuery,
            qid: QueryId,
        ) -> Result<CompiledSpQuery, CollaboratorError> {
            if qid == self.fail_at {
                return Err(CollaboratorError::new("unsupported operator"));
            }
            ChainCompiler.compile_sp(query, qid)
        }
    }

    /// Partitioner that never proposes anything.
    struct NoPlans;

    impl Partitioner for NoPlans {
        fn propose_partitions(
            &self,
            _query: &RefinedQuery,
            _max_candidates: usize,
        ) -> Result<Vec<PartitionPlan>, CollaboratorError> {
            Ok(Vec::new())
        }
    }

    /// Selector that picks the last candidate.
    struct LastCandidate;

    impl PlanSelector for LastCandidate {
        fn select(&self, _query: &RefinedQuery, candidates: &[PartitionPlan]) -> Option<usize> {
            candidates.len().checked_sub(1)
        }
    }

    #[test]
    fn test_default_config() {
        assert_eq!(PipelineConfig::default().partition_candidates, 4);
    }

    #[test]
    fn test_empty_input() {
        let mut pipeline = pipeline();
        let output = pipeline.run(&[]).unwrap();
        assert!(output.is_empty());
        assert_eq!(pipeline.next_query_id(), QueryId::FIRST);
    }

    #[test]
    fn test_ids_assigned_in_input_order() {
        let mut pipeline = pipeline();
        let output = pipeline
            .run(&[query("a", &["map(x)"]), query("b", &["map(y)"])])
            .unwrap();

        let dp_ids: Vec<_> = output.dp_queries.iter().map(|q| q.qid.value()).collect();
        let sp_ids: Vec<_> = output.sp_queries.iter().map(|q| q.qid.value()).collect();
        assert_eq!(dp_ids, vec![1, 2]);
        assert_eq!(sp_ids, vec![1, 2]);
        assert_eq!(pipeline.dp_queries().len(), 2);
        assert_eq!(pipeline.sp_queries().len(), 2);
    }

    #[test]
    fn test_first_candidate_offloads_whole_chain() {
        let mut pipeline = pipeline();
        let output = pipeline.run(&[query("a", &["filter(x)", "map(y)"])]).unwrap();
        assert_eq!(output.dp_queries[0].expr, "filter(x).map(y)");
        assert_eq!(output.sp_queries[0].expr, "identity");
    }

    #[test]
    fn test_custom_selector() {
        let collaborators = Collaborators::reference().with_selector(Arc::new(LastCandidate));
        let mut pipeline = QueryPipeline::new(collaborators, PipelineConfig::default());
        let output = pipeline.run(&[query("a", &["filter(x)", "map(y)"])]).unwrap();
        assert_eq!(output.dp_queries[0].expr, "identity");
        assert_eq!(output.sp_queries[0].expr, "filter(x).map(y)");
    }

    #[test]
    fn test_empty_refinement_is_skipped() {
        let mut pipeline = pipeline();
        let output = pipeline
            .run(&[query("empty", &[]), query("b", &["map(y)"])])
            .unwrap();
        assert_eq!(output.len(), 1);
        assert_eq!(output.dp_queries[0].qid, QueryId::FIRST);
    }

    #[test]
    fn test_refinement_levels_expand_variants() {
        let mut pipeline = pipeline();
        let q = query("ddos", &["map(dIP)"]).with_refinement_levels(vec![8, 32]);
        let output = pipeline.run(&[q]).unwrap();
        assert_eq!(output.len(), 2);
        assert_eq!(output.dp_queries[0].expr, "refine(8).map(dIP)");
        assert_eq!(output.dp_queries[1].expr, "refine(32).map(dIP)");
    }

    #[test]
    fn test_compile_failure_commits_neither_half() {
        let collaborators = Collaborators::new(
            Arc::new(LevelRefiner),
            Arc::new(SplitPartitioner),
            Arc::new(FailingSpCompiler {
                fail_at: QueryId::new(2),
            }),
        );
        let mut pipeline = QueryPipeline::new(collaborators, PipelineConfig::default());

        let err = pipeline
            .run(&[query("a", &["map(x)"]), query("b", &["map(y)"])])
            .unwrap_err();

        assert_eq!(err.stage(), Stage::Compile);
        assert_eq!(err.query_id(), Some(QueryId::new(2)));
        assert_eq!(err.logical_index(), 1);
        assert_eq!(pipeline.dp_queries().len(), 1);
        assert_eq!(pipeline.sp_queries().len(), 1);
        assert_eq!(pipeline.dp_queries()[0].qid, QueryId::FIRST);
        // The failed id is consumed, not reused.
        assert_eq!(pipeline.next_query_id(), QueryId::new(3));
    }

    #[test]
    fn test_no_partition_plan() {
        let collaborators = Collaborators::new(
            Arc::new(LevelRefiner),
            Arc::new(NoPlans),
            Arc::new(ChainCompiler),
        );
        let mut pipeline = QueryPipeline::new(collaborators, PipelineConfig::default());
        let err = pipeline.run(&[query("a", &["map(x)"])]).unwrap_err();
        assert!(matches!(err, PipelineError::NoPartitionPlan { .. }));
        assert_eq!(pipeline.next_query_id(), QueryId::FIRST);
    }

    #[test]
    fn test_ids_continue_across_passes() {
        let mut pipeline = pipeline();
        pipeline.run(&[query("a", &["map(x)"])]).unwrap();
        let second = pipeline.run(&[query("b", &["map(y)"])]).unwrap();
        assert_eq!(second.dp_queries[0].qid, QueryId::new(2));
        assert_eq!(pipeline.dp_queries().len(), 2);
        assert_eq!(pipeline.passes(), 2);
    }

    #[test]
    fn test_reset_restarts_ids() {
        let input = [query("a", &["filter(x)", "map(y)"]), query("b", &["map(z)"])];
        let mut pipeline = pipeline();
        let first = pipeline.run(&input).unwrap();
        pipeline.reset();
        let second = pipeline.run(&input).unwrap();
        assert_eq!(first, second);
        assert_eq!(pipeline.dp_queries().len(), 2);
    }
}
