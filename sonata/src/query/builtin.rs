//! Reference collaborators.
//!
//! Simple, deterministic implementations of the collaborator traits. They
//! treat a query as an operator chain and a partition plan as a split point
//! in that chain. The CLI uses them by default; tests use them as stubs.

use super::traits::{CollaboratorError, Compiler, Partitioner, Refiner};
use super::types::{
    CompiledDpQuery, CompiledSpQuery, LogicalQuery, PartitionPlan, QueryId, RefinedQuery,
};

/// Expression emitted for a plane with no operators.
const IDENTITY_EXPR: &str = "identity";

/// Emits one variant per refinement level, or a single unrefined variant.
#[derive(Debug, Clone, Copy, Default)]
pub struct LevelRefiner;

impl Refiner for LevelRefiner {
    fn refine(
        &self,
        query: &LogicalQuery,
        logical_index: usize,
    ) -> Result<Vec<RefinedQuery>, CollaboratorError> {
        if query.operators.is_empty() {
            return Ok(Vec::new());
        }

        if query.refinement_levels.is_empty() {
            return Ok(vec![RefinedQuery::new(
                logical_index,
                0,
                query.name.clone(),
                query.operators.clone(),
                None,
            )]);
        }

        Ok(query
            .refinement_levels
            .iter()
            .enumerate()
            .map(|(variant, level)| {
                RefinedQuery::new(
                    logical_index,
                    variant,
                    query.name.clone(),
                    query.operators.clone(),
                    Some(*level),
                )
            })
            .collect())
    }
}

/// Proposes split points, deepest data-plane offload first.
#[derive(Debug, Clone, Copy, Default)]
pub struct SplitPartitioner;

impl Partitioner for SplitPartitioner {
    fn propose_partitions(
        &self,
        query: &RefinedQuery,
        max_candidates: usize,
    ) -> Result<Vec<PartitionPlan>, CollaboratorError> {
        let operator_count = query.operators.len();
        Ok((0..=operator_count)
            .rev()
            .take(max_candidates)
            .map(PartitionPlan::new)
            .collect())
    }
}

/// Renders each plane's share of the operator chain joined with `.`.
///
/// The refinement level becomes a leading `refine(level)` operator on the
/// data-plane expression.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChainCompiler;

impl ChainCompiler {
    fn split<'a>(
        &self,
        query: &'a RefinedQuery,
    ) -> Result<(&'a [String], &'a [String]), CollaboratorError> {
        let plan = query.partition_plan_final.ok_or_else(|| {
            CollaboratorError::new(format!("no partition plan selected for '{}'", query.name))
        })?;

        if plan.split > query.operators.len() {
            return Err(CollaboratorError::new(format!(
                "split {} exceeds {} operators in '{}'",
                plan.split,
                query.operators.len(),
                query.name
            )));
        }

        Ok(query.operators.split_at(plan.split))
    }
}

fn render(prefix: Option<String>, operators: &[String]) -> String {
    let parts: Vec<String> = prefix.into_iter().chain(operators.iter().cloned()).collect();
    if parts.is_empty() {
        IDENTITY_EXPR.to_string()
    } else {
        parts.join(".")
    }
}

impl Compiler for ChainCompiler {
    fn compile_dp(
        &self,
        query: &RefinedQuery,
        qid: QueryId,
    ) -> Result<CompiledDpQuery, CollaboratorError> {
        let (data_plane, _) = self.split(query)?;
        let prefix = query.refinement_level.map(|level| format!("refine({})", level));
        Ok(CompiledDpQuery {
            qid,
            expr: render(prefix, data_plane),
        })
    }

    fn compile_sp(
        &self,
        query: &RefinedQuery,
        qid: QueryId,
    ) -> Result<CompiledSpQuery, CollaboratorError> {
        let (_, stream_plane) = self.split(query)?;
        Ok(CompiledSpQuery {
            qid,
            expr: render(None, stream_plane),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ops(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_refiner_without_levels_yields_single_variant() {
        let query = LogicalQuery::new("ddos", ops(&["filter(proto == 17)", "map(dIP)"]));
        let refined = LevelRefiner.refine(&query, 3).unwrap();
        assert_eq!(refined.len(), 1);
        assert_eq!(refined[0].logical_index, 3);
        assert_eq!(refined[0].refinement_level, None);
    }

    #[test]
    fn test_refiner_one_variant_per_level() {
        let query = LogicalQuery::new("ddos", ops(&["map(dIP)"])).with_refinement_levels(vec![8, 16, 32]);
        let refined = LevelRefiner.refine(&query, 0).unwrap();
        let levels: Vec<_> = refined.iter().map(|r| r.refinement_level).collect();
        assert_eq!(levels, vec![Some(8), Some(16), Some(32)]);
        let variants: Vec<_> = refined.iter().map(|r| r.variant).collect();
        assert_eq!(variants, vec![0, 1, 2]);
    }

    #[test]
    fn test_refiner_empty_query_yields_nothing() {
        let query = LogicalQuery::new("empty", Vec::new());
        assert!(LevelRefiner.refine(&query, 0).unwrap().is_empty());
    }

    #[test]
    fn test_partitioner_bounds_candidates() {
        let query = RefinedQuery::new(0, 0, "q", ops(&["a", "b", "c", "d", "e"]), None);
        let plans = SplitPartitioner.propose_partitions(&query, 4).unwrap();
        let splits: Vec<_> = plans.iter().map(|p| p.split).collect();
        assert_eq!(splits, vec![5, 4, 3, 2]);
    }

    #[test]
    fn test_partitioner_short_chain() {
        let query = RefinedQuery::new(0, 0, "q", ops(&["a"]), None);
        let plans = SplitPartitioner.propose_partitions(&query, 4).unwrap();
        assert_eq!(plans, vec![PartitionPlan::new(1), PartitionPlan::new(0)]);
    }

    #[test]
    fn test_compiler_splits_chain() {
        let mut query = RefinedQuery::new(0, 0, "q", ops(&["filter(x)", "map(y)", "reduce(sum)"]), Some(16));
        query.partition_plan_final = Some(PartitionPlan::new(2));

        let dp = ChainCompiler.compile_dp(&query, QueryId::new(4)).unwrap();
        let sp = ChainCompiler.compile_sp(&query, QueryId::new(4)).unwrap();

        assert_eq!(dp.qid, QueryId::new(4));
        assert_eq!(dp.expr, "refine(16).filter(x).map(y)");
        assert_eq!(sp.expr, "reduce(sum)");
    }

    #[test]
    fn test_compiler_empty_side_is_identity() {
        let mut query = RefinedQuery::new(0, 0, "q", ops(&["filter(x)"]), None);
        query.partition_plan_final = Some(PartitionPlan::new(1));
        let sp = ChainCompiler.compile_sp(&query, QueryId::FIRST).unwrap();
        assert_eq!(sp.expr, "identity");
    }

    #[test]
    fn test_compiler_requires_final_plan() {
        let query = RefinedQuery::new(0, 0, "q", ops(&["filter(x)"]), None);
        let err = ChainCompiler.compile_dp(&query, QueryId::FIRST).unwrap_err();
        assert!(err.to_string().contains("no partition plan"));
    }

    #[test]
    fn test_compiler_rejects_out_of_range_split() {
        let mut query = RefinedQuery::new(0, 0, "q", ops(&["filter(x)"]), None);
        query.partition_plan_final = Some(PartitionPlan::new(3));
        assert!(ChainCompiler.compile_sp(&query, QueryId::FIRST).is_err());
    }
}
