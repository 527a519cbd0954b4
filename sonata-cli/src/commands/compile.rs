//! Compile command - run one pipeline pass over a query file offline.

use std::path::PathBuf;

use serde_json::json;
use sonata::logging::init_console_logging;
use sonata::pipeline::{Collaborators, PipelineConfig, QueryPipeline};
use sonata::query::load_queries;
use tracing::info;

use crate::error::CliError;

/// Arguments for the compile command.
pub struct CompileArgs {
    pub queries: PathBuf,
    pub candidates: Option<usize>,
    pub json: bool,
}

/// Run the compile command.
pub fn run(args: CompileArgs) -> Result<(), CliError> {
    init_console_logging();

    let queries = load_queries(&args.queries)?;
    info!(count = queries.len(), path = %args.queries.display(), "Loaded queries");

    let mut config = PipelineConfig::default();
    if let Some(candidates) = args.candidates {
        config.partition_candidates = candidates;
    }

    let mut pipeline = QueryPipeline::new(Collaborators::reference(), config);
    let pass = pipeline.run(&queries)?;

    if args.json {
        let output = json!({
            "dp_queries": pass.dp_queries,
            "sp_queries": pass.sp_queries,
        });
        let text =
            serde_json::to_string_pretty(&output).map_err(|e| CliError::Output(e.to_string()))?;
        println!("{}", text);
        return Ok(());
    }

    println!("Data plane ({} queries)", pass.dp_queries.len());
    for query in &pass.dp_queries {
        println!("  {:>4}  {}", query.qid.value(), query.expr);
    }
    println!();
    println!("Stream plane ({} queries)", pass.sp_queries.len());
    for query in &pass.sp_queries {
        println!("  {:>4}  {}", query.qid.value(), query.expr);
    }

    Ok(())
}
