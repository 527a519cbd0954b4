//! Run command - bootstrap the workers and push the compiled queries.

use std::path::PathBuf;

use sonata::config::ConfigFile;
use sonata::logging::init_logging;
use sonata::pipeline::Collaborators;
use sonata::query::{load_queries, LogicalQuery};
use sonata::runtime::{process_workers, RuntimeConfig, RuntimeError, SonataRuntime};
use sonata::supervisor::WorkerSet;
use sonata::workers::LoopbackEndpoint;
use tracing::{info, warn};

use crate::error::CliError;

/// Arguments for the run command.
pub struct RunArgs {
    pub config: Option<PathBuf>,
    pub queries: PathBuf,
    pub loopback: bool,
}

/// Run the run command.
pub fn run(args: RunArgs) -> Result<(), CliError> {
    let config = match &args.config {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };

    let _logging_guard = init_logging(&config.logging.directory, &config.logging.file)
        .map_err(|e| CliError::LoggingInit(e.to_string()))?;

    info!("Sonata v{}", sonata::VERSION);

    let queries = load_queries(&args.queries)?;
    info!(count = queries.len(), path = %args.queries.display(), "Loaded queries");

    let runtime = tokio::runtime::Runtime::new().map_err(CliError::AsyncRuntime)?;
    runtime.block_on(orchestrate(&config, &queries, args.loopback))
}

async fn orchestrate(
    config: &ConfigFile,
    queries: &[LogicalQuery],
    loopback: bool,
) -> Result<(), CliError> {
    let runtime_config = RuntimeConfig::from(config);

    let workers = if loopback {
        loopback_workers(&runtime_config).await?
    } else {
        process_workers(config)
    };

    let runtime = SonataRuntime::new(runtime_config, Collaborators::reference());

    let handle = runtime.handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received");
                handle.shutdown();
            }
            Err(e) => warn!(error = %e, "Could not listen for interrupt"),
        }
    });

    runtime.run(workers, queries).await?;
    info!("Sonata stopped");

    Ok(())
}

/// In-process managers listening on the configured endpoints.
async fn loopback_workers(config: &RuntimeConfig) -> Result<WorkerSet, CliError> {
    let fabric = LoopbackEndpoint::fabric_manager(&config.fm_endpoint)
        .await
        .map_err(RuntimeError::from)?;
    let streaming = LoopbackEndpoint::streaming_manager(&config.sm_endpoint)
        .await
        .map_err(RuntimeError::from)?;

    Ok(WorkerSet::new().with(fabric).with(streaming))
}
