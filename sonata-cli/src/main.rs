//! Sonata CLI - Command-line interface
//!
//! Runs the control-plane orchestrator, compiles query files offline and
//! manages the configuration file.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;

#[derive(Parser)]
#[command(name = "sonata")]
#[command(version = sonata::VERSION)]
#[command(about = "Compile monitoring queries and drive the data-plane control plane", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the workers and push the compiled queries to them
    Run {
        /// Configuration file (defaults to ~/.sonata/config.ini)
        #[arg(long)]
        config: Option<PathBuf>,

        /// JSON file holding the logical queries
        #[arg(long)]
        queries: PathBuf,

        /// Use in-process loopback managers instead of spawning processes
        #[arg(long)]
        loopback: bool,
    },

    /// Compile a query file and print the data-plane and stream-plane queries
    Compile {
        /// JSON file holding the logical queries
        #[arg(long)]
        queries: PathBuf,

        /// Partition plan candidates per refined query
        #[arg(long)]
        candidates: Option<usize>,

        /// Print the compiled queries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            config,
            queries,
            loopback,
        } => commands::run::run(commands::run::RunArgs {
            config,
            queries,
            loopback,
        }),
        Commands::Compile {
            queries,
            candidates,
            json,
        } => commands::compile::run(commands::compile::CompileArgs {
            queries,
            candidates,
            json,
        }),
        Commands::Config { command } => commands::config::run(command),
    };

    if let Err(e) = result {
        e.exit();
    }
}
