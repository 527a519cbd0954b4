//! Configuration management CLI commands.
//!
//! Provides `config show`, `config init` and `config path`.

use std::path::PathBuf;

use clap::Subcommand;
use sonata::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show {
        /// Configuration file (defaults to ~/.sonata/config.ini)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Write a configuration file with default settings
    Init {
        /// Where to write it (defaults to ~/.sonata/config.ini)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Show { config } => run_show(config),
        ConfigCommands::Init { config, force } => run_init(config, force),
        ConfigCommands::Path => run_path(),
    }
}

/// Print the configuration as it would be saved.
fn run_show(path: Option<PathBuf>) -> Result<(), CliError> {
    let path = path.unwrap_or_else(config_file_path);
    let config = ConfigFile::load_from(&path)?;

    if !path.exists() {
        println!("# {} not found, showing defaults", path.display());
    }
    print!("{}", config.to_ini_string());

    Ok(())
}

/// Write the default configuration.
fn run_init(path: Option<PathBuf>, force: bool) -> Result<(), CliError> {
    let path = path.unwrap_or_else(config_file_path);

    if path.exists() && !force {
        return Err(CliError::ConfigExists(path));
    }

    ConfigFile::default().save_to(&path)?;
    println!("Wrote default configuration to {}", path.display());

    Ok(())
}

/// Show the configuration file path.
fn run_path() -> Result<(), CliError> {
    let path = config_file_path();
    println!("{}", path.display());

    if !path.exists() {
        println!("(file does not exist, defaults are in use)");
    }

    Ok(())
}
