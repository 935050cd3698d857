//! CLI command definitions
//!
//! Defines the clap commands for the scenario runner CLI.

use clap::{Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run scenarios (all built-ins when none are given)
    Run {
        /// Built-in scenario names, scenario files, or directories of YAML files
        scenarios: Vec<String>,

        /// Number of scenarios to run concurrently
        #[arg(long, short)]
        jobs: Option<usize>,

        /// Use the in-memory storefront instead of launching Chrome
        #[arg(long)]
        simulate: bool,

        /// Directory screenshots are written under
        #[arg(long, short = 'o')]
        output_dir: Option<PathBuf>,

        /// Write a JSON report of the run to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// List built-in scenarios
    #[command(alias = "ls")]
    List,

    /// Print a scenario's steps
    Show {
        /// Built-in scenario name or scenario file
        scenario: String,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: ShowFormat,
    },

    /// Check scenario files without running them
    Validate {
        /// Scenario files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Write a starter scenario file
    New {
        /// Scenario name, e.g. TC_AUTH_02_InvalidLogin
        name: String,

        /// Directory to write the file into
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ShowFormat {
    Text,
    Yaml,
    Json,
}
