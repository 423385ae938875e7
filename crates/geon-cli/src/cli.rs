use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "geon",
    about = "Geon reward ledger: run scenarios against a local deployment",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log every mutation and commit at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Deploy a fresh ledger and run a scenario file against it
    Run(RunArgs),
    /// List registry call signatures and their selectors
    Selectors,
    /// Derive the address for a label
    Address(AddressArgs),
    /// Print the default deployment config
    Config,
}

#[derive(Args)]
pub struct RunArgs {
    /// Scenario TOML file
    pub scenario: PathBuf,
    /// Deployment config TOML; defaults are used when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct AddressArgs {
    pub label: String,
}
