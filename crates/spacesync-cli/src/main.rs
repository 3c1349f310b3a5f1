//! SpaceSync CLI
//!
//! Command-line front end for mirroring one space's structure onto another.
//! Spaces are read from and written back to a local JSON dump.

use clap::{Parser, Subcommand};
use spacesync_core::logging_facility::{init, Profile};

mod commands;
mod console;
mod workspace;

#[derive(Debug, Parser)]
#[command(name = "spacesync")]
#[command(about = "SpaceSync - Mirror roles, categories and channels between spaces", long_about = None)]
struct Cli {
    #[command(flatten)]
    workspace: workspace::WorkspaceArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Set the source/target pair and the run modes
    Configure(commands::configure::ConfigureArgs),
    /// Show the settings and the spaces in the dump
    Show(commands::show::ShowArgs),
    /// Compute and print the plan without changing anything
    Preview(commands::preview::PreviewArgs),
    /// Preview, confirm, then apply
    Run(commands::run::RunArgs),
}

#[tokio::main]
async fn main() {
    init(Profile::Development);
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Configure(args) => commands::configure::execute(&cli.workspace, args).await,
        Commands::Show(args) => commands::show::execute(&cli.workspace, args).await,
        Commands::Preview(args) => commands::preview::execute(&cli.workspace, args).await,
        Commands::Run(args) => commands::run::execute(&cli.workspace, args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
