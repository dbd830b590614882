use clap::{Parser, Subcommand};
use colored::Colorize;

mod commands;
mod utils;

use commands::{PageArgs, WalkArgs};

/// seekpage - paginate a JSON dataset with offset or keyset pagination
#[derive(Parser)]
#[command(name = "seekpage")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a single page and print it as JSON
    Page(PageArgs),
    /// Follow pages from the first to the last, printing each one
    Walk(WalkArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Page(args) => commands::page::execute(args).await,
        Commands::Walk(args) => commands::walk::execute(args).await,
    };

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);

            if let Some(source) = e.source() {
                eprintln!("\n{} {}", "Caused by:".yellow(), source);
            }

            std::process::exit(1);
        }
    }
}
