//! Tally CLI - back up and sync budget data from the terminal.

mod cli;
mod commands;
mod error;

use clap::Parser;

use crate::cli::{BucketCommands, Cli, Commands};
use crate::commands::bucket::{run_bucket_get, run_bucket_list, run_bucket_remove, run_bucket_set};
use crate::commands::common::CliContext;
use crate::commands::completions::run_completions;
use crate::commands::status::run_status;
use crate::commands::sync::run_sync;
use crate::commands::watch::run_watch;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "tally=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let context = CliContext::new(cli.store, cli.remote_dir, cli.token);

    match cli.command {
        Commands::Sync { on_conflict } => run_sync(&context, on_conflict).await?,
        Commands::Status { json } => run_status(&context, json).await?,
        Commands::Bucket { command } => match command {
            BucketCommands::List { json } => run_bucket_list(&context, json)?,
            BucketCommands::Get { name } => run_bucket_get(&context, &name)?,
            BucketCommands::Set { name, value } => {
                run_bucket_set(&context, &name, value.as_deref())?;
            }
            BucketCommands::Remove { name } => run_bucket_remove(&context, &name)?,
        },
        Commands::Watch => run_watch(&context).await?,
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref())?,
    }

    Ok(())
}
