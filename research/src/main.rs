use anyhow::Result;
use clap::Parser;
use research::config::{Cli, Command};
use research::server::{self, ResearchResponse};
use research::{RunOptions, console};
use std::sync::Arc;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let orchestrator = cli.settings.orchestrator()?;

    match cli.command {
        Command::Serve { bind } => {
            server::serve(Arc::new(orchestrator), bind).await?;
        }
        Command::Console { output } => {
            let mut input = BufReader::new(tokio::io::stdin());
            let mut stdout = tokio::io::stdout();
            console::run(&orchestrator, output, &mut input, &mut stdout).await?;
        }
        Command::Run { query } => {
            let outcome = orchestrator.run(&query, RunOptions::default()).await;
            let response = ResearchResponse::from_outcome(outcome, &cli.settings.papers_dir);
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}
