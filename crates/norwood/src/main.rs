//! Norwood CLI - Scalp image stage analysis via retrieval-scored ensembles.
//!
//! Norwood embeds scalp images with pretrained backbones, retrieves
//! nearest neighbors from reference vector indexes, and fuses the
//! per-model distributions into a staged prediction with an optional
//! LLM-generated narrative.
//!
//! # Usage
//!
//! ```bash
//! # Analyze a single crown image
//! norwood analyze crown.jpg
//!
//! # Dual-view analysis with a narrative
//! norwood analyze top.jpg --side hairline.jpg --llm openai
//!
//! # Analyze a directory
//! norwood analyze ./scans/ --output results.jsonl --format jsonl
//!
//! # View configuration
//! norwood config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Norwood - Scalp image stage analysis via retrieval-scored ensembles.
#[derive(Parser, Debug)]
#[command(name = "norwood")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze scalp images and report staged predictions
    Analyze(cli::analyze::AnalyzeArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging from config, with CLI verbose override.
    // Note: logging isn't initialized yet, so use eprintln for config warnings.
    let config = match norwood_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `norwood config path`."
            );
            norwood_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Norwood v{}", norwood_core::VERSION);

    // Dispatch to the appropriate command handler
    match cli.command {
        Commands::Analyze(args) => cli::analyze::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }
}
