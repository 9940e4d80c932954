mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "arbiter-cli")]
#[command(about = "Arbiter CLI - Normalize test cases, inspect harnesses, and judge solutions locally", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the normalized arguments for every test case in a problem file
    Normalize {
        /// Problem file (JSON with `problem` and `test_cases`)
        #[arg(short, long)]
        problem: PathBuf,

        /// Consult the mapping oracle configured through ORACLE_URL
        #[arg(long, default_value = "false")]
        oracle: bool,
    },

    /// Print the program that would be submitted to the judge
    Harness {
        /// Problem file
        #[arg(short, long)]
        problem: PathBuf,

        /// Solution source file
        #[arg(short, long)]
        source: PathBuf,

        /// Language name (e.g., python, javascript)
        #[arg(short, long, default_value = "python")]
        language: String,

        /// Test case id (defaults to the first case)
        #[arg(short, long)]
        case: Option<u32>,
    },

    /// Judge a solution against the remote judge
    Run {
        /// Problem file
        #[arg(short, long)]
        problem: PathBuf,

        /// Solution source file
        #[arg(short, long)]
        source: PathBuf,

        /// Language name (e.g., python, javascript)
        #[arg(short, long, default_value = "python")]
        language: String,

        /// Print the report as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Check whether two outputs are considered equivalent
    Compare {
        /// Program output as printed
        actual: String,

        /// Expected output literal
        expected: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Normalize { problem, oracle } => {
            commands::normalize(&problem, oracle).await?;
        }
        Commands::Harness {
            problem,
            source,
            language,
            case,
        } => {
            commands::harness(&problem, &source, &language, case).await?;
        }
        Commands::Run {
            problem,
            source,
            language,
            json,
        } => {
            commands::run(&problem, &source, &language, json).await?;
        }
        Commands::Compare { actual, expected } => {
            commands::compare(&actual, &expected)?;
        }
    }

    Ok(())
}
