use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "gatehouse")]
#[command(version, about = "Gatehouse policy CLI", long_about = None)]
struct Cli {
    /// Engine limits (TOML with max_depth, max_rules, max_goals_per_rule)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Policy validation and inspection
    Policy {
        #[command(subcommand)]
        command: PolicyCommands,
    },
}

#[derive(Subcommand)]
enum PolicyCommands {
    /// Validate a policy file (YAML, TOML or JSON)
    Check {
        /// Path to the policy file
        file: PathBuf,
    },
    /// List rules grouped by predicate and arity
    Rules {
        /// Path to the policy file
        file: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = commands::policy::engine_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Policy { command } => match command {
            PolicyCommands::Check { file } => {
                commands::policy::check(&file, config)?;
            }
            PolicyCommands::Rules { file } => {
                commands::policy::rules(&file)?;
            }
        },
    }

    Ok(())
}
