//! txflow CLI
//!
//! Command-line tools for previewing statement rewrites and simulating
//! transaction propagation.
//!
//! # Commands
//!
//! - `rewrite` - Turn `:name` parameters into positional placeholders
//! - `template` - Fill `{name}` fields
//! - `simulate` - Run a propagation script against the recording database

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// txflow command-line tools.
#[derive(Parser)]
#[command(name = "txflow")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite named parameters into positional placeholders
    Rewrite {
        /// Statement with `:name` parameters
        statement: String,

        /// Parameter binding (name=value), repeatable
        #[arg(short, long = "param")]
        params: Vec<String>,

        /// Placeholder dialect (dollar, question, colon, atp)
        #[arg(long, default_value = "dollar")]
        placeholder: String,

        /// Fail on unbound parameters
        #[arg(long)]
        strict: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Fill `{name}` fields of a template
    Template {
        /// Template text
        template: String,

        /// Field value (name=value), repeatable
        #[arg(short, long = "param")]
        params: Vec<String>,
    },

    /// Simulate a propagation script
    Simulate {
        /// Comma-separated steps: mode[@isolation][:fail|:panic]
        script: String,

        /// Isolation level of the outermost step, unless the script sets one
        #[arg(short, long)]
        isolation: Option<String>,

        /// Savepoint name prefix
        #[arg(long, default_value = "sp_")]
        savepoint_prefix: String,

        /// Inject a failure (begin, commit, rollback, savepoint), repeatable
        #[arg(long = "fail")]
        faults: Vec<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Rewrite {
            statement,
            params,
            placeholder,
            strict,
            format,
        } => {
            commands::rewrite::run(&statement, &params, &placeholder, strict, &format)?;
        }
        Commands::Template { template, params } => {
            commands::template::run(&template, &params)?;
        }
        Commands::Simulate {
            script,
            isolation,
            savepoint_prefix,
            faults,
            format,
        } => {
            let options = commands::simulate::Options {
                isolation,
                savepoint_prefix,
                faults,
            };
            commands::simulate::run(&script, &options, &format)?;
        }
        Commands::Version => {
            println!("txflow CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
