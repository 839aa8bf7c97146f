mod commands;
mod watch;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use derefspec::config::Config;
use derefspec::diagnostics;
use tracing_subscriber::EnvFilter;

use crate::commands::Options;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "DEREFSPEC_LOG";

#[derive(Parser)]
#[command(name = "derefspec", version, about = "Resolve local $ref pointers in OpenAPI and JSON Schema documents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Accept documents that do not declare OpenAPI 3.0.x or 3.1.x
    #[arg(long, global = true)]
    lenient: bool,
    /// Maximum nested reference depth (default from .derefspec.toml, else 50)
    #[arg(long, global = true)]
    max_depth: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that every reference in a document or directory resolves
    Check {
        /// Document file or directory to scan
        #[arg(default_value = ".")]
        path: PathBuf,
    },
    /// Print the fully dereferenced document
    Deref {
        /// Document file
        file: PathBuf,
        /// Print YAML instead of JSON
        #[arg(long)]
        yaml: bool,
    },
    /// List operations as METHOD path
    Endpoints {
        /// Document file
        file: PathBuf,
    },
    /// Print one operation with parameters merged and references expanded
    Operation {
        /// Document file
        file: PathBuf,
        /// Path template, e.g. /pets/{petId}
        path: String,
        /// HTTP method, case-insensitive
        method: String,
    },
    /// List every $ref with its location
    Refs {
        /// Document file
        file: PathBuf,
        /// Print a JSON array instead of lines
        #[arg(long)]
        json: bool,
    },
    /// Resolve one pointer and print the expanded value
    Resolve {
        /// Document file
        file: PathBuf,
        /// Local pointer, e.g. '#/components/schemas/Pet'
        pointer: String,
        /// Print YAML instead of JSON
        #[arg(long)]
        yaml: bool,
    },
    /// Run check, then re-run it whenever documents change
    Watch {
        /// Document file or directory to watch
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let config = match Config::load(Path::new(".")) {
        Ok(c) => c,
        Err(e) => {
            diagnostics::print_error(&e);
            return ExitCode::from(3);
        },
    };

    let options = Options {
        lenient: cli.lenient || config.lenient,
        max_depth: cli.max_depth.unwrap_or(config.max_depth),
    };

    let result = match cli.command {
        Commands::Check { path } => commands::check(&path, &config, options),
        Commands::Deref { file, yaml } => commands::deref(&file, yaml, options).map(|()| ExitCode::SUCCESS),
        Commands::Endpoints { file } => commands::endpoints(&file, options).map(|()| ExitCode::SUCCESS),
        Commands::Operation { file, path, method } => {
            commands::operation(&file, &path, &method, options).map(|()| ExitCode::SUCCESS)
        },
        Commands::Refs { file, json } => commands::refs(&file, json, options).map(|()| ExitCode::SUCCESS),
        Commands::Resolve { file, pointer, yaml } => {
            commands::resolve(&file, &pointer, yaml, options).map(|()| ExitCode::SUCCESS)
        },
        Commands::Watch { path } => watch::run(&path, &config, options),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::from(3)
        },
    }
}

/// Install a stderr subscriber filtered by `DEREFSPEC_LOG`, defaulting to warnings.
fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
