//! ACVP CLI: inspect module definitions and the registrations they imply.

mod commands;
mod config;

use std::path::{Path, PathBuf};
use std::process;

use acvp_definition::{Criterion, SearchCriteria};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::Sources;
use config::AcvpConfig;

#[derive(Parser)]
#[command(name = "acvp", version, about = "ACVP module definition tool")]
struct Cli {
    /// Configuration file (default: acvp.toml in this or a parent directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Base directory of the module definitions
    #[arg(long, global = true)]
    definitions: Option<PathBuf>,
    /// Use IDs of the production server
    #[arg(long, global = true)]
    production: bool,
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List loaded definitions
    List(Filters),
    /// List the algorithm map table
    Maps,
    /// Print the registration requests for matching definitions
    DumpRegister(Filters),
}

/// Definition filters. Values match exactly unless --fuzzy is given.
#[derive(Args, Default)]
struct Filters {
    /// Module name
    #[arg(long)]
    module: Option<String>,
    /// Module version
    #[arg(long)]
    module_version: Option<String>,
    /// Vendor name
    #[arg(long)]
    vendor: Option<String>,
    /// Execution environment
    #[arg(long)]
    execenv: Option<String>,
    /// Processor name
    #[arg(long)]
    processor: Option<String>,
    /// Case-insensitive substring matching
    #[arg(long)]
    fuzzy: bool,
}

impl Filters {
    fn criteria(&self) -> SearchCriteria {
        let crit = |value: &Option<String>| {
            value.as_deref().map(|v| {
                if self.fuzzy {
                    Criterion::fuzzy(v)
                } else {
                    Criterion::exact(v)
                }
            })
        };
        let mut criteria = SearchCriteria::any();
        if let Some(c) = crit(&self.module) {
            criteria = criteria.module_name(c);
        }
        if let Some(c) = crit(&self.module_version) {
            criteria = criteria.module_version(c);
        }
        if let Some(c) = crit(&self.vendor) {
            criteria = criteria.vendor_name(c);
        }
        if let Some(c) = crit(&self.execenv) {
            criteria = criteria.execenv(c);
        }
        if let Some(c) = crit(&self.processor) {
            criteria = criteria.processor(c);
        }
        criteria
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let config = load_config(&cwd, cli.config.as_deref())?;
    let sources = Sources::new(&config, &cwd, cli.definitions, cli.production);

    match cli.command {
        Commands::List(filters) => commands::list::run(&sources, &filters.criteria()),
        Commands::Maps => commands::maps::run(&sources),
        Commands::DumpRegister(filters) => {
            commands::dump_register::run(&sources, &filters.criteria())
        }
    }
}

/// The explicit configuration file, or the nearest `acvp.toml`, or defaults.
fn load_config(cwd: &Path, explicit: Option<&Path>) -> anyhow::Result<AcvpConfig> {
    if let Some(path) = explicit {
        return AcvpConfig::load(path);
    }
    Ok(AcvpConfig::find_and_load(cwd)?
        .map(|(config, _)| config)
        .unwrap_or_default())
}
