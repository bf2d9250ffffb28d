//! CLI for inspecting registry snapshots with the module resolver.
//!
//! Usage:
//!   bdshim ids <snapshot.json>                        # List module ids
//!   bdshim find <snapshot.json> --keys a,b [--all]    # Find modules by keys
//!   bdshim find <snapshot.json> --strings "x,y"       # Find functions by source
//!   bdshim --config shim.toml find ...                # Resolver defaults from a file

use std::path::{Path, PathBuf};
use std::process;
use std::rc::Rc;

use clap::{Args, Parser, Subcommand};
use regex::Regex;

use bdshim::runner::ds::error::ShimError;
use bdshim::runner::ds::operations::type_conversion::to_display_string;
use bdshim::runner::logger::TracingLogger;
use bdshim::runner::plugin::config::ShimConfig;
use bdshim::runner::webpack::filters::{self, Filter, SourceMatcher};
use bdshim::runner::webpack::registry::ModuleRegistry;
use bdshim::runner::webpack::resolver::{ModuleMatch, ModuleResolver, SearchOptions};

#[derive(Parser, Debug)]
#[command(name = "bdshim")]
#[command(about = "Inspect module registry snapshots")]
#[command(version)]
struct Cli {
    /// Shim configuration file (TOML)
    #[arg(long, short = 'c', value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the ids of every module in a snapshot
    Ids {
        snapshot: PathBuf,
    },
    /// Find modules matching every given criterion
    Find(FindArgs),
}

#[derive(Args, Debug)]
struct FindArgs {
    snapshot: PathBuf,

    /// Properties the module must have
    #[arg(long, value_delimiter = ',')]
    keys: Vec<String>,

    /// Strings the function source must contain
    #[arg(long, value_delimiter = ',')]
    strings: Vec<String>,

    /// Exact `displayName`
    #[arg(long)]
    display_name: Option<String>,

    /// Store name reported by `getName()`
    #[arg(long)]
    store: Option<String>,

    /// Regex the module factory source must match
    #[arg(long)]
    source: Option<String>,

    /// Report every match instead of the first
    #[arg(long)]
    all: bool,

    /// Also test each named export
    #[arg(long)]
    search_exports: bool,

    /// Print module ids instead of values
    #[arg(long)]
    raw: bool,
}

fn main() {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => match ShimConfig::load(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                process::exit(1);
            }
        },
        None => ShimConfig::default(),
    };
    setup_tracing(&config, cli.verbose);

    let result = match cli.command {
        Command::Ids { snapshot } => list_ids(&snapshot),
        Command::Find(args) => find(&config, args),
    };
    if let Err(e) = result {
        eprintln!("bdshim: {}", e);
        process::exit(1);
    }
}

fn setup_tracing(config: &ShimConfig, verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("bdshim=debug,info")
        } else {
            EnvFilter::new(&config.logging.filter)
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_registry(snapshot: &Path) -> Result<Rc<ModuleRegistry>, ShimError> {
    let registry = ModuleRegistry::shared();
    let count = registry.load_snapshot_file(snapshot)?;
    tracing::debug!(count, path = %snapshot.display(), "snapshot loaded");
    Ok(registry)
}

fn list_ids(snapshot: &Path) -> Result<(), ShimError> {
    let registry = load_registry(snapshot)?;
    for id in registry.ids() {
        println!("{}", id);
    }
    Ok(())
}

fn build_filter(args: &FindArgs) -> Result<Filter, ShimError> {
    let mut parts = Vec::new();
    if !args.keys.is_empty() {
        let keys: Vec<&str> = args.keys.iter().map(String::as_str).collect();
        parts.push(filters::by_keys(&keys));
    }
    if !args.strings.is_empty() {
        let strings: Vec<&str> = args.strings.iter().map(String::as_str).collect();
        parts.push(filters::by_strings(&strings));
    }
    if let Some(name) = &args.display_name {
        parts.push(filters::by_display_name(name));
    }
    if let Some(name) = &args.store {
        parts.push(filters::by_store_name(name));
    }
    if let Some(pattern) = &args.source {
        let regex = Regex::new(pattern)
            .map_err(|e| ShimError::InvalidArgument(format!("bad --source regex: {}", e)))?;
        parts.push(filters::by_source(vec![SourceMatcher::Pattern(regex)]));
    }
    if parts.is_empty() {
        return Err(ShimError::InvalidArgument(
            "give at least one of --keys, --strings, --display-name, --store, --source".to_string(),
        ));
    }
    Ok(filters::combine(parts))
}

fn find(config: &ShimConfig, args: FindArgs) -> Result<(), ShimError> {
    let registry = load_registry(&args.snapshot)?;
    let resolver = ModuleResolver::with_defaults(registry, Rc::new(TracingLogger), config.resolver);
    let filter = build_filter(&args)?;
    let options = SearchOptions {
        first: !args.all && config.resolver.first,
        search_exports: args.search_exports || config.resolver.search_exports,
        raw: args.raw || config.resolver.raw,
        ..config.resolver
    };
    let matches = match resolver.get_module(&filter, &options) {
        Some(result) => result.into_matches(),
        None => {
            eprintln!("No module matched.");
            process::exit(2);
        }
    };
    for m in matches {
        match m {
            ModuleMatch::Raw(record) => println!("{}", record.id),
            ModuleMatch::Exports(value) => println!("{}", to_display_string(&value)),
        }
    }
    Ok(())
}
