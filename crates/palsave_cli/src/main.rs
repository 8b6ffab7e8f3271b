use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use palsave_core::core_api::{Catalog, Engine, ParseOutcome};
use palsave_render::{
    RenderOptions, render_header, render_json_with_options, render_text_with_options, render_tree,
};
use serde_json::{Map as JsonMap, Value as JsonValue};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const EXIT_FAILURE: i32 = 1;
const EXIT_DEGRADED: i32 = 3;
const DEFAULT_TREE_DEPTH: &str = "3";

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(value_name = "Level.sav")]
    path: PathBuf,
    /// JSON file with extra species and passive names.
    #[arg(long, value_name = "PATH")]
    catalog: Option<PathBuf>,
    #[arg(long)]
    json: bool,
    /// Only show the guild with this name.
    #[arg(long, value_name = "NAME")]
    guild: Option<String>,
    /// Fail instead of printing unverified data when the save cannot be parsed.
    #[arg(long)]
    strict: bool,
    #[arg(short, long)]
    verbose: bool,
    #[arg(long = "debug-header", conflicts_with = "debug_tree")]
    debug_header: bool,
    #[arg(
        long = "debug-tree",
        value_name = "DEPTH",
        num_args = 0..=1,
        default_missing_value = DEFAULT_TREE_DEPTH
    )]
    debug_tree: Option<usize>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let catalog = match &cli.catalog {
        Some(path) => Arc::new(Catalog::load_from_path(path).unwrap_or_else(|e| {
            eprintln!("Error loading catalog {}: {e}", path.display());
            process::exit(EXIT_FAILURE);
        })),
        None => Catalog::builtin(),
    };
    let engine = Engine::with_catalog(catalog);

    let bytes = fs::read(&cli.path).unwrap_or_else(|e| {
        eprintln!("Error reading {}: {e}", cli.path.display());
        process::exit(EXIT_FAILURE);
    });
    debug!(path = %cli.path.display(), len = bytes.len(), "read save");

    if cli.debug_header || cli.debug_tree.is_some() {
        run_debug(&cli, &engine, &bytes);
        return;
    }

    let outcome = engine.parse(&bytes).unwrap_or_else(|e| {
        eprintln!("Error parsing save file: {}", cli.path.display());
        eprintln!("  {e}");
        process::exit(EXIT_FAILURE);
    });

    if cli.strict
        && let ParseOutcome::Degraded(degraded) = &outcome
    {
        eprintln!("Save file could not be parsed: {}", cli.path.display());
        eprintln!("  {}", degraded.cause);
        eprintln!("  (--strict: refusing to print unverified data)");
        process::exit(EXIT_DEGRADED);
    }

    let options = RenderOptions {
        guild: cli.guild.as_deref(),
        verbose: cli.verbose,
    };
    if cli.json {
        let value = render_json_with_options(&outcome, options);
        print_json(&value);
    } else {
        print!("{}", render_text_with_options(&outcome, options));
    }
}

fn run_debug(cli: &Cli, engine: &Engine, bytes: &[u8]) {
    let document = engine.read_document(bytes).unwrap_or_else(|e| {
        eprintln!("Error decoding save file: {}", cli.path.display());
        eprintln!("  {e}");
        process::exit(EXIT_FAILURE);
    });

    if cli.debug_header {
        if cli.json {
            let mut out = JsonMap::new();
            out.insert(
                "compression_layers".to_string(),
                JsonValue::from(document.compression_layers),
            );
            out.insert(
                "header".to_string(),
                serde_json::to_value(&document.header).unwrap_or(JsonValue::Null),
            );
            print_json(&JsonValue::Object(out));
        } else {
            print!(
                "{}",
                render_header(&document.header, document.compression_layers)
            );
        }
        return;
    }

    let depth = cli.debug_tree.unwrap_or(usize::MAX);
    print!("{}", render_tree(&document.properties, depth));
}

fn print_json(value: &JsonValue) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => {
            eprintln!("Error serializing JSON output: {e}");
            process::exit(EXIT_FAILURE);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}
