use anyhow::Context;
use clap::{Parser, Subcommand};
use hybridx_store::{Mapping, Selector, Store, StoreConfig, Value};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hybridx", about = "Inspect and build hybridx container files")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Suppress per-key progress
    #[arg(short, long)]
    quiet: bool,

    /// JSON store configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// zstd compression level, overrides the config file
    #[arg(long)]
    level: Option<i32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and container format info
    Info,
    /// List the names stored in a container and their group
    Keys {
        file: PathBuf,
    },
    /// Load a container and print a summary of each value
    Show {
        file: PathBuf,
        /// Only load these names (repeatable)
        #[arg(short, long = "select")]
        select: Vec<String>,
    },
    /// Save the top-level fields of a JSON object into a container
    Import {
        input: PathBuf,
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let mut config = match &cli.config {
        Some(path) => StoreConfig::from_json_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => StoreConfig::default(),
    };
    if cli.quiet {
        config.verbose = false;
    }
    if let Some(level) = cli.level {
        config.compression_level = level;
    }
    config.validate()?;
    debug!(?config, "store configuration");
    let store = Store::from_config(config);

    match cli.command {
        Commands::Info => {
            println!("hybridx v{}", env!("CARGO_PKG_VERSION"));
            println!("container format: v{}", hybridx_container::FORMAT_VERSION);
        }
        Commands::Keys { file } => {
            let signed = store.is_signed(&file)?;
            for (name, class) in store.list_entries(&file)? {
                println!("{class:<6} {name}");
            }
            if !signed {
                println!("(no hybridx signature)");
            }
        }
        Commands::Show { file, select } => {
            let selector = Selector::new(select);
            let mapping = store.load(&file, Some(&selector))?;
            for (name, value) in &mapping {
                println!("{name}: {}", describe(value));
            }
        }
        Commands::Import { input, output } => {
            let text = std::fs::read_to_string(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let mapping = json_to_mapping(serde_json::from_str(&text)?)?;
            let report = store.save(&mapping, &output)?;
            println!(
                "Saved {} values to {} (raw={}, binary={})",
                report.len(),
                output.display(),
                report.raw.len(),
                report.binary.len()
            );
        }
    }

    Ok(())
}

fn describe(value: &Value) -> String {
    match value.as_text() {
        Some(text) if text.len() <= 60 => format!("{text:?}"),
        _ => value.summary(),
    }
}

fn json_to_mapping(json: serde_json::Value) -> anyhow::Result<Mapping> {
    let serde_json::Value::Object(fields) = json else {
        anyhow::bail!("expected a JSON object at the top level");
    };
    fields
        .into_iter()
        .map(|(name, field)| -> anyhow::Result<(String, Value)> {
            Ok((name, json_to_value(field)?))
        })
        .collect()
}

/// Numbers, strings and flat homogeneous arrays map to native values;
/// everything else becomes an object.
fn json_to_value(json: serde_json::Value) -> anyhow::Result<Value> {
    use serde_json::Value as Json;

    let value = match json {
        Json::Bool(b) => Value::from(b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else if let Some(f) = n.as_f64() {
                Value::from(f)
            } else {
                Value::object(&n)?
            }
        }
        Json::String(s) => Value::from(s),
        Json::Array(items) if !items.is_empty() && items.iter().all(Json::is_i64) => {
            Value::from(items.iter().filter_map(Json::as_i64).collect::<Vec<_>>())
        }
        Json::Array(items) if !items.is_empty() && items.iter().all(Json::is_u64) => {
            Value::from(items.iter().filter_map(Json::as_u64).collect::<Vec<_>>())
        }
        // Integer-only arrays that fit neither i64 nor u64 stay exact as objects.
        Json::Array(items)
            if !items.is_empty() && items.iter().all(Json::is_number) && items.iter().any(Json::is_f64) =>
        {
            Value::from(items.iter().filter_map(Json::as_f64).collect::<Vec<_>>())
        }
        Json::Array(items) if !items.is_empty() && items.iter().all(Json::is_boolean) => {
            Value::from(items.iter().filter_map(Json::as_bool).collect::<Vec<_>>())
        }
        other => Value::object(&other)?,
    };
    Ok(value)
}
