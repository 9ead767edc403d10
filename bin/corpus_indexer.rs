use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use corpus_indexer::config::keys;
use corpus_indexer::{Indexer, OpenMode, PluginRegistry, Settings};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "corpus-indexer")]
#[command(about = "Build a full-text index from a corpus with concurrent consumers", long_about = None)]
struct Args {
    /// Settings file (TOML) describing the run
    #[arg(short = 'p', long = "properties", env = "CORPUS_INDEXER_PROPERTIES")]
    properties: Option<PathBuf>,

    /// Discard any existing index in the target directory
    #[arg(long)]
    force_overwrite: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let Some(properties) = args.properties else {
        eprintln!("error: a settings file is required (-p <PATH>)\n");
        Args::command().print_help()?;
        return Ok(());
    };

    let settings = Settings::load(&properties)
        .with_context(|| format!("failed to read settings from {}", properties.display()))?;

    // Initialize tracing
    let level = if settings.get_bool(keys::VERBOSE) {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Starting corpus-indexer v{}", corpus_indexer::VERSION);
    info!("  Settings: {}", properties.display());
    info!("  Force overwrite: {}", args.force_overwrite);

    let mode = if args.force_overwrite {
        OpenMode::Overwrite
    } else {
        OpenMode::Append
    };
    let plugins = PluginRegistry::with_builtins();
    let mut indexer = Indexer::new(settings, &plugins, mode)?;
    let summary = indexer.create_index()?;

    let copied = indexer.copy_settings_to_index_dir(&properties)?;
    info!("Settings copied to {}", copied.display());
    info!("Summary: {}", serde_json::to_string(&summary)?);

    Ok(())
}
