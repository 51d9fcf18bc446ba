use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use speakdrill::audio::{CaptureDevice, MicrophoneBackend};
use speakdrill::catalogue::{merge_catalogue, CatalogueLoader};
use speakdrill::http::{create_router, AppState};
use speakdrill::session::ControllerConfig;
use speakdrill::Config;
use tracing::info;

#[derive(Parser)]
#[command(name = "speakdrill", about = "Prompted speaking practice sessions")]
struct Cli {
    /// Config file (without extension)
    #[arg(long, default_value = "config/speakdrill")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP control surface
    Serve,
    /// Merge new TSV rows into a catalogue JSON (offline utility)
    Merge {
        /// Base catalogue JSON (never modified)
        base: PathBuf,
        /// TSV export with new rows
        tsv: PathBuf,
        /// Output path for the merged catalogue
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve => serve(&cli.config).await,
        Command::Merge { base, tsv, out } => {
            let report = merge_catalogue(&base, &tsv, &out)?;
            info!(
                "Merged {} base + {} new rows into {} items",
                report.base_items, report.new_items, report.merged_items
            );
            Ok(())
        }
    }
}

async fn serve(config_path: &str) -> Result<()> {
    let cfg = Config::load(config_path)?;

    info!("speakdrill v0.1.0");
    info!("Loaded config: {}", cfg.service.name);

    let loader = CatalogueLoader::new(&cfg.catalogue.primary_path, &cfg.catalogue.cache_path);
    let loaded = loader
        .load()?
        .context("No catalogue available; run with an importable catalogue file")?;
    info!(
        "Catalogue ready: {} items (source: {:?})",
        loaded.items.len(),
        loaded.source
    );

    let device = CaptureDevice::new(Box::new(MicrophoneBackend::new()));

    let controller_config = ControllerConfig {
        media_root: cfg.practice.media_root.clone(),
        post_prompt_delay: cfg.practice.post_prompt_delay(),
    };

    let state = AppState::new(loaded.items, device, controller_config);
    let router = create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    info!("HTTP server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, router).await?;

    Ok(())
}
