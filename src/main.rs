//! Secure File Vault - CLI
//!
//! Development surface for exercising the core pipelines against the
//! local filesystem. The registry is process-lifetime, so each run
//! ingests the given paths fresh before listing or previewing.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

use vault_files_core::host::{FsByteSource, PathPicker, StaticPermissions};
use vault_files_core::{
    style_for, Category, ContentRegistry, IngestOutcome, IngestPipeline, PreviewState, Previewer,
};

#[derive(Parser)]
#[command(name = "vault-files")]
#[command(author = "Karen Tonoyan")]
#[command(version = vault_files_core::VERSION)]
#[command(about = "Secure file vault - ingest, classify and preview local files")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest files and list the registry
    Ingest {
        /// Files to import
        paths: Vec<PathBuf>,
    },

    /// Ingest files and show per-category counts
    Stats {
        /// Files to import
        paths: Vec<PathBuf>,
    },

    /// Ingest one file and render its preview
    Preview {
        /// File to preview
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest { paths } => {
            let registry = ingest_paths(paths).await?;
            for item in registry.list() {
                let style = style_for(item.category);
                println!(
                    "{:<14} {:>10}  {}",
                    format!("[{}]", item.category.title()),
                    item.size_bytes
                        .map(|s| format!("{s} B"))
                        .unwrap_or_else(|| "?".into()),
                    item.name,
                );
                log::debug!("item {} styled as {}/{}", item.id, style.icon, style.color);
            }
        }

        Commands::Stats { paths } => {
            let registry = ingest_paths(paths).await?;
            let counts = registry.category_counts();
            for category in Category::ALL {
                println!("{:<16} {} items", category.title(), counts[&category]);
            }
        }

        Commands::Preview { path } => {
            let registry = ingest_paths(vec![path]).await?;
            let Some(item) = registry.list().into_iter().next() else {
                bail!("nothing was ingested");
            };

            let previewer = Previewer::new(Arc::new(FsByteSource));
            let ticket = previewer.preview(&item);
            match ticket.resolved().await {
                Some(PreviewState::Text(text)) => println!("{text}"),
                Some(PreviewState::Table(rows)) => {
                    for row in rows {
                        println!("{}", row.join(" | "));
                    }
                }
                Some(PreviewState::Image(handle)) => {
                    println!("Image preview delegated to renderer: {}", handle.as_str());
                }
                Some(PreviewState::Document(handle)) => {
                    println!("Document preview delegated to renderer: {}", handle.as_str());
                }
                Some(state @ (PreviewState::Unsupported | PreviewState::Error(_))) => {
                    println!("{}", state.caption().unwrap_or("No preview available"));
                }
                Some(PreviewState::Pending) | None => bail!("preview did not resolve"),
            }
        }
    }

    Ok(())
}

async fn ingest_paths(paths: Vec<PathBuf>) -> Result<Arc<ContentRegistry>> {
    let registry = ContentRegistry::new();
    let pipeline = IngestPipeline::new(
        Arc::new(StaticPermissions::granted()),
        Arc::new(PathPicker::new(paths)),
        Arc::clone(&registry),
    );

    match pipeline.ingest().await {
        IngestOutcome::Imported(n) => {
            eprintln!("Imported {n} file(s)");
            Ok(registry)
        }
        outcome => bail!("{}", outcome.caption()),
    }
}
