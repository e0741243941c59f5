use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use citeflow::models::Resolution;
use citeflow::{Config, Resolver};

#[derive(Parser)]
#[command(name = "citeflow", version, about = "Resolve citation fragments into bibliographic metadata")]
struct Cli {
    /// Emit results as JSON instead of human-readable lines.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a single citation fragment.
    Resolve {
        /// The fragment text, e.g. "(Coleman, 1988)" or a DOI.
        text: String,
    },
    /// Extract and resolve every citation in a text file.
    Scan {
        /// Path to the document.
        path: PathBuf,
    },
    /// List the configured lookup engines.
    Engines,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("citeflow=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load().context("loading configuration")?;
    let resolver = Resolver::from_config(&config);

    match cli.command {
        Command::Resolve { text } => {
            let resolution = resolver.resolve(&text).await;
            print_resolution(&text, &resolution, cli.json)?;
        }
        Command::Scan { path } => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let results = resolver.resolve_document(&text).await;
            if cli.json {
                let items: Vec<serde_json::Value> = results
                    .iter()
                    .map(|(fragment, resolution)| {
                        serde_json::json!({
                            "fragment": fragment,
                            "resolution": resolution,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                for (fragment, resolution) in &results {
                    print_resolution(&fragment.raw_text, resolution, false)?;
                }
            }
        }
        Command::Engines => {
            for engine in resolver.registry().all() {
                println!("{:<18} {}", engine.id(), engine.name());
            }
        }
    }

    if let Some(cache) = resolver.cache() {
        cache.save().context("saving cache")?;
    }

    Ok(())
}

fn print_resolution(text: &str, resolution: &Resolution, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(resolution)?);
        return Ok(());
    }

    match resolution {
        Resolution::Resolved(meta) => {
            let authors = if meta.authors.is_empty() {
                "unknown authors".to_string()
            } else {
                meta.authors.join(", ")
            };
            let year = meta.year.as_deref().unwrap_or("n.d.");
            println!(
                "{text}\n  -> {} ({year}). {}. [{} via {}, confidence {:.2}]",
                authors, meta.title, meta.kind, meta.source_engine, meta.confidence
            );
            if let Some(doi) = &meta.identifiers.doi {
                println!("     doi: {doi}");
            }
        }
        Resolution::Unresolved { original_text } => {
            println!("{text}\n  -> unresolved (kept verbatim: {original_text})");
        }
    }
    Ok(())
}
