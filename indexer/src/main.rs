use anyhow::{Context, Result};
use booksearch_core::{IndexBuilder, IndexPaths};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::time::Instant;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and maintain the inverted index over the book datalake", long_about = None)]
struct Cli {
    /// Datalake root laid out as day/hour/book-id
    #[arg(long, env = "DATALAKE_PATH", default_value = "datalake", global = true)]
    datalake: String,
    /// Index snapshot file
    #[arg(long, env = "INDEX_PATH", default_value = "indexer/inverted_index.json", global = true)]
    index: String,
    /// Progress cursor file
    #[arg(long, env = "PROGRESS_PATH", default_value = "indexer/progress.json", global = true)]
    progress: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index everything after the saved progress cursor
    Build {
        /// Stop after this many completed day/hour buckets
        #[arg(long)]
        max_buckets: Option<usize>,
    },
    /// Clear progress and walk the whole datalake again
    Rebuild,
    /// Re-index a single book
    Update {
        book_id: u32,
    },
    /// Show snapshot size, book count and cursor position
    Status,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let builder = IndexBuilder::new(&cli.datalake, IndexPaths::new(&cli.index, &cli.progress));

    let start = Instant::now();
    let output = match cli.command {
        Commands::Build { max_buckets } => {
            let report = match max_buckets {
                Some(max) => builder.build_limited(max),
                None => builder.build(),
            }
            .context("incremental build failed")?;
            json!({ "report": report, "elapsed_s": start.elapsed().as_secs_f64() })
        }
        Commands::Rebuild => {
            let report = builder.rebuild().context("rebuild failed")?;
            json!({ "report": report, "elapsed_s": start.elapsed().as_secs_f64() })
        }
        Commands::Update { book_id } => {
            let report = builder
                .update_book(book_id)
                .with_context(|| format!("update of book {book_id} failed"))?;
            json!({ "book_id": book_id, "index": "updated", "report": report })
        }
        Commands::Status => serde_json::to_value(builder.status()?)?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    tracing::debug!(elapsed_s = start.elapsed().as_secs_f64(), "indexer finished");
    Ok(())
}
