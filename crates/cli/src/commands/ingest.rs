//! Ingest command handler.
//!
//! Splits text files into passages and adds them to the workspace index.

use clap::Args;
use std::path::PathBuf;
use verirag_core::{config::AppConfig, AppError, AppResult};
use verirag_knowledge::{ingest_paths, IngestOptions};

/// Ingest text documents into the index
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Files or directories to ingest
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Clear the collection before ingesting
    #[arg(long)]
    pub reset: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ingest command for {} paths", self.paths.len());

        for path in &self.paths {
            if !path.exists() {
                return Err(AppError::Config(format!(
                    "Path does not exist: {}",
                    path.display()
                )));
            }
        }

        let store = verirag_knowledge::open_store(config)?;
        if self.reset {
            store.reset().await?;
        }

        let options = IngestOptions::from_settings(&config.rag);
        let stats = ingest_paths(&store, &self.paths, &options).await?;
        let total = store.count().await?;

        if self.json {
            let output = serde_json::json!({
                "collection": config.rag.collection,
                "files": stats.files,
                "skippedFiles": stats.skipped_files,
                "chunks": stats.chunks,
                "droppedChunks": stats.dropped_chunks,
                "bytesProcessed": stats.bytes,
                "durationSecs": stats.duration_secs,
                "totalPassages": total,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Ingested {} files ({} chunks, {} bytes) in {:.2}s",
                stats.files, stats.chunks, stats.bytes, stats.duration_secs
            );
            if stats.skipped_files > 0 {
                println!("Skipped {} unreadable or empty files", stats.skipped_files);
            }
            println!("Collection '{}' now holds {} passages", config.rag.collection, total);
        }

        Ok(())
    }
}
