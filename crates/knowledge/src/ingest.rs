//! File ingestion: read, normalize, split, embed and store.

use crate::store::DocumentStore;
use crate::vector_index::Metadata;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use text_splitter::{ChunkConfig, TextSplitter};
use verirag_core::{AppError, AppResult, RagSettings};
use walkdir::WalkDir;

/// File extensions accepted by ingestion.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["txt", "md", "markdown"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOptions {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Characters shared between neighbouring chunks
    pub chunk_overlap: usize,
    /// Chunks shorter than this (after trimming) are dropped
    pub min_chunk_chars: usize,
}

impl IngestOptions {
    pub fn from_settings(settings: &RagSettings) -> Self {
        Self {
            chunk_size: settings.chunk_size,
            chunk_overlap: settings.chunk_overlap,
            min_chunk_chars: settings.min_chunk_chars,
        }
    }
}

/// Outcome of an ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestStats {
    pub files: usize,
    pub skipped_files: usize,
    pub chunks: usize,
    pub dropped_chunks: usize,
    pub bytes: u64,
    pub duration_secs: f64,
}

/// Collapse runs of whitespace (including newlines) into single spaces.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split cleaned text into chunks and drop the undersized ones.
///
/// Returns the kept chunks and the number dropped.
pub fn split_text(text: &str, options: &IngestOptions) -> AppResult<(Vec<String>, usize)> {
    let config = ChunkConfig::new(options.chunk_size)
        .with_overlap(options.chunk_overlap)
        .map_err(|e| AppError::Config(format!("Invalid chunking settings: {}", e)))?;
    let splitter = TextSplitter::new(config);

    let mut dropped = 0;
    let chunks = splitter
        .chunks(text)
        .filter_map(|chunk| {
            let trimmed = chunk.trim();
            if trimmed.chars().count() >= options.min_chunk_chars {
                Some(trimmed.to_string())
            } else {
                dropped += 1;
                None
            }
        })
        .collect();

    Ok((chunks, dropped))
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Expand files and directories into the list of supported files.
fn collect_files(paths: &[PathBuf]) -> (Vec<PathBuf>, usize) {
    let mut files = Vec::new();
    let mut skipped = 0;

    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let entry_path = entry.path();
                if !entry_path.is_file() {
                    continue;
                }
                if is_supported(entry_path) {
                    files.push(entry_path.to_path_buf());
                } else {
                    skipped += 1;
                }
            }
        } else if path.is_file() && is_supported(path) {
            files.push(path.clone());
        } else {
            tracing::warn!("Skipping unsupported or missing path: {:?}", path);
            skipped += 1;
        }
    }

    (files, skipped)
}

/// Ingest files and directories into the store.
///
/// Unreadable files are skipped with a warning. Store failures abort the
/// run, since every later file would fail the same way.
pub async fn ingest_paths(
    store: &DocumentStore,
    paths: &[PathBuf],
    options: &IngestOptions,
) -> AppResult<IngestStats> {
    let start = Instant::now();
    let (files, skipped_files) = collect_files(paths);
    let mut stats = IngestStats {
        skipped_files,
        ..Default::default()
    };

    tracing::info!("Ingesting {} files", files.len());

    for file in &files {
        let raw = match std::fs::read_to_string(file) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Skipping {:?}: {}", file, e);
                stats.skipped_files += 1;
                continue;
            }
        };

        let (chunks, dropped) = split_text(&clean_text(&raw), options)?;
        stats.dropped_chunks += dropped;
        if chunks.is_empty() {
            tracing::warn!("No usable chunks in {:?}", file);
            stats.skipped_files += 1;
            continue;
        }

        let source = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| file.to_string_lossy().to_string());
        let ingested_at = Utc::now().to_rfc3339();
        let total = chunks.len();
        let metadatas: Vec<Metadata> = (0..total)
            .map(|i| {
                let mut metadata = Metadata::new();
                metadata.insert("chunk_id".to_string(), serde_json::json!(i));
                metadata.insert("source".to_string(), serde_json::json!(source));
                metadata.insert("total_chunks".to_string(), serde_json::json!(total));
                metadata.insert("ingested_at".to_string(), serde_json::json!(ingested_at));
                metadata
            })
            .collect();

        let added = store.add_documents(chunks, Some(metadatas)).await?;
        tracing::debug!("Ingested {:?}: {} chunks", file, added);

        stats.files += 1;
        stats.chunks += added;
        stats.bytes += raw.len() as u64;
    }

    stats.duration_secs = start.elapsed().as_secs_f64();
    tracing::info!(
        "Ingestion completed: {} files, {} chunks, {} dropped in {:.2}s",
        stats.files,
        stats.chunks,
        stats.dropped_chunks,
        stats.duration_secs
    );
    Ok(stats)
}
