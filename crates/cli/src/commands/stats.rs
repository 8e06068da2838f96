//! Stats command handler.
//!
//! Shows the size of the document collection, or clears it.

use clap::Args;
use verirag_core::{config::AppConfig, AppError, AppResult};

/// Show or reset the document collection
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Remove every passage from the collection (requires --yes)
    #[arg(long)]
    pub reset: bool,

    /// Confirm a destructive operation
    #[arg(short, long)]
    pub yes: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");
        tracing::debug!("Stats options: {:?}", self);

        if self.reset && !self.yes {
            return Err(AppError::Config(
                "Refusing to reset the collection without --yes".to_string(),
            ));
        }

        let store = verirag_knowledge::open_store(config)?;
        if self.reset {
            store.reset().await?;
        }
        let count = store.count().await?;
        let embedder = store.embedder();

        if self.json {
            let output = serde_json::json!({
                "collection": config.rag.collection,
                "passages": count,
                "indexPath": config.index_path(),
                "embeddingProvider": embedder.provider_name(),
                "embeddingModel": embedder.model_name(),
                "dimensions": embedder.dimensions(),
                "reset": self.reset,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            if self.reset {
                println!("Collection '{}' cleared", config.rag.collection);
            }
            println!("Collection: {}", config.rag.collection);
            println!("Passages:   {}", count);
            println!("Index:      {}", config.index_path().display());
            println!(
                "Embeddings: {} ({}, {} dims)",
                embedder.provider_name(),
                embedder.model_name(),
                embedder.dimensions()
            );
        }

        Ok(())
    }
}
