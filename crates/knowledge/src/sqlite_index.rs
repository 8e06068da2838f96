//! SQLite-backed vector index.
//!
//! Rows live in a single `records` table partitioned by collection name.
//! Embeddings are stored as little-endian `f32` blobs. A copy of the
//! collection is kept in memory so queries never touch the connection.
//! Every call runs on the blocking pool, so callers can bound it with a
//! timeout.

use crate::vector_index::{rank, IndexRecord, Metadata, ScoredChunk, VectorIndex};
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};
use verirag_core::{AppError, AppResult};

pub struct SqliteIndex {
    inner: Arc<Inner>,
}

struct Inner {
    collection: String,
    conn: Mutex<Connection>,
    cache: RwLock<Cache>,
}

/// In-memory copy of the collection, in insertion order.
#[derive(Default)]
struct Cache {
    records: Vec<IndexRecord>,
    positions: HashMap<String, usize>,
    next_seq: i64,
}

impl Cache {
    fn apply(&mut self, record: IndexRecord) {
        match self.positions.get(&record.id) {
            Some(&pos) => self.records[pos] = record,
            None => {
                self.positions.insert(record.id.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }
}

impl SqliteIndex {
    /// Open (or create) an index file and load `collection` into memory.
    pub fn open(db_path: &Path, collection: impl Into<String>) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::Index(format!("Failed to create index directory: {}", e)))?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Index(format!("Failed to open SQLite index: {}", e)))?;
        tracing::debug!("Opened SQLite index at {:?}", db_path);
        Self::from_connection(conn, collection.into())
    }

    /// Index that lives only as long as the process.
    pub fn in_memory(collection: impl Into<String>) -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Index(format!("Failed to open in-memory index: {}", e)))?;
        Self::from_connection(conn, collection.into())
    }

    fn from_connection(conn: Connection, collection: String) -> AppResult<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                seq INTEGER NOT NULL,
                text TEXT NOT NULL,
                metadata TEXT NOT NULL,
                embedding BLOB NOT NULL,
                PRIMARY KEY (collection, id)
            );
            "#,
        )
        .map_err(|e| AppError::Index(format!("Failed to create tables: {}", e)))?;

        let cache = load_cache(&conn, &collection)?;
        tracing::debug!(
            collection = %collection,
            records = cache.records.len(),
            "Loaded vector index"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                collection,
                conn: Mutex::new(conn),
                cache: RwLock::new(cache),
            }),
        })
    }

    /// Run `op` on the blocking pool.
    async fn blocking<T, F>(&self, op: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Inner) -> AppResult<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || op(&inner))
            .await
            .map_err(|e| AppError::Index(format!("Index task failed: {}", e)))?
    }
}

fn load_cache(conn: &Connection, collection: &str) -> AppResult<Cache> {
    let mut stmt = conn
        .prepare(
            "SELECT id, seq, text, metadata, embedding FROM records WHERE collection = ?1 ORDER BY seq",
        )
        .map_err(|e| AppError::Index(format!("Failed to prepare query: {}", e)))?;

    let rows = stmt
        .query_map(params![collection], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Vec<u8>>(4)?,
            ))
        })
        .map_err(|e| AppError::Index(format!("Failed to query records: {}", e)))?;

    let mut cache = Cache::default();
    for row in rows {
        let (id, seq, text, metadata_json, embedding_bytes) =
            row.map_err(|e| AppError::Index(format!("Failed to read record: {}", e)))?;
        let metadata: Metadata = serde_json::from_str(&metadata_json)?;
        cache.next_seq = cache.next_seq.max(seq + 1);
        cache.apply(IndexRecord {
            id,
            text,
            metadata,
            embedding: bytes_to_embedding(&embedding_bytes)?,
        });
    }
    Ok(cache)
}

fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Index("Invalid embedding bytes length".to_string()));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

fn poisoned<T>(_: T) -> AppError {
    AppError::Index("index lock poisoned".to_string())
}

impl Inner {
    fn query(&self, vector: &[f32], top_k: usize) -> AppResult<Vec<ScoredChunk>> {
        let cache = self.cache.read().map_err(poisoned)?;
        let results = rank(cache.records.iter(), vector, top_k);
        tracing::debug!(
            "Retrieved {} chunks (requested top-{})",
            results.len(),
            top_k
        );
        Ok(results)
    }

    /// Write only `records`. New ids are appended after the current last
    /// row; an existing id keeps its position.
    fn upsert(&self, records: Vec<IndexRecord>) -> AppResult<()> {
        // Cache write lock is held across the transaction so readers see
        // either the old collection or the new one.
        let mut cache = self.cache.write().map_err(poisoned)?;
        let mut conn = self.conn.lock().map_err(poisoned)?;

        let mut next_seq = cache.next_seq;
        let tx = conn
            .transaction()
            .map_err(|e| AppError::Index(format!("Failed to begin transaction: {}", e)))?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO records (collection, id, seq, text, metadata, embedding)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT (collection, id) DO UPDATE SET
                         text = excluded.text,
                         metadata = excluded.metadata,
                         embedding = excluded.embedding",
                )
                .map_err(|e| AppError::Index(format!("Failed to prepare insert: {}", e)))?;

            for record in &records {
                let metadata_json = serde_json::to_string(&record.metadata)?;
                stmt.execute(params![
                    self.collection,
                    record.id,
                    next_seq,
                    record.text,
                    metadata_json,
                    embedding_to_bytes(&record.embedding),
                ])
                .map_err(|e| AppError::Index(format!("Failed to insert record: {}", e)))?;
                next_seq += 1;
            }
        }
        tx.commit()
            .map_err(|e| AppError::Index(format!("Failed to commit upsert: {}", e)))?;

        let written = records.len();
        for record in records {
            cache.apply(record);
        }
        cache.next_seq = next_seq;

        tracing::debug!(
            collection = %self.collection,
            written,
            total = cache.records.len(),
            "Upserted records"
        );
        Ok(())
    }

    fn reset(&self) -> AppResult<()> {
        let mut cache = self.cache.write().map_err(poisoned)?;
        let conn = self.conn.lock().map_err(poisoned)?;

        conn.execute(
            "DELETE FROM records WHERE collection = ?1",
            params![self.collection],
        )
        .map_err(|e| AppError::Index(format!("Failed to delete records: {}", e)))?;
        *cache = Cache::default();

        tracing::info!(collection = %self.collection, "Reset vector index");
        Ok(())
    }

    fn count(&self) -> AppResult<usize> {
        Ok(self.cache.read().map_err(poisoned)?.records.len())
    }
}

#[async_trait::async_trait]
impl VectorIndex for SqliteIndex {
    async fn query(&self, vector: &[f32], top_k: usize) -> AppResult<Vec<ScoredChunk>> {
        let vector = vector.to_vec();
        self.blocking(move |inner| inner.query(&vector, top_k)).await
    }

    async fn upsert(&self, records: Vec<IndexRecord>) -> AppResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        self.blocking(move |inner| inner.upsert(records)).await
    }

    async fn reset(&self) -> AppResult<()> {
        self.blocking(|inner| inner.reset()).await
    }

    async fn count(&self) -> AppResult<usize> {
        self.blocking(|inner| inner.count()).await
    }
}
