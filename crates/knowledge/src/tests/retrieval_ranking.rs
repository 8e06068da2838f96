//! Tests for retrieval ranking and index concurrency.

use crate::sqlite_index::SqliteIndex;
use crate::vector_index::{IndexRecord, Metadata, VectorIndex};
use std::sync::Arc;

fn record(id: &str, text: &str, embedding: Vec<f32>) -> IndexRecord {
    IndexRecord {
        id: id.to_string(),
        text: text.to_string(),
        metadata: Metadata::new(),
        embedding: normalize(&embedding),
    }
}

fn normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

#[tokio::test]
async fn test_relevant_chunk_ranks_first() {
    let index = SqliteIndex::in_memory("ranking").unwrap();
    index
        .upsert(vec![
            record("pasta", "Cooking recipes for pasta", vec![-0.3, -0.8, 0.4, -0.2]),
            record("rust", "Rust is a systems programming language", vec![1.0, 0.5, 0.2, 0.1]),
        ])
        .await
        .unwrap();

    let results = index
        .query(&normalize(&[0.9, 0.4, 0.3, 0.1]), 5)
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].text, "Rust is a systems programming language");
    assert!(results[0].score > 0.9, "score was {}", results[0].score);
    assert!(results[1].score < 0.0);
}

#[tokio::test]
async fn test_top_k_limits_results() {
    let index = SqliteIndex::in_memory("ranking").unwrap();
    let records = (0..10)
        .map(|i| record(&format!("r{i}"), &format!("passage {i}"), vec![1.0, i as f32]))
        .collect();
    index.upsert(records).await.unwrap();

    let results = index.query(&[1.0, 0.0], 3).await.unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].text, "passage 0");
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reads_during_writes() {
    let index = Arc::new(SqliteIndex::in_memory("concurrent").unwrap());
    index
        .upsert(vec![record("seed", "seed passage", vec![1.0, 0.0])])
        .await
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let index = Arc::clone(&index);
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                index
                    .upsert(vec![
                        record(&format!("a{i}"), "first half", vec![0.0, 1.0]),
                        record(&format!("b{i}"), "second half", vec![0.0, 1.0]),
                    ])
                    .await
                    .unwrap();
            }
            let count = index.count().await.unwrap();
            // Writes land in pairs, so a reader never sees an odd count.
            assert_eq!(count % 2, 1);
            index.query(&[1.0, 0.0], 1).await.unwrap()
        }));
    }

    for handle in handles {
        let top = handle.await.unwrap();
        assert_eq!(top[0].text, "seed passage");
    }
    assert_eq!(index.count().await.unwrap(), 9);
}
