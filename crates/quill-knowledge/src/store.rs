//! Sqlite-backed vector store.
//!
//! Embeddings are stored as little-endian f32 blobs and scanned
//! brute-force at query time. Inserts for one document go through a single
//! transaction, so a failure partway leaves nothing queryable from that
//! document.

use std::cmp::Ordering;
use std::sync::Mutex;

use rusqlite::{Connection, params};

use quill_core::error::{QuillError, Result};
use quill_core::traits::VectorStore;
use quill_core::types::ScoredChunk;

/// Cosine similarity between two equal-length vectors, in [-1, 1].
/// A zero vector has no direction and scores 0 against everything.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut na = 0.0f32;
    let mut nb = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    let denom = na.sqrt() * nb.sqrt();
    if denom == 0.0 { 0.0 } else { dot / denom }
}

pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
    dimensions: usize,
}

impl SqliteVectorStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: &std::path::Path, dimensions: usize) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .map_err(|e| QuillError::Persistence(format!("Failed to open store: {e}")))?;
        Self::from_connection(conn, dimensions)
    }

    /// In-memory store, used by tests.
    pub fn in_memory(dimensions: usize) -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| QuillError::Persistence(format!("Failed to open store: {e}")))?;
        Self::from_connection(conn, dimensions)
    }

    fn from_connection(conn: Connection, dimensions: usize) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS chunks (
                id        INTEGER PRIMARY KEY AUTOINCREMENT,
                content   TEXT NOT NULL,
                embedding BLOB NOT NULL
            );",
        )
        .map_err(|e| QuillError::Persistence(format!("Failed to init schema: {e}")))?;
        Ok(Self { conn: Mutex::new(conn), dimensions })
    }

    /// Number of stored chunks.
    pub fn chunk_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))
            .map_err(|e| QuillError::Persistence(e.to_string()))?;
        Ok(count as usize)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| QuillError::Persistence("store lock poisoned".into()))
    }
}

fn encode_embedding(v: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(v.len() * 4);
    for f in v {
        out.extend_from_slice(&f.to_le_bytes());
    }
    out
}

fn decode_embedding(blob: &[u8], dimensions: usize) -> Result<Vec<f32>> {
    if blob.len() != dimensions * 4 {
        return Err(QuillError::Persistence(format!(
            "stored embedding has {} bytes, expected {} ({} dims)",
            blob.len(),
            dimensions * 4,
            dimensions
        )));
    }
    Ok(blob
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

impl VectorStore for SqliteVectorStore {
    fn insert_chunks(&self, rows: &[(String, Vec<f32>)]) -> Result<usize> {
        for (content, embedding) in rows {
            if content.is_empty() {
                return Err(QuillError::Persistence("chunk content is empty".into()));
            }
            if embedding.len() != self.dimensions {
                return Err(QuillError::Embedding(format!(
                    "embedding has {} dims, expected {}",
                    embedding.len(),
                    self.dimensions
                )));
            }
        }

        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| QuillError::Persistence(e.to_string()))?;
        for (content, embedding) in rows {
            tx.execute(
                "INSERT INTO chunks (content, embedding) VALUES (?1, ?2)",
                params![content, encode_embedding(embedding)],
            )
            .map_err(|e| QuillError::Persistence(format!("insert failed: {e}")))?;
        }
        tx.commit()
            .map_err(|e| QuillError::Persistence(format!("commit failed: {e}")))?;
        Ok(rows.len())
    }

    fn query(&self, query: &[f32], threshold: f32, limit: usize) -> Result<Vec<ScoredChunk>> {
        if query.len() != self.dimensions {
            return Err(QuillError::Embedding(format!(
                "query vector has {} dims, expected {}",
                query.len(),
                self.dimensions
            )));
        }

        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, content, embedding FROM chunks ORDER BY id ASC")
            .map_err(|e| QuillError::Persistence(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                ))
            })
            .map_err(|e| QuillError::Persistence(e.to_string()))?;

        let mut scored = Vec::new();
        for row in rows {
            let (id, content, blob) =
                row.map_err(|e| QuillError::Persistence(e.to_string()))?;
            let embedding = decode_embedding(&blob, self.dimensions)?;
            let similarity = cosine_similarity(&embedding, query);
            if similarity > threshold {
                scored.push(ScoredChunk { id, content, similarity });
            }
        }

        // Rows arrive in ascending id; the stable sort keeps that order for
        // equal similarities.
        scored.sort_by(|a, b| {
            b.similarity.partial_cmp(&a.similarity).unwrap_or(Ordering::Equal)
        });
        scored.truncate(limit);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vec_of(dim: usize, head: &[f32]) -> Vec<f32> {
        let mut v = vec![0.0f32; dim];
        v[..head.len()].copy_from_slice(head);
        v
    }

    #[test]
    fn test_cosine_similarity_bounds() {
        let a = [1.0, 0.0, 0.0];
        let b = [1.0, 0.0, 0.0];
        let c = [-1.0, 0.0, 0.0];
        let d = [0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
        assert!((cosine_similarity(&a, &c) + 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&a, &d).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_insert_and_query_orders_descending() {
        let store = SqliteVectorStore::in_memory(4).unwrap();
        store
            .insert_chunks(&[
                ("far".into(), vec_of(4, &[0.0, 1.0])),
                ("near".into(), vec_of(4, &[1.0, 0.1])),
                ("exact".into(), vec_of(4, &[1.0, 0.0])),
            ])
            .unwrap();

        let hits = store.query(&vec_of(4, &[1.0, 0.0]), 0.5, 10).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].content, "exact");
        assert_eq!(hits[1].content, "near");
        assert!(hits[0].similarity > hits[1].similarity);
        for h in &hits {
            assert!(h.similarity > 0.5);
        }
    }

    #[test]
    fn test_threshold_is_exclusive_and_limit_caps() {
        let store = SqliteVectorStore::in_memory(4).unwrap();
        let same = vec_of(4, &[1.0, 0.0]);
        store
            .insert_chunks(&[
                ("a".into(), same.clone()),
                ("b".into(), same.clone()),
                ("c".into(), same.clone()),
            ])
            .unwrap();

        // similarity == 1.0; threshold 1.0 is exclusive → nothing clears it.
        assert!(store.query(&same, 1.0, 10).unwrap().is_empty());

        let hits = store.query(&same, 0.0, 2).unwrap();
        assert_eq!(hits.len(), 2);
        // Ties break by ascending id.
        assert_eq!(hits[0].content, "a");
        assert_eq!(hits[1].content, "b");
    }

    #[test]
    fn test_no_match_is_empty_not_error() {
        let store = SqliteVectorStore::in_memory(4).unwrap();
        store
            .insert_chunks(&[("x".into(), vec_of(4, &[0.0, 1.0]))])
            .unwrap();
        let hits = store.query(&vec_of(4, &[1.0, 0.0]), 0.5, 10).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let store = SqliteVectorStore::in_memory(4).unwrap();
        let err = store
            .insert_chunks(&[("bad".into(), vec![1.0; 3])])
            .unwrap_err();
        assert!(matches!(err, QuillError::Embedding(_)));

        let err = store.query(&[1.0; 3], 0.5, 10).unwrap_err();
        assert!(matches!(err, QuillError::Embedding(_)));
    }

    #[test]
    fn test_empty_content_rejected_before_write() {
        let store = SqliteVectorStore::in_memory(4).unwrap();
        let err = store
            .insert_chunks(&[
                ("ok".into(), vec![1.0; 4]),
                ("".into(), vec![1.0; 4]),
            ])
            .unwrap_err();
        assert!(matches!(err, QuillError::Persistence(_)));
        // Nothing from the failed batch is queryable.
        assert_eq!(store.chunk_count().unwrap(), 0);
    }

    #[test]
    fn test_embedding_roundtrip() {
        let v = vec![0.5f32, -1.25, 3.75, 0.0];
        let blob = encode_embedding(&v);
        assert_eq!(decode_embedding(&blob, 4).unwrap(), v);
        assert!(decode_embedding(&blob, 5).is_err());
    }
}
