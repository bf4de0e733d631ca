//! SQLite-backed vector index using the `sqlite-vec` extension.
//!
//! Chunks and their embeddings live in a single table; nearest-neighbor
//! queries rank rows with `vec_distance_cosine`. Embeddings are stored as
//! JSON arrays, which `vec_f32()` parses on the SQL side.

use std::mem::transmute;
use std::os::raw::c_char;
use std::path::Path;
use std::sync::Once;

use tokio_rusqlite::{Connection, ffi, rusqlite};
use tracing::debug;
use uuid::Uuid;

use super::{IndexHit, VectorIndex, check_dimensions};
use crate::types::{Chunk, RagError};

#[derive(Clone)]
pub struct SqliteVectorIndex {
    conn: Connection,
    dimensions: usize,
}

impl SqliteVectorIndex {
    /// Opens (or creates) the database at `path` and prepares the chunk
    /// table. The sqlite-vec extension is registered process-wide on first
    /// use.
    pub async fn open(path: impl AsRef<Path>, dimensions: usize) -> Result<Self, RagError> {
        register_sqlite_vec()?;

        let conn = Connection::open(path)
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;

        conn.call(|conn| -> Result<(), rusqlite::Error> {
            // Fails loudly if the extension did not load.
            conn.query_row("select vec_version()", [], |row| row.get::<_, String>(0))?;
            conn.execute(
                "CREATE TABLE IF NOT EXISTS chunks (
                     id TEXT PRIMARY KEY,
                     source_id TEXT,
                     ordinal TEXT,
                     content TEXT,
                     embedding TEXT
                 )",
                [],
            )?;
            Ok(())
        })
        .await
        .map_err(|err| RagError::Storage(err.to_string()))?;

        Ok(Self { conn, dimensions })
    }
}

#[async_trait::async_trait]
impl VectorIndex for SqliteVectorIndex {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn upsert(&self, entries: Vec<(Chunk, Vec<f32>)>) -> Result<(), RagError> {
        if entries.is_empty() {
            return Ok(());
        }
        for (_, embedding) in &entries {
            check_dimensions(self.dimensions, embedding.len())?;
        }
        debug!(count = entries.len(), "inserting chunks into sqlite index");

        let mut rows = Vec::with_capacity(entries.len());
        for (chunk, embedding) in entries {
            let embedding_json = serde_json::to_string(&embedding)
                .map_err(|err| RagError::Storage(err.to_string()))?;
            rows.push((
                Uuid::new_v4().to_string(),
                chunk.source_id,
                chunk.ordinal.to_string(),
                chunk.text,
                embedding_json,
            ));
        }

        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                let tx = conn.transaction()?;
                {
                    let mut stmt = tx
                        .prepare(
                            "INSERT OR REPLACE INTO chunks \
                             (id, source_id, ordinal, content, embedding) \
                             VALUES (?1, ?2, ?3, ?4, ?5)",
                        )?;
                    for (id, source_id, ordinal, content, embedding) in &rows {
                        stmt.execute([id, source_id, ordinal, content, embedding])?;
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn query(&self, embedding: &[f32], n: usize) -> Result<Vec<IndexHit>, RagError> {
        check_dimensions(self.dimensions, embedding.len())?;
        let query_json = serde_json::to_string(embedding)
            .map_err(|err| RagError::Storage(err.to_string()))?;

        self.conn
            .call(move |conn| -> Result<Vec<IndexHit>, rusqlite::Error> {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT source_id, ordinal, content, embedding, \
                         vec_distance_cosine(vec_f32(embedding), vec_f32(?1)) AS distance \
                         FROM chunks ORDER BY distance ASC LIMIT {n}"
                    ))?;

                let rows = stmt
                    .query_map([&query_json], |row| {
                        let source_id: String = row.get(0)?;
                        let ordinal: String = row.get(1)?;
                        let content: String = row.get(2)?;
                        let embedding_json: String = row.get(3)?;
                        let distance: f32 = row.get(4)?;
                        Ok((source_id, ordinal, content, embedding_json, distance))
                    })?;

                let mut hits = Vec::new();
                for row in rows {
                    let (source_id, ordinal, content, embedding_json, distance) =
                        row?;
                    let stored: Vec<f32> =
                        serde_json::from_str(&embedding_json).unwrap_or_default();
                    hits.push(IndexHit {
                        chunk: Chunk::new(source_id, ordinal.parse().unwrap_or(0), content),
                        // cosine distance -> similarity
                        score: 1.0 - distance,
                        embedding: stored,
                    });
                }
                Ok(hits)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn clear(&self) -> Result<(), RagError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute("DELETE FROM chunks", [])?;
                Ok(())
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn count(&self) -> Result<usize, RagError> {
        self.conn
            .call(|conn| -> Result<usize, rusqlite::Error> {
                let count: i64 = conn
                    .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
                Ok(count as usize)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }
}

/// Registers sqlite-vec as an auto-loaded extension, once per process.
fn register_sqlite_vec() -> Result<(), RagError> {
    use std::sync::Mutex;

    static INIT: Once = Once::new();
    static INIT_RESULT: Mutex<Option<Result<(), String>>> = Mutex::new(None);

    INIT.call_once(|| {
        let result = unsafe {
            type SqliteExtensionInit = unsafe extern "C" fn(
                *mut ffi::sqlite3,
                *mut *mut c_char,
                *const ffi::sqlite3_api_routines,
            ) -> i32;

            let init: unsafe extern "C" fn() = sqlite_vec::sqlite3_vec_init;
            let init_fn: SqliteExtensionInit =
                transmute::<unsafe extern "C" fn(), SqliteExtensionInit>(init);
            let rc = ffi::sqlite3_auto_extension(Some(init_fn));
            if rc != 0 {
                Err(format!("failed to register sqlite-vec extension (code {rc})"))
            } else {
                Ok(())
            }
        };
        *INIT_RESULT.lock().expect("init result mutex poisoned") = Some(result);
    });

    INIT_RESULT
        .lock()
        .expect("init result mutex poisoned")
        .clone()
        .expect("init was called but result not set")
        .map_err(RagError::Storage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn chunk(ordinal: usize, text: &str) -> Chunk {
        Chunk::new("doc", ordinal, text)
    }

    #[tokio::test]
    async fn round_trips_chunks_by_similarity() {
        let dir = tempdir().unwrap();
        let index = SqliteVectorIndex::open(dir.path().join("index.sqlite"), 3)
            .await
            .unwrap();

        index
            .upsert(vec![
                (chunk(0, "x axis"), vec![1.0, 0.0, 0.0]),
                (chunk(1, "y axis"), vec![0.0, 1.0, 0.0]),
                (chunk(2, "diagonal"), vec![0.7, 0.7, 0.0]),
            ])
            .await
            .unwrap();
        assert_eq!(index.count().await.unwrap(), 3);

        let hits = index.query(&[1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.text, "x axis");
        assert_eq!(hits[1].chunk.text, "diagonal");
        assert!(hits[0].score > hits[1].score);
        assert_eq!(hits[0].embedding, vec![1.0, 0.0, 0.0]);
    }

    #[tokio::test]
    async fn empty_index_query_is_empty() {
        let dir = tempdir().unwrap();
        let index = SqliteVectorIndex::open(dir.path().join("index.sqlite"), 2)
            .await
            .unwrap();
        assert!(index.query(&[1.0, 0.0], 4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clear_wipes_the_table() {
        let dir = tempdir().unwrap();
        let index = SqliteVectorIndex::open(dir.path().join("index.sqlite"), 2)
            .await
            .unwrap();
        index
            .upsert(vec![(chunk(0, "gone soon"), vec![0.5, 0.5])])
            .await
            .unwrap();
        index.clear().await.unwrap();
        assert_eq!(index.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn rejects_wrong_dimensions() {
        let dir = tempdir().unwrap();
        let index = SqliteVectorIndex::open(dir.path().join("index.sqlite"), 4)
            .await
            .unwrap();
        let err = index
            .upsert(vec![(chunk(0, "bad"), vec![1.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { .. }));
    }
}
