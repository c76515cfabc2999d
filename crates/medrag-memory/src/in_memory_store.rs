use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::vector_store::{
    BoxFuture, ScoredVectorPoint, VectorPoint, VectorStore, VectorStoreError,
};

struct StoredPoint {
    vector: Vec<f32>,
    payload: HashMap<String, serde_json::Value>,
}

struct InMemoryCollection {
    vector_size: u64,
    points: HashMap<String, StoredPoint>,
}

/// Process-local vector index. One lives per ingested report.
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, InMemoryCollection>>,
}

impl InMemoryVectorStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let collections = self.collections.read().map(|c| c.len()).unwrap_or(0);
        f.debug_struct("InMemoryVectorStore")
            .field("collections", &collections)
            .finish_non_exhaustive()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn chunk_order(p: &ScoredVectorPoint) -> u64 {
    p.chunk_index().unwrap_or(u64::MAX)
}

impl VectorStore for InMemoryVectorStore {
    fn ensure_collection(
        &self,
        collection: &str,
        vector_size: u64,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let mut cols = self
                .collections
                .write()
                .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
            let col = cols
                .entry(collection.clone())
                .or_insert_with(|| InMemoryCollection {
                    vector_size,
                    points: HashMap::new(),
                });
            if col.vector_size != vector_size {
                return Err(VectorStoreError::Collection(format!(
                    "collection {collection} has vector size {}, requested {vector_size}",
                    col.vector_size
                )));
            }
            Ok(())
        })
    }

    fn delete_collection(&self, collection: &str) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let mut cols = self
                .collections
                .write()
                .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
            cols.remove(&collection);
            Ok(())
        })
    }

    fn upsert(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let mut cols = self
                .collections
                .write()
                .map_err(|e| VectorStoreError::Upsert(e.to_string()))?;
            let col = cols.get_mut(&collection).ok_or_else(|| {
                VectorStoreError::Upsert(format!("collection {collection} not found"))
            })?;
            if let Some(bad) = points
                .iter()
                .find(|p| p.vector.len() as u64 != col.vector_size)
            {
                return Err(VectorStoreError::Upsert(format!(
                    "point {} has {} dimensions, expected {}",
                    bad.id,
                    bad.vector.len(),
                    col.vector_size
                )));
            }
            for p in points {
                col.points.insert(
                    p.id,
                    StoredPoint {
                        vector: p.vector,
                        payload: p.payload,
                    },
                );
            }
            Ok(())
        })
    }

    fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
    ) -> BoxFuture<'_, Result<Vec<ScoredVectorPoint>, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let cols = self
                .collections
                .read()
                .map_err(|e| VectorStoreError::Search(e.to_string()))?;
            let col = cols.get(&collection).ok_or_else(|| {
                VectorStoreError::Search(format!("collection {collection} not found"))
            })?;
            if vector.len() as u64 != col.vector_size {
                return Err(VectorStoreError::Search(format!(
                    "query has {} dimensions, expected {}",
                    vector.len(),
                    col.vector_size
                )));
            }

            let mut scored: Vec<ScoredVectorPoint> = col
                .points
                .iter()
                .map(|(id, sp)| ScoredVectorPoint {
                    id: id.clone(),
                    score: cosine_similarity(&vector, &sp.vector),
                    payload: sp.payload.clone(),
                })
                .collect();

            scored.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| chunk_order(a).cmp(&chunk_order(b)))
                    .then_with(|| a.id.cmp(&b.id))
            });
            scored.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
            Ok(scored)
        })
    }

    fn count(&self, collection: &str) -> BoxFuture<'_, Result<u64, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let cols = self
                .collections
                .read()
                .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
            Ok(cols.get(&collection).map_or(0, |c| c.points.len() as u64))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(id: &str, vector: Vec<f32>, chunk_index: u64, content: &str) -> VectorPoint {
        let mut payload = HashMap::new();
        payload.insert("chunk_index".into(), serde_json::json!(chunk_index));
        payload.insert("content".into(), serde_json::json!(content));
        VectorPoint {
            id: id.into(),
            vector,
            payload,
        }
    }

    #[test]
    fn cosine_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < f32::EPSILON);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < f32::EPSILON);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < f32::EPSILON);
        assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn search_returns_nearest_first() {
        let store = InMemoryVectorStore::new();
        store.ensure_collection("report", 2).await.unwrap();
        store
            .upsert(
                "report",
                vec![
                    point("a", vec![1.0, 0.0], 0, "fever"),
                    point("b", vec![0.0, 1.0], 1, "billing"),
                    point("c", vec![0.7, 0.7], 2, "mixed"),
                ],
            )
            .await
            .unwrap();

        let results = store.search("report", vec![1.0, 0.1], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].content(), Some("fever"));
        assert_eq!(results[1].content(), Some("mixed"));
    }

    #[tokio::test]
    async fn ties_broken_by_chunk_index() {
        let store = InMemoryVectorStore::new();
        store.ensure_collection("report", 2).await.unwrap();
        store
            .upsert(
                "report",
                vec![
                    point("z", vec![1.0, 0.0], 2, "third"),
                    point("y", vec![1.0, 0.0], 0, "first"),
                    point("x", vec![1.0, 0.0], 1, "second"),
                ],
            )
            .await
            .unwrap();

        let results = store.search("report", vec![1.0, 0.0], 3).await.unwrap();
        let order: Vec<_> = results.iter().filter_map(ScoredVectorPoint::content).collect();
        assert_eq!(order, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn upsert_rejects_dimension_mismatch() {
        let store = InMemoryVectorStore::new();
        store.ensure_collection("report", 3).await.unwrap();
        let err = store
            .upsert("report", vec![point("a", vec![1.0], 0, "x")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("expected 3"));
        assert_eq!(store.count("report").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn upsert_into_missing_collection_fails() {
        let store = InMemoryVectorStore::new();
        let result = store
            .upsert("missing", vec![point("a", vec![1.0], 0, "x")])
            .await;
        assert!(matches!(result, Err(VectorStoreError::Upsert(_))));
    }

    #[tokio::test]
    async fn ensure_collection_size_conflict() {
        let store = InMemoryVectorStore::new();
        store.ensure_collection("report", 3).await.unwrap();
        store.ensure_collection("report", 3).await.unwrap();
        assert!(store.ensure_collection("report", 4).await.is_err());
    }

    #[tokio::test]
    async fn count_and_delete() {
        let store = InMemoryVectorStore::new();
        assert_eq!(store.count("report").await.unwrap(), 0);
        store.ensure_collection("report", 1).await.unwrap();
        store
            .upsert(
                "report",
                vec![point("a", vec![1.0], 0, "x"), point("b", vec![0.5], 1, "y")],
            )
            .await
            .unwrap();
        assert_eq!(store.count("report").await.unwrap(), 2);

        store.delete_collection("report").await.unwrap();
        assert_eq!(store.count("report").await.unwrap(), 0);
        assert!(store.search("report", vec![1.0], 3).await.is_err());
    }

    #[test]
    fn debug_shows_collection_count() {
        let debug = format!("{:?}", InMemoryVectorStore::default());
        assert!(debug.contains("InMemoryVectorStore"));
        assert!(debug.contains("collections: 0"));
    }
}
