//! Memoization of text embeddings.
//!
//! Keys are the trimmed, lowercased text. The cache is unbounded and lives for
//! the process lifetime.

use super::Embedder;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use tokio::sync::RwLock;
use tracing::debug;

/// Text to embedding cache.
#[derive(Default)]
pub struct EmbeddingCache {
    entries: RwLock<HashMap<String, Vec<f32>>>,
}

impl EmbeddingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache key for `text`.
    pub fn key(text: &str) -> String {
        text.trim().to_lowercase()
    }

    /// Return the cached vector for `text`, computing and storing it on a miss.
    ///
    /// Failed computations are not cached.
    pub async fn get_or_compute<F, Fut>(&self, text: &str, compute: F) -> Result<Vec<f32>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<f32>>>,
    {
        let key = Self::key(text);

        if let Some(hit) = self.entries.read().await.get(&key) {
            debug!("Using cached embedding");
            return Ok(hit.clone());
        }

        let embedding = compute().await?;
        self.entries.write().await.insert(key, embedding.clone());
        Ok(embedding)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// An [`Embedder`] that consults an [`EmbeddingCache`] before the inner embedder.
pub struct CachedEmbedder<E> {
    inner: E,
    cache: EmbeddingCache,
}

impl<E: Embedder> CachedEmbedder<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            cache: EmbeddingCache::new(),
        }
    }

    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }
}

#[async_trait]
impl<E: Embedder> Embedder for CachedEmbedder<E> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.cache
            .get_or_compute(text, || self.inner.embed(text))
            .await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }
}
