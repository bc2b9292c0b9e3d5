//! Similarity retrieval of a room's text chunks.

use crate::embedding::Embedder;
use crate::error::Result;
use crate::store::{ContentStore, ScoredChunk};
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Default minimum cosine similarity for a chunk to count as relevant.
pub const DEFAULT_MIN_SIMILARITY: f32 = 0.2;

/// Finds the stored chunks most relevant to a question.
pub struct Retriever {
    store: Arc<dyn ContentStore>,
    embedder: Arc<dyn Embedder>,
    min_similarity: f32,
}

impl Retriever {
    pub fn new(store: Arc<dyn ContentStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            store,
            embedder,
            min_similarity: DEFAULT_MIN_SIMILARITY,
        }
    }

    /// Set the minimum similarity threshold.
    pub fn with_min_similarity(mut self, min_similarity: f32) -> Self {
        self.min_similarity = min_similarity;
        self
    }

    /// Chunks of `room_id` closest to `question`, best first.
    ///
    /// At most `limit` chunks are returned and none below the similarity
    /// threshold. An empty result is normal.
    #[instrument(skip(self, question))]
    pub async fn find_relevant_scored(
        &self,
        question: &str,
        room_id: Uuid,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let query_embedding = self.embedder.embed(question).await?;

        let results = self
            .store
            .search_chunks(room_id, &query_embedding, limit, self.min_similarity)
            .await?;

        debug!(
            "Retrieved {} chunks (best similarity {:?})",
            results.len(),
            results.first().map(|r| r.similarity)
        );
        Ok(results)
    }

    /// Text of the chunks of `room_id` closest to `question`, best first.
    pub async fn find_relevant(
        &self,
        question: &str,
        room_id: Uuid,
        limit: usize,
    ) -> Result<Vec<String>> {
        let results = self.find_relevant_scored(question, room_id, limit).await?;
        Ok(results.into_iter().map(|r| r.chunk.text).collect())
    }
}
