//! Content store abstraction for Lectern.
//!
//! Rooms, their questions, and the text chunks (with embeddings) that answers
//! are grounded in. Provides a trait-based interface over storage backends.

mod memory;
mod sqlite;

pub use memory::MemoryContentStore;
pub use sqlite::SqliteContentStore;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A room that collects content and questions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_public: bool,
    /// The last file uploaded to this room, if any.
    pub original_file: Option<OriginalFile>,
    pub created_at: DateTime<Utc>,
}

/// Data needed to create a room.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRoom {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_public: bool,
}

impl Room {
    pub fn new(new_room: NewRoom) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: new_room.name,
            description: new_room.description,
            is_public: new_room.is_public,
            original_file: None,
            created_at: Utc::now(),
        }
    }
}

/// Metadata and extracted text of a file uploaded to a room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OriginalFile {
    pub name: String,
    /// Short type tag (txt, docx).
    pub file_type: String,
    pub content: String,
}

/// Room listing entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSummary {
    pub id: Uuid,
    pub name: String,
    pub questions_count: u32,
    pub created_at: DateTime<Utc>,
}

/// A question asked in a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub room_id: Uuid,
    pub question: String,
    /// Filled in asynchronously once the answer pipeline finishes.
    pub answer: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Question {
    pub fn new(room_id: Uuid, question: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id,
            question,
            answer: None,
            created_at: Utc::now(),
        }
    }
}

/// Where a chunk's text came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChunkSource {
    Audio,
    File,
}

impl ChunkSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkSource::Audio => "audio",
            ChunkSource::File => "file",
        }
    }
}

impl std::str::FromStr for ChunkSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "audio" => Ok(ChunkSource::Audio),
            "file" => Ok(ChunkSource::File),
            _ => Err(format!("Unknown chunk source: {}", s)),
        }
    }
}

/// Transcribed or extracted text with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextChunk {
    pub id: Uuid,
    pub room_id: Uuid,
    pub source: ChunkSource,
    pub text: String,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

impl TextChunk {
    pub fn new(room_id: Uuid, source: ChunkSource, text: String, embedding: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id,
            source,
            text,
            embedding,
            created_at: Utc::now(),
        }
    }
}

/// A chunk matched by similarity search.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: TextChunk,
    /// Cosine similarity to the query (higher is closer).
    pub similarity: f32,
}

/// Trait for content store implementations.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Persist a new room.
    async fn create_room(&self, room: &Room) -> Result<()>;

    /// Get a room by ID.
    async fn get_room(&self, room_id: Uuid) -> Result<Option<Room>>;

    /// List rooms with their question counts, oldest first.
    async fn list_rooms(&self) -> Result<Vec<RoomSummary>>;

    /// Record the file last uploaded to a room.
    async fn set_room_file(&self, room_id: Uuid, file: &OriginalFile) -> Result<()>;

    /// Persist a new question.
    async fn insert_question(&self, question: &Question) -> Result<()>;

    /// Set (or overwrite) a question's answer.
    async fn set_answer(&self, question_id: Uuid, answer: &str) -> Result<()>;

    /// Get a question within a room.
    async fn get_question(&self, room_id: Uuid, question_id: Uuid) -> Result<Option<Question>>;

    /// List a room's questions, newest first.
    async fn list_questions(&self, room_id: Uuid) -> Result<Vec<Question>>;

    /// Persist a text chunk.
    async fn insert_chunk(&self, chunk: &TextChunk) -> Result<()>;

    /// Find the room's chunks most similar to `query_embedding`.
    ///
    /// Results are ordered by similarity descending, hold at most `limit`
    /// entries, and never include a chunk with similarity below `min_similarity`.
    async fn search_chunks(
        &self,
        room_id: Uuid,
        query_embedding: &[f32],
        limit: usize,
        min_similarity: f32,
    ) -> Result<Vec<ScoredChunk>>;

    /// Number of chunks stored for a room.
    async fn chunk_count(&self, room_id: Uuid) -> Result<usize>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Score, filter, order and truncate candidate chunks.
pub(crate) fn rank_chunks(
    candidates: impl IntoIterator<Item = TextChunk>,
    query_embedding: &[f32],
    limit: usize,
    min_similarity: f32,
) -> Vec<ScoredChunk> {
    let mut results: Vec<ScoredChunk> = candidates
        .into_iter()
        .map(|chunk| {
            let similarity = cosine_similarity(query_embedding, &chunk.embedding);
            ScoredChunk { chunk, similarity }
        })
        .filter(|r| r.similarity >= min_similarity)
        .collect();

    results.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results.truncate(limit);
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(embedding: Vec<f32>) -> TextChunk {
        TextChunk::new(Uuid::nil(), ChunkSource::Audio, "text".to_string(), embedding)
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);

        assert_eq!(cosine_similarity(&a, &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_rank_chunks_threshold_and_limit() {
        let query = [1.0, 0.0];
        let candidates = vec![
            chunk(vec![1.0, 0.0]),  // 1.0
            chunk(vec![1.0, 1.0]),  // ~0.71
            chunk(vec![0.1, 1.0]),  // ~0.10
            chunk(vec![0.0, 1.0]),  // 0.0
            chunk(vec![1.0, 0.2]),  // ~0.98
        ];

        let ranked = rank_chunks(candidates.clone(), &query, 10, 0.2);
        assert_eq!(ranked.len(), 3);
        assert!(ranked.iter().all(|r| r.similarity >= 0.2));
        assert!(ranked.windows(2).all(|w| w[0].similarity >= w[1].similarity));

        let top_two = rank_chunks(candidates, &query, 2, 0.2);
        assert_eq!(top_two.len(), 2);
        assert!((top_two[0].similarity - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_chunk_source_parse() {
        assert_eq!("audio".parse::<ChunkSource>().unwrap(), ChunkSource::Audio);
        assert_eq!(ChunkSource::File.as_str(), "file");
        assert!("video".parse::<ChunkSource>().is_err());
    }
}
