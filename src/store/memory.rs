//! In-memory content store implementation.
//!
//! Useful for testing and throwaway sessions.

use super::{
    rank_chunks, ContentStore, OriginalFile, Question, Room, RoomSummary, ScoredChunk, TextChunk,
};
use crate::error::{LecternError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory content store.
#[derive(Default)]
pub struct MemoryContentStore {
    rooms: RwLock<HashMap<Uuid, Room>>,
    questions: RwLock<HashMap<Uuid, Question>>,
    chunks: RwLock<Vec<TextChunk>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn create_room(&self, room: &Room) -> Result<()> {
        self.rooms.write().await.insert(room.id, room.clone());
        Ok(())
    }

    async fn get_room(&self, room_id: Uuid) -> Result<Option<Room>> {
        Ok(self.rooms.read().await.get(&room_id).cloned())
    }

    async fn list_rooms(&self) -> Result<Vec<RoomSummary>> {
        let rooms = self.rooms.read().await;
        let questions = self.questions.read().await;

        let mut summaries: Vec<RoomSummary> = rooms
            .values()
            .map(|room| RoomSummary {
                id: room.id,
                name: room.name.clone(),
                questions_count: questions.values().filter(|q| q.room_id == room.id).count()
                    as u32,
                created_at: room.created_at,
            })
            .collect();

        summaries.sort_by_key(|r| r.created_at);
        Ok(summaries)
    }

    async fn set_room_file(&self, room_id: Uuid, file: &OriginalFile) -> Result<()> {
        let mut rooms = self.rooms.write().await;
        let room = rooms
            .get_mut(&room_id)
            .ok_or(LecternError::RoomNotFound(room_id))?;
        room.original_file = Some(file.clone());
        Ok(())
    }

    async fn insert_question(&self, question: &Question) -> Result<()> {
        self.questions
            .write()
            .await
            .insert(question.id, question.clone());
        Ok(())
    }

    async fn set_answer(&self, question_id: Uuid, answer: &str) -> Result<()> {
        let mut questions = self.questions.write().await;
        let question = questions
            .get_mut(&question_id)
            .ok_or(LecternError::QuestionNotFound(question_id))?;
        question.answer = Some(answer.to_string());
        Ok(())
    }

    async fn get_question(&self, room_id: Uuid, question_id: Uuid) -> Result<Option<Question>> {
        let questions = self.questions.read().await;
        Ok(questions
            .get(&question_id)
            .filter(|q| q.room_id == room_id)
            .cloned())
    }

    async fn list_questions(&self, room_id: Uuid) -> Result<Vec<Question>> {
        let questions = self.questions.read().await;
        let mut result: Vec<Question> = questions
            .values()
            .filter(|q| q.room_id == room_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn insert_chunk(&self, chunk: &TextChunk) -> Result<()> {
        self.chunks.write().await.push(chunk.clone());
        Ok(())
    }

    async fn search_chunks(
        &self,
        room_id: Uuid,
        query_embedding: &[f32],
        limit: usize,
        min_similarity: f32,
    ) -> Result<Vec<ScoredChunk>> {
        let chunks = self.chunks.read().await;
        let candidates = chunks.iter().filter(|c| c.room_id == room_id).cloned();
        Ok(rank_chunks(candidates, query_embedding, limit, min_similarity))
    }

    async fn chunk_count(&self, room_id: Uuid) -> Result<usize> {
        let chunks = self.chunks.read().await;
        Ok(chunks.iter().filter(|c| c.room_id == room_id).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ChunkSource, NewRoom};

    fn room(name: &str) -> Room {
        Room::new(NewRoom {
            name: name.to_string(),
            description: None,
            is_public: false,
        })
    }

    #[tokio::test]
    async fn test_memory_content_store() {
        let store = MemoryContentStore::new();
        let physics = room("Physics");
        let history = room("History");
        store.create_room(&physics).await.unwrap();
        store.create_room(&history).await.unwrap();

        let question = Question::new(physics.id, "What is inertia?".to_string());
        store.insert_question(&question).await.unwrap();

        let rooms = store.list_rooms().await.unwrap();
        assert_eq!(rooms.len(), 2);
        let physics_summary = rooms.iter().find(|r| r.id == physics.id).unwrap();
        assert_eq!(physics_summary.questions_count, 1);

        store.set_answer(question.id, "Resistance to change in motion.").await.unwrap();
        let stored = store.get_question(physics.id, question.id).await.unwrap().unwrap();
        assert_eq!(stored.answer.as_deref(), Some("Resistance to change in motion."));

        // A question is only visible inside its own room
        assert!(store.get_question(history.id, question.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_is_scoped_to_room() {
        let store = MemoryContentStore::new();
        let a = room("A");
        let b = room("B");

        store
            .insert_chunk(&TextChunk::new(a.id, ChunkSource::Audio, "a".into(), vec![1.0, 0.0]))
            .await
            .unwrap();
        store
            .insert_chunk(&TextChunk::new(b.id, ChunkSource::Audio, "b".into(), vec![1.0, 0.0]))
            .await
            .unwrap();

        let results = store.search_chunks(a.id, &[1.0, 0.0], 10, 0.2).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.text, "a");
        assert_eq!(store.chunk_count(b.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_missing_rows() {
        let store = MemoryContentStore::new();
        let missing = Uuid::new_v4();

        assert!(matches!(
            store.set_answer(missing, "x").await,
            Err(LecternError::QuestionNotFound(_))
        ));
        let file = OriginalFile {
            name: "notes.txt".into(),
            file_type: "txt".into(),
            content: "hi".into(),
        };
        assert!(matches!(
            store.set_room_file(missing, &file).await,
            Err(LecternError::RoomNotFound(_))
        ));
    }
}
