//! SQLite-based content store implementation.
//!
//! Embeddings are stored as little-endian f32 blobs and cosine similarity is
//! computed in Rust over a room's chunks.

use super::{
    rank_chunks, ContentStore, OriginalFile, Question, Room, RoomSummary, ScoredChunk, TextChunk,
};
use crate::error::{LecternError, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};
use uuid::Uuid;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS rooms (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT,
        is_public INTEGER NOT NULL DEFAULT 0,
        original_file_name TEXT,
        original_file_type TEXT,
        original_file_content TEXT,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS questions (
        id TEXT PRIMARY KEY,
        room_id TEXT NOT NULL REFERENCES rooms(id),
        question TEXT NOT NULL,
        answer TEXT,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_questions_room_id ON questions(room_id);

    CREATE TABLE IF NOT EXISTS text_chunks (
        id TEXT PRIMARY KEY,
        room_id TEXT NOT NULL REFERENCES rooms(id),
        source TEXT NOT NULL,
        text TEXT NOT NULL,
        embedding BLOB NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_text_chunks_room_id ON text_chunks(room_id);
"#;

/// SQLite-based content store.
pub struct SqliteContentStore {
    conn: Mutex<Connection>,
}

impl SqliteContentStore {
    /// Open (or create) a store at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::init(&conn)?;

        info!("Initialized SQLite content store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init(conn: &Connection) -> Result<()> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| LecternError::Store(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn format_timestamp(ts: &DateTime<Utc>) -> String {
        // Fixed width so text ordering matches time ordering.
        ts.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn parse_timestamp(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn parse_id(value: &str) -> Uuid {
        Uuid::parse_str(value).unwrap_or_default()
    }

    fn row_to_room(row: &Row<'_>) -> rusqlite::Result<Room> {
        let id: String = row.get(0)?;
        let file_name: Option<String> = row.get(4)?;
        let file_type: Option<String> = row.get(5)?;
        let file_content: Option<String> = row.get(6)?;
        let created_at: String = row.get(7)?;

        let original_file = match (file_name, file_type, file_content) {
            (Some(name), Some(file_type), Some(content)) => Some(OriginalFile {
                name,
                file_type,
                content,
            }),
            _ => None,
        };

        Ok(Room {
            id: Self::parse_id(&id),
            name: row.get(1)?,
            description: row.get(2)?,
            is_public: row.get(3)?,
            original_file,
            created_at: Self::parse_timestamp(&created_at),
        })
    }

    fn row_to_question(row: &Row<'_>) -> rusqlite::Result<Question> {
        let id: String = row.get(0)?;
        let room_id: String = row.get(1)?;
        let created_at: String = row.get(4)?;

        Ok(Question {
            id: Self::parse_id(&id),
            room_id: Self::parse_id(&room_id),
            question: row.get(2)?,
            answer: row.get(3)?,
            created_at: Self::parse_timestamp(&created_at),
        })
    }

    fn row_to_chunk(row: &Row<'_>) -> rusqlite::Result<TextChunk> {
        let id: String = row.get(0)?;
        let room_id: String = row.get(1)?;
        let source: String = row.get(2)?;
        let embedding_bytes: Vec<u8> = row.get(4)?;
        let created_at: String = row.get(5)?;

        let source = source.parse().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                e.into(),
            )
        })?;

        Ok(TextChunk {
            id: Self::parse_id(&id),
            room_id: Self::parse_id(&room_id),
            source,
            text: row.get(3)?,
            embedding: Self::bytes_to_embedding(&embedding_bytes),
            created_at: Self::parse_timestamp(&created_at),
        })
    }
}

#[async_trait]
impl ContentStore for SqliteContentStore {
    #[instrument(skip(self, room), fields(room_id = %room.id))]
    async fn create_room(&self, room: &Room) -> Result<()> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO rooms
            (id, name, description, is_public, original_file_name, original_file_type,
             original_file_content, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                room.id.to_string(),
                room.name,
                room.description,
                room.is_public,
                room.original_file.as_ref().map(|f| f.name.as_str()),
                room.original_file.as_ref().map(|f| f.file_type.as_str()),
                room.original_file.as_ref().map(|f| f.content.as_str()),
                Self::format_timestamp(&room.created_at),
            ],
        )?;

        debug!("Created room {}", room.id);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_room(&self, room_id: Uuid) -> Result<Option<Room>> {
        let conn = self.conn()?;

        let room = conn
            .query_row(
                r#"
                SELECT id, name, description, is_public, original_file_name,
                       original_file_type, original_file_content, created_at
                FROM rooms
                WHERE id = ?1
                "#,
                params![room_id.to_string()],
                Self::row_to_room,
            )
            .optional()?;

        Ok(room)
    }

    #[instrument(skip(self))]
    async fn list_rooms(&self) -> Result<Vec<RoomSummary>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT r.id, r.name, COUNT(q.id) AS questions_count, r.created_at
            FROM rooms r
            LEFT JOIN questions q ON q.room_id = r.id
            GROUP BY r.id, r.name
            ORDER BY r.created_at
            "#,
        )?;

        let rooms = stmt.query_map([], |row| {
            let id: String = row.get(0)?;
            let created_at: String = row.get(3)?;
            Ok(RoomSummary {
                id: Self::parse_id(&id),
                name: row.get(1)?,
                questions_count: row.get(2)?,
                created_at: Self::parse_timestamp(&created_at),
            })
        })?;

        let result = rooms.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(result)
    }

    #[instrument(skip(self, file), fields(file_name = %file.name))]
    async fn set_room_file(&self, room_id: Uuid, file: &OriginalFile) -> Result<()> {
        let conn = self.conn()?;

        let updated = conn.execute(
            r#"
            UPDATE rooms
            SET original_file_name = ?2, original_file_type = ?3, original_file_content = ?4
            WHERE id = ?1
            "#,
            params![room_id.to_string(), file.name, file.file_type, file.content],
        )?;

        if updated == 0 {
            return Err(LecternError::RoomNotFound(room_id));
        }
        Ok(())
    }

    #[instrument(skip(self, question), fields(question_id = %question.id))]
    async fn insert_question(&self, question: &Question) -> Result<()> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO questions (id, room_id, question, answer, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                question.id.to_string(),
                question.room_id.to_string(),
                question.question,
                question.answer,
                Self::format_timestamp(&question.created_at),
            ],
        )?;

        Ok(())
    }

    #[instrument(skip(self, answer))]
    async fn set_answer(&self, question_id: Uuid, answer: &str) -> Result<()> {
        let conn = self.conn()?;

        let updated = conn.execute(
            "UPDATE questions SET answer = ?2 WHERE id = ?1",
            params![question_id.to_string(), answer],
        )?;

        if updated == 0 {
            return Err(LecternError::QuestionNotFound(question_id));
        }

        debug!("Stored answer for question {}", question_id);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_question(&self, room_id: Uuid, question_id: Uuid) -> Result<Option<Question>> {
        let conn = self.conn()?;

        let question = conn
            .query_row(
                r#"
                SELECT id, room_id, question, answer, created_at
                FROM questions
                WHERE room_id = ?1 AND id = ?2
                "#,
                params![room_id.to_string(), question_id.to_string()],
                Self::row_to_question,
            )
            .optional()?;

        Ok(question)
    }

    #[instrument(skip(self))]
    async fn list_questions(&self, room_id: Uuid) -> Result<Vec<Question>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, room_id, question, answer, created_at
            FROM questions
            WHERE room_id = ?1
            ORDER BY created_at DESC
            "#,
        )?;

        let questions = stmt.query_map(params![room_id.to_string()], Self::row_to_question)?;
        let result = questions.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(result)
    }

    #[instrument(skip(self, chunk), fields(chunk_id = %chunk.id, room_id = %chunk.room_id))]
    async fn insert_chunk(&self, chunk: &TextChunk) -> Result<()> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO text_chunks (id, room_id, source, text, embedding, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                chunk.id.to_string(),
                chunk.room_id.to_string(),
                chunk.source.as_str(),
                chunk.text,
                Self::embedding_to_bytes(&chunk.embedding),
                Self::format_timestamp(&chunk.created_at),
            ],
        )?;

        debug!("Inserted chunk {}", chunk.id);
        Ok(())
    }

    #[instrument(skip(self, query_embedding))]
    async fn search_chunks(
        &self,
        room_id: Uuid,
        query_embedding: &[f32],
        limit: usize,
        min_similarity: f32,
    ) -> Result<Vec<ScoredChunk>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, room_id, source, text, embedding, created_at
            FROM text_chunks
            WHERE room_id = ?1
            "#,
        )?;

        let chunks = stmt
            .query_map(params![room_id.to_string()], Self::row_to_chunk)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let results = rank_chunks(chunks, query_embedding, limit, min_similarity);

        debug!("Found {} matching chunks", results.len());
        Ok(results)
    }

    async fn chunk_count(&self, room_id: Uuid) -> Result<usize> {
        let conn = self.conn()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM text_chunks WHERE room_id = ?1",
            params![room_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ChunkSource, NewRoom};

    fn new_room(name: &str) -> Room {
        Room::new(NewRoom {
            name: name.to_string(),
            description: Some("Weekly lectures".to_string()),
            is_public: true,
        })
    }

    #[tokio::test]
    async fn test_sqlite_content_store() {
        let store = SqliteContentStore::in_memory().unwrap();
        let room = new_room("Chemistry");
        store.create_room(&room).await.unwrap();

        let loaded = store.get_room(room.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Chemistry");
        assert!(loaded.is_public);
        assert!(loaded.original_file.is_none());

        let chunk = TextChunk::new(
            room.id,
            ChunkSource::Audio,
            "Covalent bonds share electrons".to_string(),
            vec![1.0, 0.0, 0.0],
        );
        store.insert_chunk(&chunk).await.unwrap();

        let results = store.search_chunks(room.id, &[1.0, 0.0, 0.0], 10, 0.2).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!((results[0].similarity - 1.0).abs() < 0.001);
        assert_eq!(results[0].chunk.source, ChunkSource::Audio);
        assert_eq!(results[0].chunk.embedding, vec![1.0, 0.0, 0.0]);

        let unrelated = store.search_chunks(room.id, &[0.0, 1.0, 0.0], 10, 0.2).await.unwrap();
        assert!(unrelated.is_empty());
    }

    #[tokio::test]
    async fn test_questions_and_answers() {
        let store = SqliteContentStore::in_memory().unwrap();
        let room = new_room("Biology");
        store.create_room(&room).await.unwrap();

        let first = Question::new(room.id, "What is a cell?".to_string());
        store.insert_question(&first).await.unwrap();
        let second = Question::new(room.id, "What is DNA?".to_string());
        store.insert_question(&second).await.unwrap();

        let listed = store.list_questions(room.id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);

        store.set_answer(first.id, "The basic unit of life.").await.unwrap();
        let answered = store.get_question(room.id, first.id).await.unwrap().unwrap();
        assert_eq!(answered.answer.as_deref(), Some("The basic unit of life."));

        let rooms = store.list_rooms().await.unwrap();
        assert_eq!(rooms[0].questions_count, 2);

        assert!(matches!(
            store.set_answer(Uuid::new_v4(), "orphan").await,
            Err(LecternError::QuestionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_room_file_persists_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lectern.db");
        let room = new_room("Literature");

        {
            let store = SqliteContentStore::new(&path).unwrap();
            store.create_room(&room).await.unwrap();
            store
                .set_room_file(
                    room.id,
                    &OriginalFile {
                        name: "syllabus.txt".to_string(),
                        file_type: "txt".to_string(),
                        content: "Week 1: Poetry".to_string(),
                    },
                )
                .await
                .unwrap();
        }

        let reopened = SqliteContentStore::new(&path).unwrap();
        let loaded = reopened.get_room(room.id).await.unwrap().unwrap();
        let file = loaded.original_file.unwrap();
        assert_eq!(file.name, "syllabus.txt");
        assert_eq!(file.content, "Week 1: Poetry");

        assert!(matches!(
            reopened.set_room_file(Uuid::new_v4(), &file).await,
            Err(LecternError::RoomNotFound(_))
        ));
    }
}
