//! Room service for Lectern.
//!
//! Coordinates rooms, content ingestion (audio segments and uploaded files),
//! recording sessions and the background answer pipeline.

use crate::config::{Prompts, ReplyMessages, Settings};
use crate::embedding::{CachedEmbedder, Embedder, OpenAIEmbedder};
use crate::error::{LecternError, Result};
use crate::extraction::extract_text;
use crate::jobs::{AnswerJobs, JobStatus};
use crate::openai::create_client_with_timeout;
use crate::rag::{AnswerGenerator, OpenAIGenerator, Retriever, TextGenerator};
use crate::session::{RecordingCommand, RecordingSession, RecordingSessions, RecordingStatus};
use crate::store::{
    ChunkSource, ContentStore, MemoryContentStore, NewRoom, OriginalFile, Question, Room,
    RoomSummary, SqliteContentStore, TextChunk,
};
use crate::throttle::ApiGate;
use crate::transcription::{AudioPayload, OpenAITranscriber, Transcriber};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Retrieval and generation for one question, shared with background jobs.
struct AnswerPipeline {
    store: Arc<dyn ContentStore>,
    retriever: Retriever,
    answerer: AnswerGenerator,
    max_chunks: usize,
}

impl AnswerPipeline {
    fn messages(&self) -> &ReplyMessages {
        &self.answerer.prompts().messages
    }

    /// Answer text for `question`, without persisting it.
    ///
    /// A room with no relevant content gets the fixed insufficient-context reply
    /// and the generator is not called.
    async fn resolve(&self, room_id: Uuid, question: &str) -> Result<String> {
        let chunks = self
            .retriever
            .find_relevant(question, room_id, self.max_chunks)
            .await?;

        if chunks.is_empty() {
            info!("No relevant content in room {}", room_id);
            return Ok(self.messages().insufficient_context.clone());
        }

        self.answerer.generate_answer(question, &chunks).await
    }

    /// Resolve and store the answer of `question`.
    ///
    /// On failure a user-facing message is stored instead and the original
    /// error is returned.
    async fn answer(&self, question: &Question) -> Result<()> {
        match self.resolve(question.room_id, &question.question).await {
            Ok(answer) => {
                self.store.set_answer(question.id, &answer).await?;
                info!("Answered question {}", question.id);
                Ok(())
            }
            Err(e) => {
                let message = self.messages().for_error(&e);
                self.store.set_answer(question.id, message).await?;
                Err(e)
            }
        }
    }
}

/// The main entry point for room operations.
pub struct RoomService {
    settings: Settings,
    store: Arc<dyn ContentStore>,
    transcriber: Arc<dyn Transcriber>,
    embedder: Arc<dyn Embedder>,
    pipeline: Arc<AnswerPipeline>,
    sessions: RecordingSessions,
    jobs: AnswerJobs,
}

impl RoomService {
    /// Create a service backed by OpenAI and the configured store.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let client = create_client_with_timeout(Duration::from_secs(
            settings.backend.request_timeout_secs,
        ))?;
        // One gate for every backend call, so all rooms share the rate limit.
        let gate = Arc::new(ApiGate::from_settings(&settings.throttle));

        let transcriber: Arc<dyn Transcriber> = Arc::new(OpenAITranscriber::new(
            client.clone(),
            Arc::clone(&gate),
            &settings.backend.transcription_model,
            &prompts.transcription.instructions,
        ));

        let embedder: Arc<dyn Embedder> = Arc::new(CachedEmbedder::new(OpenAIEmbedder::new(
            client.clone(),
            Arc::clone(&gate),
            &settings.backend.embedding_model,
            settings.backend.embedding_dimensions as usize,
        )));

        let generator: Arc<dyn TextGenerator> = Arc::new(OpenAIGenerator::new(
            client,
            gate,
            &settings.backend.generation_model,
            settings.backend.temperature,
        ));

        let store = Self::open_store(&settings)?;

        info!(
            "Using {} for transcription, {} for embeddings, {} for answers",
            settings.backend.transcription_model,
            settings.backend.embedding_model,
            settings.backend.generation_model
        );

        Ok(Self::with_components(
            settings,
            prompts,
            store,
            transcriber,
            embedder,
            generator,
        ))
    }

    /// Create a service with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        store: Arc<dyn ContentStore>,
        transcriber: Arc<dyn Transcriber>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        let retriever = Retriever::new(Arc::clone(&store), Arc::clone(&embedder))
            .with_min_similarity(settings.retrieval.min_similarity);

        let pipeline = Arc::new(AnswerPipeline {
            store: Arc::clone(&store),
            retriever,
            answerer: AnswerGenerator::new(generator, prompts),
            max_chunks: settings.retrieval.max_chunks,
        });

        Self {
            settings,
            store,
            transcriber,
            embedder,
            pipeline,
            sessions: RecordingSessions::new(),
            jobs: AnswerJobs::new(),
        }
    }

    fn open_store(settings: &Settings) -> Result<Arc<dyn ContentStore>> {
        match settings.store.provider.as_str() {
            "sqlite" => Ok(Arc::new(SqliteContentStore::new(&settings.sqlite_path())?)),
            "memory" => {
                warn!("Using in-memory store; content is lost on restart");
                Ok(Arc::new(MemoryContentStore::new()))
            }
            other => Err(LecternError::Config(format!(
                "Unknown store provider: {} (expected sqlite or memory)",
                other
            ))),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> Arc<dyn ContentStore> {
        Arc::clone(&self.store)
    }

    /// Fixed user-facing replies.
    pub fn messages(&self) -> &ReplyMessages {
        self.pipeline.messages()
    }

    async fn require_room(&self, room_id: Uuid) -> Result<Room> {
        self.store
            .get_room(room_id)
            .await?
            .ok_or(LecternError::RoomNotFound(room_id))
    }

    // Rooms

    #[instrument(skip_all, fields(name = %new_room.name))]
    pub async fn create_room(&self, new_room: NewRoom) -> Result<Room> {
        let name = new_room.name.trim().to_string();
        if name.is_empty() {
            return Err(LecternError::InvalidInput("Room name is required".to_string()));
        }

        let room = Room::new(NewRoom { name, ..new_room });
        self.store.create_room(&room).await?;
        info!("Created room {} ({})", room.name, room.id);
        Ok(room)
    }

    pub async fn list_rooms(&self) -> Result<Vec<RoomSummary>> {
        self.store.list_rooms().await
    }

    pub async fn get_room(&self, room_id: Uuid) -> Result<Room> {
        self.require_room(room_id).await
    }

    // Questions

    /// Record a question and start answering it in the background.
    ///
    /// Returns as soon as the question is stored; its answer is filled in later.
    #[instrument(skip(self, text))]
    pub async fn create_question(&self, room_id: Uuid, text: &str) -> Result<Question> {
        let text = text.trim();
        if text.is_empty() {
            return Err(LecternError::InvalidInput("Question is required".to_string()));
        }
        self.require_room(room_id).await?;

        let question = Question::new(room_id, text.to_string());
        self.store.insert_question(&question).await?;
        info!("Created question {} in room {}", question.id, room_id);

        let pipeline = Arc::clone(&self.pipeline);
        let pending = question.clone();
        self.jobs
            .spawn(question.id, async move { pipeline.answer(&pending).await })
            .await;

        Ok(question)
    }

    pub async fn get_question(&self, room_id: Uuid, question_id: Uuid) -> Result<Question> {
        self.require_room(room_id).await?;
        self.store
            .get_question(room_id, question_id)
            .await?
            .ok_or(LecternError::QuestionNotFound(question_id))
    }

    pub async fn list_questions(&self, room_id: Uuid) -> Result<Vec<Question>> {
        self.require_room(room_id).await?;
        self.store.list_questions(room_id).await
    }

    /// Status of the background job answering `question_id`.
    pub async fn question_status(&self, question_id: Uuid) -> Option<JobStatus> {
        self.jobs.status(question_id).await
    }

    /// Wait for the answer job of a question and return the stored question.
    pub async fn wait_for_answer(&self, room_id: Uuid, question_id: Uuid) -> Result<Question> {
        self.jobs.wait(question_id).await;
        self.get_question(room_id, question_id).await
    }

    /// Wait for every outstanding answer job.
    pub async fn drain_jobs(&self) {
        self.jobs.drain().await;
    }

    /// Answer a question directly, without storing it.
    pub async fn resolve_answer(&self, room_id: Uuid, question: &str) -> Result<String> {
        self.require_room(room_id).await?;
        self.pipeline.resolve(room_id, question).await
    }

    // Ingestion

    /// Transcribe an audio segment and store it as a chunk of the room.
    ///
    /// Only accepted while the room is recording.
    #[instrument(skip(self, data), fields(bytes = data.len()))]
    pub async fn ingest_audio(&self, room_id: Uuid, data: Vec<u8>, mime_type: &str) -> Result<Uuid> {
        self.require_room(room_id).await?;
        if !self.sessions.is_recording(room_id).await {
            return Err(LecternError::RecordingInactive(room_id));
        }

        let audio = AudioPayload::new(data, mime_type)?;
        let transcription = self.transcriber.transcribe(&audio).await?;
        let embedding = self.embedder.embed(&transcription).await?;

        let chunk = TextChunk::new(room_id, ChunkSource::Audio, transcription, embedding);
        self.store.insert_chunk(&chunk).await?;

        info!("Stored audio chunk {} ({} chars)", chunk.id, chunk.text.len());
        Ok(chunk.id)
    }

    /// Extract an uploaded file and store it as a chunk of the room.
    ///
    /// The file's name, type and text are also recorded on the room.
    #[instrument(skip(self, data), fields(bytes = data.len()))]
    pub async fn ingest_file(
        &self,
        room_id: Uuid,
        data: &[u8],
        mime_type: &str,
        file_name: &str,
    ) -> Result<Uuid> {
        self.require_room(room_id).await?;

        let extracted = extract_text(data, mime_type, file_name)?;
        let embedding = self.embedder.embed(&extracted.content).await?;

        let chunk = TextChunk::new(
            room_id,
            ChunkSource::File,
            extracted.content.clone(),
            embedding,
        );
        self.store.insert_chunk(&chunk).await?;

        self.store
            .set_room_file(
                room_id,
                &OriginalFile {
                    name: extracted.file_name,
                    file_type: extracted.kind.tag().to_string(),
                    content: extracted.content,
                },
            )
            .await?;

        info!("Stored file chunk {} from {}", chunk.id, file_name);
        Ok(chunk.id)
    }

    // Recording

    pub async fn control_recording(
        &self,
        room_id: Uuid,
        command: RecordingCommand,
    ) -> Result<RecordingSession> {
        self.require_room(room_id).await?;
        Ok(self.sessions.apply(room_id, command).await)
    }

    /// Current status and session of a room's recording.
    pub async fn recording_status(
        &self,
        room_id: Uuid,
    ) -> Result<(RecordingStatus, Option<RecordingSession>)> {
        self.require_room(room_id).await?;
        let session = self.sessions.get(room_id).await;
        let status = session.as_ref().map(|s| s.status).unwrap_or_default();
        Ok((status, session))
    }
}
