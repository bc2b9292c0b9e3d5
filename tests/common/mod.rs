//! Fake backends shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use lectern::config::{Prompts, Settings};
use lectern::embedding::Embedder;
use lectern::rag::TextGenerator;
use lectern::service::RoomService;
use lectern::store::{MemoryContentStore, NewRoom, Room};
use lectern::transcription::{AudioPayload, Transcriber};
use lectern::Result;
use std::sync::{Arc, Mutex};

pub const DIMENSIONS: usize = 64;

/// "Transcribes" audio by reading its bytes as UTF-8 text.
pub struct ScriptTranscriber;

#[async_trait]
impl Transcriber for ScriptTranscriber {
    async fn transcribe(&self, audio: &AudioPayload) -> Result<String> {
        Ok(String::from_utf8_lossy(&audio.data).trim().to_string())
    }
}

/// Bag-of-words embedder: texts sharing words point in similar directions.
pub struct KeywordEmbedder;

impl KeywordEmbedder {
    fn bucket(word: &str) -> usize {
        word.bytes()
            .fold(7usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize))
            % DIMENSIONS
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0; DIMENSIONS];
        for word in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 3)
        {
            vector[Self::bucket(word)] += 1.0;
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }
}

/// Records every prompt and replies with a fixed answer.
#[derive(Default)]
pub struct RecordingGenerator {
    prompts: Mutex<Vec<String>>,
}

impl RecordingGenerator {
    pub const ANSWER: &'static str = "Mitochondria produce ATP, the cell's energy currency.";

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for RecordingGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(Self::ANSWER.to_string())
    }
}

/// A service over the in-memory store and fake backends.
pub fn test_service() -> (Arc<RoomService>, Arc<RecordingGenerator>) {
    let generator = Arc::new(RecordingGenerator::default());
    let service = RoomService::with_components(
        Settings::default(),
        Prompts::default(),
        Arc::new(MemoryContentStore::new()),
        Arc::new(ScriptTranscriber),
        Arc::new(KeywordEmbedder),
        generator.clone(),
    );
    (Arc::new(service), generator)
}

pub async fn biology_room(service: &RoomService) -> Room {
    service
        .create_room(NewRoom {
            name: "Biology 101".into(),
            description: Some("Cell biology lectures".into()),
            is_public: true,
        })
        .await
        .unwrap()
}
