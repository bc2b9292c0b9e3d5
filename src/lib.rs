//! Lectern - grounded questions about recorded classes
//!
//! A room collects content from two places: audio segments recorded during a
//! class, which are transcribed, and uploaded documents, whose text is
//! extracted. Every piece of content is embedded and stored. Questions asked in
//! a room are answered in the background from the most similar content.
//!
//! # Architecture
//!
//! - `config` - Configuration and prompt templates
//! - `throttle` - Shared rate-limited queue and retry for backend calls
//! - `transcription` - Speech-to-text for audio segments
//! - `extraction` - Text extraction from uploaded files
//! - `embedding` - Embedding generation and caching
//! - `store` - Persistence of rooms, questions and text chunks
//! - `rag` - Retrieval and grounded answer generation
//! - `session` - Per-room recording sessions
//! - `jobs` - Background answer jobs
//! - `service` - Room operations tying the above together
//!
//! # Example
//!
//! ```rust,no_run
//! use lectern::config::Settings;
//! use lectern::service::RoomService;
//! use lectern::store::NewRoom;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let service = RoomService::new(Settings::load()?)?;
//!
//!     let room = service
//!         .create_room(NewRoom {
//!             name: "Biology 101".into(),
//!             description: None,
//!             is_public: false,
//!         })
//!         .await?;
//!     service
//!         .ingest_file(room.id, b"Mitochondria produce ATP.", "text/plain", "notes.txt")
//!         .await?;
//!
//!     let question = service.create_question(room.id, "What do mitochondria do?").await?;
//!     let answered = service.wait_for_answer(room.id, question.id).await?;
//!     println!("{}", answered.answer.unwrap_or_default());
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extraction;
pub mod jobs;
pub mod openai;
pub mod rag;
pub mod service;
pub mod session;
pub mod store;
pub mod throttle;
pub mod transcription;

pub use error::{LecternError, Result};
