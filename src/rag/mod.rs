//! RAG (Retrieval-Augmented Generation) for answering questions about a room.
//!
//! [`Retriever`] finds the room's chunks closest to a question and
//! [`AnswerGenerator`] turns the question plus those chunks into a grounded
//! answer.

mod answer;
mod generator;
mod retrieval;

pub use answer::AnswerGenerator;
pub use generator::{OpenAIGenerator, TextGenerator};
pub use retrieval::{Retriever, DEFAULT_MIN_SIMILARITY};
