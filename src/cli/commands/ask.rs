//! Ask command implementation.

use crate::cli::output::content_preview;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::jobs::JobStatus;
use crate::service::RoomService;
use anyhow::Result;
use uuid::Uuid;

/// Run the ask command.
///
/// The question is stored like one asked over HTTP and the background answer
/// job is awaited.
pub async fn run_ask(room_id: Uuid, question: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let service = RoomService::new(settings)?;
    let room = service.get_room(room_id).await?;

    Output::info(&format!(
        "Asking in {}: {}",
        room.name,
        content_preview(question, 80)
    ));
    let spinner = Output::spinner("Searching room content...");

    let created = match service.create_question(room_id, question).await {
        Ok(created) => created,
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to ask question: {}", e));
            return Err(e.into());
        }
    };

    let answered = service.wait_for_answer(room_id, created.id).await?;
    spinner.finish_and_clear();

    println!("\n{}\n", answered.answer.as_deref().unwrap_or_default());

    if let Some(JobStatus::Failed { reason }) = service.question_status(created.id).await {
        Output::warning(&format!("Answer generation failed: {}", reason));
    }

    Ok(())
}
