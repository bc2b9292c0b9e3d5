//! Room management commands.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::service::RoomService;
use crate::store::NewRoom;
use anyhow::Result;

/// List rooms with their question counts.
pub async fn run_rooms(settings: Settings) -> Result<()> {
    preflight::check(Operation::Rooms)?;
    let service = RoomService::new(settings)?;

    match service.list_rooms().await {
        Ok(rooms) => {
            if rooms.is_empty() {
                Output::info("No rooms yet. Use 'lectern create-room <name>' to add one.");
            } else {
                Output::header(&format!("Rooms ({})", rooms.len()));
                println!();

                for room in &rooms {
                    Output::room_info(
                        &room.name,
                        &room.id.to_string(),
                        room.questions_count,
                        &room.created_at.format("%Y-%m-%d %H:%M").to_string(),
                    );
                }

                let total_questions: u32 = rooms.iter().map(|r| r.questions_count).sum();
                println!();
                Output::kv("Total rooms", &rooms.len().to_string());
                Output::kv("Total questions", &total_questions.to_string());
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to list rooms: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}

/// Create a room and print its id.
pub async fn run_create_room(
    name: &str,
    description: Option<String>,
    public: bool,
    settings: Settings,
) -> Result<()> {
    preflight::check(Operation::Rooms)?;
    let service = RoomService::new(settings)?;

    let room = service
        .create_room(NewRoom {
            name: name.to_string(),
            description,
            is_public: public,
        })
        .await?;

    Output::success(&format!("Created room {}", room.name));
    Output::kv("ID", &room.id.to_string());
    if let Some(description) = &room.description {
        Output::kv("Description", description);
    }
    Output::kv("Public", if room.is_public { "yes" } else { "no" });

    Ok(())
}
