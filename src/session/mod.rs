//! Per-room recording sessions.
//!
//! Sessions live only in process memory and are replaced wholesale on every
//! control call. Audio segments are only accepted while a room is recording.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

/// Recording state of a room.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingStatus {
    Recording,
    Paused,
    #[default]
    Stopped,
}

impl RecordingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordingStatus::Recording => "recording",
            RecordingStatus::Paused => "paused",
            RecordingStatus::Stopped => "stopped",
        }
    }
}

/// Control call issued against a room's recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingCommand {
    Start,
    Pause,
    Resume,
    Stop,
}

impl RecordingCommand {
    /// Parse the command segment of a control route.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "start" => Some(RecordingCommand::Start),
            "pause" => Some(RecordingCommand::Pause),
            "resume" => Some(RecordingCommand::Resume),
            "stop" => Some(RecordingCommand::Stop),
            _ => None,
        }
    }

    /// Status a room is in after this command.
    pub fn target(&self) -> RecordingStatus {
        match self {
            RecordingCommand::Start | RecordingCommand::Resume => RecordingStatus::Recording,
            RecordingCommand::Pause => RecordingStatus::Paused,
            RecordingCommand::Stop => RecordingStatus::Stopped,
        }
    }

    /// Whether the command follows the state graph from `from`.
    pub fn is_valid_from(&self, from: RecordingStatus) -> bool {
        matches!(
            (from, self),
            (RecordingStatus::Stopped, RecordingCommand::Start)
                | (RecordingStatus::Recording, RecordingCommand::Pause)
                | (RecordingStatus::Paused, RecordingCommand::Resume)
                | (RecordingStatus::Recording, RecordingCommand::Stop)
                | (RecordingStatus::Paused, RecordingCommand::Stop)
        )
    }

    /// Human-readable confirmation for the control response.
    pub fn message(&self) -> &'static str {
        match self {
            RecordingCommand::Start => "Recording started",
            RecordingCommand::Pause => "Recording paused",
            RecordingCommand::Resume => "Recording resumed",
            RecordingCommand::Stop => "Recording stopped",
        }
    }
}

/// Snapshot of one room's recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingSession {
    pub status: RecordingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paused_at: Option<DateTime<Utc>>,
}

impl RecordingSession {
    fn after(command: RecordingCommand, now: DateTime<Utc>) -> Self {
        let (started_at, paused_at) = match command {
            RecordingCommand::Start | RecordingCommand::Resume => (Some(now), None),
            RecordingCommand::Pause => (None, Some(now)),
            RecordingCommand::Stop => (None, None),
        };
        Self {
            status: command.target(),
            started_at,
            paused_at,
        }
    }
}

/// Recording sessions keyed by room.
#[derive(Default)]
pub struct RecordingSessions {
    sessions: RwLock<HashMap<Uuid, RecordingSession>>,
}

impl RecordingSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a control command, replacing the room's session.
    ///
    /// Every command is accepted. Commands outside the state graph (for
    /// example pausing a stopped room) still overwrite the session and are
    /// logged.
    pub async fn apply(&self, room_id: Uuid, command: RecordingCommand) -> RecordingSession {
        let mut sessions = self.sessions.write().await;
        let from = sessions.get(&room_id).map(|s| s.status).unwrap_or_default();

        if !command.is_valid_from(from) {
            warn!(
                "Recording {:?} for room {} while {}; overwriting session",
                command,
                room_id,
                from.as_str()
            );
        }

        let session = RecordingSession::after(command, Utc::now());
        sessions.insert(room_id, session.clone());
        info!("Room {} recording is now {}", room_id, session.status.as_str());
        session
    }

    /// Current status, `Stopped` when the room never had a session.
    pub async fn status(&self, room_id: Uuid) -> RecordingStatus {
        self.sessions
            .read()
            .await
            .get(&room_id)
            .map(|s| s.status)
            .unwrap_or_default()
    }

    pub async fn get(&self, room_id: Uuid) -> Option<RecordingSession> {
        self.sessions.read().await.get(&room_id).cloned()
    }

    pub async fn is_recording(&self, room_id: Uuid) -> bool {
        self.status(room_id).await == RecordingStatus::Recording
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_graph() {
        use RecordingCommand::*;
        use RecordingStatus::*;

        assert!(Start.is_valid_from(Stopped));
        assert!(Pause.is_valid_from(Recording));
        assert!(Resume.is_valid_from(Paused));
        assert!(Stop.is_valid_from(Recording));
        assert!(Stop.is_valid_from(Paused));

        assert!(!Pause.is_valid_from(Stopped));
        assert!(!Resume.is_valid_from(Recording));
        assert!(!Start.is_valid_from(Recording));
    }

    #[test]
    fn test_command_names() {
        assert_eq!(RecordingCommand::from_name("pause"), Some(RecordingCommand::Pause));
        assert_eq!(RecordingCommand::from_name("rewind"), None);
    }

    #[tokio::test]
    async fn test_full_cycle() {
        let sessions = RecordingSessions::new();
        let room = Uuid::new_v4();

        assert_eq!(sessions.status(room).await, RecordingStatus::Stopped);
        assert!(sessions.get(room).await.is_none());

        let started = sessions.apply(room, RecordingCommand::Start).await;
        assert_eq!(started.status, RecordingStatus::Recording);
        assert!(started.started_at.is_some());
        assert!(sessions.is_recording(room).await);

        let paused = sessions.apply(room, RecordingCommand::Pause).await;
        assert_eq!(paused.status, RecordingStatus::Paused);
        assert!(paused.paused_at.is_some());
        assert!(!sessions.is_recording(room).await);

        sessions.apply(room, RecordingCommand::Resume).await;
        assert!(sessions.is_recording(room).await);

        let stopped = sessions.apply(room, RecordingCommand::Stop).await;
        assert_eq!(stopped.status, RecordingStatus::Stopped);
        assert_eq!(stopped.started_at, None);
        assert_eq!(sessions.status(room).await, RecordingStatus::Stopped);
    }

    #[tokio::test]
    async fn test_pause_from_stopped_overwrites() {
        let sessions = RecordingSessions::new();
        let room = Uuid::new_v4();

        let session = sessions.apply(room, RecordingCommand::Pause).await;
        assert_eq!(session.status, RecordingStatus::Paused);
        assert_eq!(sessions.status(room).await, RecordingStatus::Paused);
    }

    #[tokio::test]
    async fn test_rooms_are_independent() {
        let sessions = RecordingSessions::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        sessions.apply(a, RecordingCommand::Start).await;
        assert!(sessions.is_recording(a).await);
        assert!(!sessions.is_recording(b).await);
    }

    #[test]
    fn test_session_serialization() {
        let session = RecordingSession {
            status: RecordingStatus::Stopped,
            started_at: None,
            paused_at: None,
        };
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "stopped" }));
    }
}
