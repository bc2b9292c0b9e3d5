//! HTTP API server.
//!
//! Exposes rooms, questions, content ingestion and recording control as REST
//! endpoints for the web client.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{ReplyMessages, Settings};
use crate::error::{LecternError, Result};
use crate::jobs::JobStatus;
use crate::service::RoomService;
use crate::session::{RecordingCommand, RecordingSession, RecordingStatus};
use crate::store::{NewRoom, Question};
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{error, info};
use uuid::Uuid;

type AppState = Arc<RoomService>;

/// Run the HTTP API server.
pub async fn run_serve(
    host: Option<String>,
    port: Option<u16>,
    settings: Settings,
) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Serve) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);

    let service = Arc::new(RoomService::new(settings)?);
    let app = router(Arc::clone(&service))?;

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Lectern API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Rooms", "GET|POST /rooms");
    Output::kv("Room", "GET  /rooms/{room_id}");
    Output::kv("Questions", "GET|POST /rooms/{room_id}/questions");
    Output::kv("Question", "GET  /rooms/{room_id}/questions/{question_id}");
    Output::kv("Audio", "POST /rooms/{room_id}/audio");
    Output::kv("Upload file", "POST /rooms/{room_id}/upload-file");
    Output::kv("Recording", "POST /rooms/{room_id}/recording/{start|pause|resume|stop}");
    Output::kv("Recording status", "GET  /rooms/{room_id}/recording/status");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown signal received");
        })
        .await?;

    info!("Waiting for pending answers");
    service.drain_jobs().await;

    Ok(())
}

/// Build the API router over `service`.
pub fn router(service: Arc<RoomService>) -> Result<Router> {
    let server = &service.settings().server;

    let origin = if server.cors_origin == "*" {
        AllowOrigin::from(Any)
    } else {
        let value = server.cors_origin.parse::<HeaderValue>().map_err(|e| {
            LecternError::Config(format!("Invalid cors_origin {}: {}", server.cors_origin, e))
        })?;
        AllowOrigin::exact(value)
    };
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any);
    let body_limit = DefaultBodyLimit::max(server.max_upload_bytes);

    Ok(Router::new()
        .route("/health", get(health))
        .route("/rooms", get(list_rooms).post(create_room))
        .route("/rooms/{room_id}", get(get_room))
        .route(
            "/rooms/{room_id}/questions",
            get(list_questions).post(create_question),
        )
        .route("/rooms/{room_id}/questions/{question_id}", get(get_question))
        .route("/rooms/{room_id}/audio", post(upload_audio))
        .route("/rooms/{room_id}/upload-file", post(upload_file))
        .route("/rooms/{room_id}/recording/status", get(recording_status))
        .route("/rooms/{room_id}/recording/{action}", post(control_recording))
        .layer(body_limit)
        .layer(cors)
        .with_state(service))
}

// === Request/Response Types ===

#[derive(Serialize)]
struct CreateRoomResponse {
    room_id: Uuid,
}

#[derive(Deserialize)]
struct CreateQuestionRequest {
    question: String,
}

#[derive(Serialize)]
struct CreateQuestionResponse {
    question_id: Uuid,
}

#[derive(Serialize)]
struct QuestionResponse {
    id: Uuid,
    question: String,
    answer: Option<String>,
    created_at: DateTime<Utc>,
    /// pending, running, answered or failed
    status: &'static str,
}

impl QuestionResponse {
    fn new(question: Question, job: Option<JobStatus>) -> Self {
        let status = match job {
            Some(JobStatus::Pending) => "pending",
            Some(JobStatus::Running) => "running",
            Some(JobStatus::Answered) => "answered",
            Some(JobStatus::Failed { .. }) => "failed",
            // Jobs from a previous run are only known through the stored answer.
            None if question.answer.is_some() => "answered",
            None => "pending",
        };
        Self {
            id: question.id,
            question: question.question,
            answer: question.answer,
            created_at: question.created_at,
            status,
        }
    }
}

#[derive(Serialize)]
struct ChunkResponse {
    chunk_id: Uuid,
}

#[derive(Serialize)]
struct FileResponse {
    message: String,
    chunk_id: Uuid,
}

#[derive(Serialize)]
struct RecordingResponse {
    status: RecordingStatus,
    message: &'static str,
}

#[derive(Serialize)]
struct RecordingStatusResponse {
    status: RecordingStatus,
    session: Option<RecordingSession>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Map a service error onto a status code and JSON body.
///
/// Rate-limit and quota errors carry their configured reply message.
fn error_response(messages: &ReplyMessages, e: LecternError) -> Response {
    let (status, message) = if e.is_not_found() {
        (StatusCode::NOT_FOUND, e.to_string())
    } else if e.is_client_error() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if e.is_retryable() {
        (StatusCode::TOO_MANY_REQUESTS, messages.for_error(&e).to_string())
    } else {
        error!("Request failed: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        )
    };

    (status, Json(ErrorResponse { error: message })).into_response()
}

/// An uploaded multipart file.
struct Upload {
    file_name: String,
    content_type: String,
    data: Vec<u8>,
}

/// Read the first file field of a multipart body.
async fn read_upload(multipart: &mut Multipart) -> Result<Option<Upload>> {
    let invalid = |e: axum::extract::multipart::MultipartError| {
        LecternError::InvalidInput(format!("Malformed upload: {}", e.body_text()))
    };

    while let Some(field) = multipart.next_field().await.map_err(invalid)? {
        let is_file = field.file_name().is_some()
            || matches!(field.name(), Some("file") | Some("audio"));
        if !is_file {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field.bytes().await.map_err(invalid)?.to_vec();

        return Ok(Some(Upload {
            file_name,
            content_type,
            data,
        }));
    }

    Ok(None)
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn list_rooms(State(service): State<AppState>) -> Response {
    match service.list_rooms().await {
        Ok(rooms) => Json(rooms).into_response(),
        Err(e) => error_response(service.messages(), e),
    }
}

async fn create_room(State(service): State<AppState>, Json(req): Json<NewRoom>) -> Response {
    match service.create_room(req).await {
        Ok(room) => (
            StatusCode::CREATED,
            Json(CreateRoomResponse { room_id: room.id }),
        )
            .into_response(),
        Err(e) => error_response(service.messages(), e),
    }
}

async fn get_room(State(service): State<AppState>, Path(room_id): Path<Uuid>) -> Response {
    match service.get_room(room_id).await {
        Ok(room) => Json(room).into_response(),
        Err(e) => error_response(service.messages(), e),
    }
}

async fn list_questions(State(service): State<AppState>, Path(room_id): Path<Uuid>) -> Response {
    match service.list_questions(room_id).await {
        Ok(questions) => Json(questions).into_response(),
        Err(e) => error_response(service.messages(), e),
    }
}

async fn create_question(
    State(service): State<AppState>,
    Path(room_id): Path<Uuid>,
    Json(req): Json<CreateQuestionRequest>,
) -> Response {
    match service.create_question(room_id, &req.question).await {
        Ok(question) => (
            StatusCode::CREATED,
            Json(CreateQuestionResponse {
                question_id: question.id,
            }),
        )
            .into_response(),
        Err(e) => error_response(service.messages(), e),
    }
}

async fn get_question(
    State(service): State<AppState>,
    Path((room_id, question_id)): Path<(Uuid, Uuid)>,
) -> Response {
    match service.get_question(room_id, question_id).await {
        Ok(question) => {
            let job = service.question_status(question_id).await;
            Json(QuestionResponse::new(question, job)).into_response()
        }
        Err(e) => error_response(service.messages(), e),
    }
}

async fn upload_audio(
    State(service): State<AppState>,
    Path(room_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Response {
    let upload = match read_upload(&mut multipart).await {
        Ok(upload) => upload,
        Err(e) => return error_response(service.messages(), e),
    };
    // A missing file is reported after the recording check.
    let (data, mime_type) = upload
        .map(|u| (u.data, u.content_type))
        .unwrap_or_default();

    match service.ingest_audio(room_id, data, &mime_type).await {
        Ok(chunk_id) => (StatusCode::CREATED, Json(ChunkResponse { chunk_id })).into_response(),
        Err(e) => error_response(service.messages(), e),
    }
}

async fn upload_file(
    State(service): State<AppState>,
    Path(room_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Response {
    let upload = match read_upload(&mut multipart).await {
        Ok(Some(upload)) => upload,
        Ok(None) => {
            return error_response(
                service.messages(),
                LecternError::InvalidInput("File is required".to_string()),
            )
        }
        Err(e) => return error_response(service.messages(), e),
    };

    match service
        .ingest_file(room_id, &upload.data, &upload.content_type, &upload.file_name)
        .await
    {
        Ok(chunk_id) => (
            StatusCode::CREATED,
            Json(FileResponse {
                message: "File processed successfully".to_string(),
                chunk_id,
            }),
        )
            .into_response(),
        Err(e) => error_response(service.messages(), e),
    }
}

async fn control_recording(
    State(service): State<AppState>,
    Path((room_id, action)): Path<(Uuid, String)>,
) -> Response {
    let Some(command) = RecordingCommand::from_name(&action) else {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Unknown recording action: {}", action),
            }),
        )
            .into_response();
    };

    match service.control_recording(room_id, command).await {
        Ok(session) => Json(RecordingResponse {
            status: session.status,
            message: command.message(),
        })
        .into_response(),
        Err(e) => error_response(service.messages(), e),
    }
}

async fn recording_status(State(service): State<AppState>, Path(room_id): Path<Uuid>) -> Response {
    match service.recording_status(room_id).await {
        Ok((status, session)) => Json(RecordingStatusResponse { status, session }).into_response(),
        Err(e) => error_response(service.messages(), e),
    }
}
