use super::state::AppState;
use crate::auth::LoginOutcome;
use crate::session::{AnswerSlot, EngineHandle, Phase, StatusView};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub full_name: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub full_name: String,
    /// One-time password; consumed on first login.
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub full_name: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusView>,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    /// "reading", "listening", "writing1" or "writing2".
    pub section: String,
    /// 0-based question index for reading/listening.
    pub index: Option<usize>,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Helpers
// ============================================================================

fn error_response(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// The single active engine, or a 404 if no attempt is running.
async fn active_engine(state: &AppState) -> Result<EngineHandle, axum::response::Response> {
    let engine = state.engine.read().await;
    engine.clone().ok_or_else(|| {
        error_response(StatusCode::NOT_FOUND, "No active exam attempt")
    })
}

fn engine_result(result: anyhow::Result<StatusView>) -> axum::response::Response {
    match result {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(e) => error_response(StatusCode::CONFLICT, format!("{:#}", e)),
    }
}

// ============================================================================
// Auth handlers
// ============================================================================

/// POST /auth/register
/// Issue a one-time password for a candidate name
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> impl IntoResponse {
    match state.credentials.register(&req.full_name) {
        Ok(password) => (
            StatusCode::OK,
            Json(RegisterResponse {
                full_name: req.full_name.trim().to_string(),
                password,
            }),
        )
            .into_response(),
        Err(e) => error_response(StatusCode::BAD_REQUEST, format!("{:#}", e)),
    }
}

/// POST /auth/login
/// Admit a candidate (creating the session engine) or classify an admin
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    // Administrator credentials come from config and bypass the one-time
    // credential store.
    if req.full_name == state.admin.username && req.password == state.admin.password {
        info!("Administrator logged in");
        return (
            StatusCode::OK,
            Json(LoginResponse {
                role: "admin".to_string(),
                status: None,
            }),
        )
            .into_response();
    }

    let outcome = match state.credentials.login(&req.full_name, &req.password) {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Credential store failure: {:#}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Credential store failure");
        }
    };

    let candidate_id = match outcome {
        LoginOutcome::Admitted { candidate_id } => candidate_id,
        LoginOutcome::AlreadyUsed => {
            return error_response(
                StatusCode::UNAUTHORIZED,
                "This one-time password has already been used",
            );
        }
        LoginOutcome::Rejected => {
            return error_response(StatusCode::UNAUTHORIZED, "Name or password is incorrect");
        }
    };

    // One attempt at a time: reject the login while another candidate's
    // attempt is still in progress.
    let mut engine = state.engine.write().await;
    if let Some(existing) = engine.as_ref() {
        match existing.status().await {
            Ok(status) if status.phase != Phase::Complete => {
                return error_response(
                    StatusCode::CONFLICT,
                    format!("An attempt by {} is already in progress", status.candidate_id),
                );
            }
            _ => {}
        }
    }

    // Stop the finished attempt's engine task before replacing it; the
    // controller holds a sender for its own channel, so the old loop would
    // otherwise run forever.
    if let Some(previous) = engine.take() {
        previous.shutdown().await;
    }

    let handle = state.seed.spawn_fresh(&candidate_id);
    let status = match handle.status().await {
        Ok(status) => status,
        Err(e) => {
            error!("Failed to start engine: {:#}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to start attempt");
        }
    };
    *engine = Some(handle);

    info!("Attempt created for candidate {}", candidate_id);

    (
        StatusCode::OK,
        Json(LoginResponse {
            role: "candidate".to_string(),
            status: Some(status),
        }),
    )
        .into_response()
}

// ============================================================================
// Exam handlers
// ============================================================================

/// POST /exam/begin
/// Start the current phase's countdown
pub async fn begin(State(state): State<AppState>) -> impl IntoResponse {
    match active_engine(&state).await {
        Ok(engine) => engine_result(engine.begin().await),
        Err(resp) => resp,
    }
}

/// GET /exam/status
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    match active_engine(&state).await {
        Ok(engine) => match engine.status().await {
            Ok(status) => (StatusCode::OK, Json(status)).into_response(),
            Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e)),
        },
        Err(resp) => resp,
    }
}

/// POST /exam/answer
/// Record one answer (reading/listening by index, writing by task)
pub async fn answer(
    State(state): State<AppState>,
    Json(req): Json<AnswerRequest>,
) -> impl IntoResponse {
    let slot = match (req.section.as_str(), req.index) {
        ("reading", Some(index)) => AnswerSlot::Reading { index },
        ("listening", Some(index)) => AnswerSlot::Listening { index },
        ("writing1", _) => AnswerSlot::Writing { task: 1 },
        ("writing2", _) => AnswerSlot::Writing { task: 2 },
        ("reading", None) | ("listening", None) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "reading/listening answers require an index",
            );
        }
        (section, _) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("Unknown section: {}", section),
            );
        }
    };

    match active_engine(&state).await {
        Ok(engine) => engine_result(engine.set_answer(slot, req.value).await),
        Err(resp) => resp,
    }
}

/// POST /exam/advance
pub async fn advance(State(state): State<AppState>) -> impl IntoResponse {
    match active_engine(&state).await {
        Ok(engine) => engine_result(engine.advance().await),
        Err(resp) => resp,
    }
}

/// POST /exam/back
pub async fn back(State(state): State<AppState>) -> impl IntoResponse {
    match active_engine(&state).await {
        Ok(engine) => engine_result(engine.back().await),
        Err(resp) => resp,
    }
}

/// POST /exam/audio/play
pub async fn audio_play(State(state): State<AppState>) -> impl IntoResponse {
    match active_engine(&state).await {
        Ok(engine) => engine_result(engine.audio_play().await),
        Err(resp) => resp,
    }
}

/// POST /exam/audio/pause
pub async fn audio_pause(State(state): State<AppState>) -> impl IntoResponse {
    match active_engine(&state).await {
        Ok(engine) => engine_result(engine.audio_pause().await),
        Err(resp) => resp,
    }
}

// ============================================================================
// Admin handlers
// ============================================================================

/// GET /admin/results
/// The append-only log of completed attempts
pub async fn admin_results(State(state): State<AppState>) -> impl IntoResponse {
    match state.results.load_all() {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => {
            error!("Failed to read results log: {:#}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read results")
        }
    }
}

/// GET /admin/candidates
/// All registered one-time credentials
pub async fn admin_candidates(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.credentials.list())).into_response()
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
