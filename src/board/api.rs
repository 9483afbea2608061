use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::models::{Task, TaskStatus};

// ── Shared application state ──────────────────────────────────────────

/// In-memory task table, kept in creation order.
#[derive(Default)]
pub struct AppState {
    pub tasks: RwLock<Vec<Task>>,
}

pub type SharedState = Arc<AppState>;

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct TaskRequest {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub status: Option<String>,
}

impl TaskRequest {
    fn validate(&self) -> Result<TaskStatus, ApiError> {
        if self.title.trim().is_empty() {
            return Err(ApiError::BadRequest("Title is required".into()));
        }
        match self.status.as_deref().map(str::trim) {
            None | Some("") => Ok(TaskStatus::ToDo),
            Some(s) => TaskStatus::from_str(s).map_err(ApiError::BadRequest),
        }
    }
}

// ── Error handling ────────────────────────────────────────────────────

pub enum ApiError {
    NotFound(String),
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/{id}", put(update_task).delete(delete_task))
        .route("/health", get(health_check))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn list_tasks(State(state): State<SharedState>) -> Json<Vec<Task>> {
    let tasks = state.tasks.read().await;
    Json(tasks.clone())
}

async fn create_task(
    State(state): State<SharedState>,
    Json(req): Json<TaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let status = req.validate()?;
    let task = Task {
        id: uuid::Uuid::new_v4().to_string(),
        title: req.title,
        description: req.description.unwrap_or_default(),
        status,
    };
    state.tasks.write().await.push(task.clone());
    info!(id = %task.id, title = %task.title, "task created");
    Ok((StatusCode::CREATED, Json(task)))
}

async fn update_task(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<TaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let status = req.validate()?;
    let mut tasks = state.tasks.write().await;
    let slot = tasks
        .iter_mut()
        .find(|t| t.id == id)
        .ok_or_else(|| ApiError::NotFound(format!("Task {} not found", id)))?;
    // The path id wins over any id in the body.
    *slot = Task {
        id,
        title: req.title,
        description: req.description.unwrap_or_default(),
        status,
    };
    debug!(id = %slot.id, status = %slot.status, "task updated");
    Ok(Json(slot.clone()))
}

async fn delete_task(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let mut tasks = state.tasks.write().await;
    let before = tasks.len();
    tasks.retain(|t| t.id != id);
    if tasks.len() == before {
        return Err(ApiError::NotFound(format!("Task {} not found", id)));
    }
    info!(%id, "task deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ── Tests ─────────────────────────────────────────────────────────────
