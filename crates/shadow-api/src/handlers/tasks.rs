//! Task polling.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use shadow_models::{TaskId, TaskKind, TaskRecord, TaskStatus};
use shadow_queue::QueueError;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Body of a `202 Accepted` job submission.
#[derive(Debug, Serialize)]
pub struct TaskAccepted {
    pub status: TaskStatus,
    pub task_id: TaskId,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimate: Option<serde_json::Value>,
}

impl TaskAccepted {
    pub fn new(record: TaskRecord, message: impl Into<String>) -> Self {
        Self {
            status: record.status,
            task_id: record.task_id,
            message: message.into(),
            output_name: None,
            output_path: None,
            estimate: None,
        }
    }

    pub fn with_output(mut self, name: impl Into<String>, path: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self.output_path = Some(path.into());
        self
    }

    pub fn with_estimate(mut self, estimate: impl Serialize) -> Self {
        self.estimate = serde_json::to_value(estimate).ok();
        self
    }

    pub fn accepted(self) -> (StatusCode, Json<Self>) {
        (StatusCode::ACCEPTED, Json(self))
    }
}

/// Generic task poll.
pub async fn get_task(State(state): State<AppState>, Path(task_id): Path<String>) -> ApiResult<Json<TaskRecord>> {
    let record = state.tracker.require(&TaskId::from_string(task_id))?;
    Ok(Json(record))
}

fn task_of_kind(state: &AppState, task_id: String, kind: TaskKind) -> ApiResult<Json<TaskRecord>> {
    let id = TaskId::from_string(task_id);
    match state.tracker.get(&id) {
        Some(record) if record.kind == kind => Ok(Json(record)),
        _ => Err(ApiError::from(QueueError::task_not_found(&id))),
    }
}

pub async fn download_status(State(state): State<AppState>, Path(task_id): Path<String>) -> ApiResult<Json<TaskRecord>> {
    task_of_kind(&state, task_id, TaskKind::Download)
}

pub async fn repeat_status(State(state): State<AppState>, Path(task_id): Path<String>) -> ApiResult<Json<TaskRecord>> {
    task_of_kind(&state, task_id, TaskKind::Repeat)
}

pub async fn merge_status(State(state): State<AppState>, Path(task_id): Path<String>) -> ApiResult<Json<TaskRecord>> {
    task_of_kind(&state, task_id, TaskKind::Merge)
}

pub async fn whisper_status(State(state): State<AppState>, Path(task_id): Path<String>) -> ApiResult<Json<TaskRecord>> {
    task_of_kind(&state, task_id, TaskKind::Whisper)
}

pub async fn final_status(State(state): State<AppState>, Path(task_id): Path<String>) -> ApiResult<Json<TaskRecord>> {
    task_of_kind(&state, task_id, TaskKind::FinalVideo)
}
