//! Scheduler job handlers

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};

use crate::errors::AppError;
use crate::web::{
    AppState,
    responses::{accepted, handle_error, ok},
};

pub async fn list_jobs(State(state): State<AppState>) -> impl IntoResponse {
    let jobs = match &state.scheduler {
        Some(scheduler) => scheduler.list_jobs().await,
        None => Vec::new(),
    };
    ok(jobs)
}

pub async fn run_job(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    let Some(scheduler) = &state.scheduler else {
        return handle_error(AppError::not_found("job", name));
    };

    match scheduler.run_now(&name).await {
        Ok(_) => accepted(serde_json::json!({ "job": name }), "job triggered").into_response(),
        Err(e) => handle_error(e),
    }
}
