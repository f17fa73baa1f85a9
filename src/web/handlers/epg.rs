//! EPG query and sync handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{error, info};

use crate::errors::{AppError, AppResult};
use crate::models::Program;
use crate::services::SyncReport;
use crate::utils::{parse_date, today_in};
use crate::web::{
    AppState,
    responses::{accepted, handle_result},
};

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    /// `YYYY-MM-DD`, today when absent
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Deserialize)]
pub struct SyncAllQuery {
    #[serde(default)]
    pub force: bool,
}

pub(crate) fn parse_date_param(name: &str, value: &str) -> AppResult<NaiveDate> {
    parse_date(value).map_err(|e| AppError::validation(format!("invalid {name} '{value}': {e}")))
}

pub async fn get_epg(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Query(query): Query<DateQuery>,
) -> Response {
    async fn inner(
        state: AppState,
        channel_id: String,
        query: DateQuery,
    ) -> AppResult<Vec<Program>> {
        let date = match query.date.as_deref() {
            Some(value) => parse_date_param("date", value)?,
            None => today_in(state.epg_service.timezone()),
        };
        state.epg_service.get_epg(&channel_id, date).await
    }

    handle_result(inner(state, channel_id, query).await)
}

pub async fn get_epg_range(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Query(query): Query<RangeQuery>,
) -> Response {
    async fn inner(
        state: AppState,
        channel_id: String,
        query: RangeQuery,
    ) -> AppResult<Vec<Program>> {
        let start = parse_date_param("start", &query.start)?;
        let end = parse_date_param("end", &query.end)?;
        state.epg_service.get_epg_range(&channel_id, start, end).await
    }

    handle_result(inner(state, channel_id, query).await)
}

pub async fn get_current_program(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> Response {
    handle_result(state.epg_service.get_current_program(&channel_id).await)
}

pub async fn sync_channel(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Json(request): Json<SyncRequest>,
) -> Response {
    async fn inner(
        state: AppState,
        channel_id: String,
        request: SyncRequest,
    ) -> AppResult<SyncReport> {
        let start = parse_date_param("start_date", &request.start_date)?;
        let end = parse_date_param("end_date", &request.end_date)?;
        state.epg_service.sync_epg(&channel_id, start, end).await
    }

    handle_result(inner(state, channel_id, request).await)
}

/// Kick off a sync of every provider in the background
pub async fn sync_all(
    State(state): State<AppState>,
    Query(query): Query<SyncAllQuery>,
) -> Response {
    let runner = state.runner.clone();
    let force = query.force;
    tokio::spawn(async move {
        match runner.sync_all_epg(force).await {
            Ok(report) => info!(
                "Manual sync finished: {} programs saved",
                report.persisted_programs()
            ),
            Err(e) => error!("Manual sync failed: {}", e),
        }
    });

    accepted(serde_json::json!({ "force": force }), "sync started").into_response()
}
