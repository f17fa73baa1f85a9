//! Channel mapping handlers

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::web::{
    AppState,
    responses::{handle_result, ok},
};

#[derive(Debug, Deserialize)]
pub struct MappingQuery {
    pub provider_id: Option<String>,
}

pub async fn list_mappings(
    State(state): State<AppState>,
    Query(query): Query<MappingQuery>,
) -> Response {
    handle_result(
        state
            .mapping_service
            .list_mappings(query.provider_id.as_deref())
            .await,
    )
}

/// Re-run auto-mapping over every chain provider
pub async fn auto_map(State(state): State<AppState>) -> Response {
    let report = state.mapping_service.auto_map_chain(&state.chain).await;
    ok(report).into_response()
}
