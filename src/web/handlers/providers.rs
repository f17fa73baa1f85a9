//! Provider chain introspection

use axum::{extract::State, response::IntoResponse};
use serde::Serialize;

use crate::providers::FetchMode;
use crate::web::{AppState, responses::ok};

#[derive(Debug, Serialize)]
pub struct ProviderSummary {
    pub id: String,
    pub name: String,
    pub priority: i32,
    pub fetch_mode: FetchMode,
    pub channels: usize,
}

/// Chain members in priority order
pub async fn list_providers(State(state): State<AppState>) -> impl IntoResponse {
    let providers: Vec<ProviderSummary> = state
        .chain
        .providers()
        .iter()
        .map(|p| ProviderSummary {
            id: p.id().to_string(),
            name: p.name().to_string(),
            priority: p.priority(),
            fetch_mode: p.fetch_mode(),
            channels: p.list_channels().len(),
        })
        .collect();
    ok(providers)
}

pub async fn providers_health(State(state): State<AppState>) -> impl IntoResponse {
    ok(state.chain.health_check_all().await)
}
