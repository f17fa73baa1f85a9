//! Canonical channel handlers

use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_TIMEZONE;
use crate::models::Channel;
use crate::web::{
    AppState,
    responses::{created, handle_error, handle_result},
};

/// Editable channel fields; `channel_id` is taken from the path on update
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelRequest {
    #[serde(default)]
    pub channel_id: String,
    pub display_name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub regexp: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl ChannelRequest {
    fn into_channel(self) -> Channel {
        let mut channel = Channel::new(self.channel_id, self.display_name);
        channel.category = self.category;
        if let Some(area) = self.area {
            channel.area = area;
        }
        channel.logo_url = self.logo_url.filter(|url| !url.is_empty());
        channel.regexp = self.regexp.filter(|re| !re.is_empty());
        channel.timezone = self.timezone.unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        channel.is_active = self.is_active.unwrap_or(true);
        channel
    }
}

#[derive(Debug, Deserialize)]
pub struct BatchChannelRequest {
    pub channels: Vec<ChannelRequest>,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub channel_id: String,
}

pub async fn list_channels(State(state): State<AppState>) -> Response {
    handle_result(state.channel_service.list_channels().await)
}

pub async fn create_channel(
    State(state): State<AppState>,
    Json(request): Json<ChannelRequest>,
) -> Response {
    match state.channel_service.create_channel(request.into_channel()).await {
        Ok(channel) => created(channel).into_response(),
        Err(e) => handle_error(e),
    }
}

pub async fn batch_create_channels(
    State(state): State<AppState>,
    Json(request): Json<BatchChannelRequest>,
) -> Response {
    let channels = request
        .channels
        .into_iter()
        .map(ChannelRequest::into_channel)
        .collect();
    match state.channel_service.batch_create_channels(channels).await {
        Ok(channels) => created(channels).into_response(),
        Err(e) => handle_error(e),
    }
}

pub async fn get_channel(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> Response {
    handle_result(state.channel_service.get_channel(&channel_id).await)
}

pub async fn update_channel(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Json(request): Json<ChannelRequest>,
) -> Response {
    handle_result(
        state
            .channel_service
            .update_channel(&channel_id, request.into_channel())
            .await,
    )
}

pub async fn delete_channel(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> Response {
    let result = state.channel_service.delete_channel(&channel_id).await;
    handle_result(result.map(|()| Deleted { channel_id }))
}

pub async fn channel_mappings(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> Response {
    handle_result(state.channel_service.channel_mappings(&channel_id).await)
}
