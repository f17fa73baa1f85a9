//! XMLTV and DIYP export endpoints
//!
//! These serve player clients directly, so they answer with the bare format
//! instead of the JSON envelope.

use axum::{
    Json,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::utils::{format_date, today_in};
use crate::web::{AppState, responses::handle_error};

#[derive(Debug, Deserialize)]
pub struct DiypQuery {
    /// Free-text channel name
    pub ch: String,
    pub date: Option<String>,
}

pub async fn xmltv(State(state): State<AppState>) -> Response {
    match state.epg_service.render_xmltv().await {
        Ok(body) => (
            [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => handle_error(e),
    }
}

pub async fn diyp(State(state): State<AppState>, Query(query): Query<DiypQuery>) -> Response {
    let date = query
        .date
        .unwrap_or_else(|| format_date(today_in(state.epg_service.timezone())));

    match state.epg_service.generate_diyp(&query.ch, &date).await {
        Ok(listing) => Json(listing).into_response(),
        Err(e) => handle_error(e),
    }
}
