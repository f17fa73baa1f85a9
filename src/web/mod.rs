//! Web layer module
//!
//! A thin HTTP surface over the services. Handlers only parse parameters and
//! translate results; all behavior lives in [`crate::services`].

use anyhow::Result;
use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::providers::ProviderChain;
use crate::services::{
    ChannelMappingService, ChannelService, EpgService, SchedulerService, SyncRunner,
};

pub mod handlers;
pub mod responses;

pub use responses::{ApiResponse, handle_error, handle_result};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub epg_service: Arc<EpgService>,
    pub mapping_service: Arc<ChannelMappingService>,
    pub channel_service: Arc<ChannelService>,
    pub chain: Arc<ProviderChain>,
    pub runner: SyncRunner,
    /// Absent when scheduling is disabled
    pub scheduler: Option<Arc<SchedulerService>>,
}

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(host: &str, port: u16, state: AppState) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
        Ok(Self {
            app: create_router(state),
            addr,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serve until `cancellation_token` fires
    pub async fn serve_with_cancellation(
        self,
        cancellation_token: CancellationToken,
    ) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", self.addr, e))?;
        info!("Web server listening on {}", self.addr);

        axum::serve(listener, self.app)
            .with_graceful_shutdown(async move {
                cancellation_token.cancelled().await;
                info!("Web server received cancellation signal, shutting down gracefully");
            })
            .await?;
        Ok(())
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/api/v1", api_v1_routes())
        .route("/xmltv", get(handlers::export::xmltv))
        .route("/diyp", get(handlers::export::diyp))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/channels",
            get(handlers::channels::list_channels).post(handlers::channels::create_channel),
        )
        .route("/channels/batch", post(handlers::channels::batch_create_channels))
        .route(
            "/channels/{channel_id}",
            get(handlers::channels::get_channel)
                .put(handlers::channels::update_channel)
                .delete(handlers::channels::delete_channel),
        )
        .route(
            "/channels/{channel_id}/mappings",
            get(handlers::channels::channel_mappings),
        )
        .route("/epg/{channel_id}", get(handlers::epg::get_epg))
        .route("/epg/{channel_id}/range", get(handlers::epg::get_epg_range))
        .route("/epg/{channel_id}/now", get(handlers::epg::get_current_program))
        .route("/epg/{channel_id}/sync", post(handlers::epg::sync_channel))
        .route("/sync", post(handlers::epg::sync_all))
        .route("/providers", get(handlers::providers::list_providers))
        .route("/providers/health", get(handlers::providers::providers_health))
        .route("/mappings", get(handlers::mappings::list_mappings))
        .route("/mappings/auto", post(handlers::mappings::auto_map))
        .route("/scheduler/jobs", get(handlers::scheduler::list_jobs))
        .route("/scheduler/jobs/{name}/run", post(handlers::scheduler::run_job))
}
