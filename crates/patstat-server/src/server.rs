use std::net::SocketAddr;

use axum::{
    Router, middleware,
    routing::{delete, get},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{handlers, middleware as app_middleware, state::AppState};

pub struct PatstatServer {
    addr: SocketAddr,
    app: Router,
}

pub fn build_app(state: AppState) -> Router {
    // Quota is charged for resolution only; health and the cache
    // observability views stay quota-free.
    let metered = Router::new()
        .route("/status", get(handlers::patent_status))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            app_middleware::quota_guard,
        ));

    let api = Router::new()
        .merge(metered)
        .route("/health", get(handlers::health))
        .route("/cache/top", get(handlers::cache_top))
        .route("/cache/stale", get(handlers::cache_stale))
        .route("/cache", delete(handlers::purge_cache));

    Router::new()
        .nest("/api/v1", api)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http.request",
                    http.method = %req.method(),
                    http.target = %req.uri(),
                )
            }),
        )
        .with_state(state)
}

pub struct ServerBuilder {
    addr: SocketAddr,
    state: AppState,
}

impl ServerBuilder {
    pub fn new(state: AppState) -> Self {
        Self {
            addr: state.config.addr(),
            state,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn build(self) -> PatstatServer {
        let app = build_app(self.state);
        PatstatServer {
            addr: self.addr,
            app,
        }
    }
}

impl PatstatServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(
            listener,
            self.app
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
