use crate::handlers;
use axum::{routing::get, Router};
use factor_pulse_data::{FactorRepository, SummaryRepository, UniverseRepository};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Repositories shared by the handlers. The API is strictly read-only;
/// only the pipeline writes.
pub struct AppState {
    pub factors: FactorRepository,
    pub universe: UniverseRepository,
    pub summaries: SummaryRepository,
}

pub struct ApiServer {
    state: Arc<AppState>,
}

impl ApiServer {
    #[must_use]
    pub const fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/api/health", get(handlers::health))
            .route("/api/factors/latest", get(handlers::latest_factors))
            .route("/api/factors/:symbol", get(handlers::symbol_history))
            .route("/api/outliers", get(handlers::latest_outliers))
            .route("/api/universe", get(handlers::universe))
            .route("/api/summaries", get(handlers::summaries))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Starts the web server listening on the specified address.
    ///
    /// # Errors
    /// Returns an error if the server fails to bind or serve.
    pub async fn serve(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Web API listening on {}", addr);

        axum::serve(listener, self.router()).await?;

        Ok(())
    }
}
