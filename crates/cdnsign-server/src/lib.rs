//! # cdnsign-server
//!
//! HTTP front door for the cdnsign signing engine.
//!
//! | Route | Auth | Purpose |
//! |-------|------|---------|
//! | `POST /sign` | API key | Issue a signed URL or three signed cookies |
//! | `GET /healthz` | none | Liveness |

pub mod config;
pub mod cookies;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod state;

pub use config::{AppConfig, load_config};
pub use error::ServerError;
pub use state::AppState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router.
pub fn create_router(state: AppState) -> Router {
    let signing = Router::new()
        .route("/sign", post(handlers::sign))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_api_key,
        ));

    Router::new()
        .route("/healthz", get(handlers::healthz))
        .merge(signing)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Load keys, bind and serve until Ctrl-C or SIGTERM.
pub async fn serve(cfg: AppConfig) -> Result<(), ServerError> {
    let state = AppState::init(&cfg)?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&cfg.server.bind)
        .await
        .map_err(|e| ServerError::StartupFailed(format!("cannot bind {}: {e}", cfg.server.bind)))?;
    tracing::info!(bind = %cfg.server.bind, "cdnsign-server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServerError::StartupFailed(e.to_string()))?;

    tracing::info!("cdnsign-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
