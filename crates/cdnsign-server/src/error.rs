//! Error types for the HTTP front door.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cdnsign_core::SigningError;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur while serving signing requests.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration is missing or unusable. Startup only.
    #[error("configuration error: {0}")]
    Config(String),

    /// Failed to bind or serve.
    #[error("failed to start server: {0}")]
    StartupFailed(String),

    /// API key missing or not recognized.
    #[error("Unauthorized")]
    Unauthorized,

    /// The request body could not be read as a signing request.
    #[error("{0}")]
    BadRequest(String),

    /// Rejected or failed by the signing engine.
    #[error(transparent)]
    Signing(#[from] SigningError),

    /// Unexpected failure in the front door itself.
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::Signing(e) if e.is_client_error() => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            ServerError::Signing(SigningError::InternalSigningError { incident }) => {
                // already logged in full by the engine
                tracing::warn!(%incident, "returning opaque signing failure");
                (StatusCode::INTERNAL_SERVER_ERROR, opaque_message())
            }
            other => {
                let incident = Uuid::new_v4();
                tracing::error!(%incident, error = ?other, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, opaque_message())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn opaque_message() -> String {
    "Internal signing error".to_string()
}
