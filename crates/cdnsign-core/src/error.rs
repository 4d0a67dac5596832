//! Error types for the signing engine.

use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur while validating or signing an access request.
///
/// Validation variants describe the caller's own input and are safe to
/// return verbatim. [`SigningError::InternalSigningError`] carries only an
/// incident id; the underlying cause is logged, never displayed.
#[derive(Debug, Error)]
pub enum SigningError {
    /// A required request field is absent or blank.
    #[error("missing required parameter: {name}")]
    MissingParameter { name: &'static str },

    /// `request_type` is not `url` or `cookie`.
    #[error("invalid request_type '{0}': expected 'url' or 'cookie'")]
    InvalidMode(String),

    /// `resource_url` is present but unusable.
    #[error("invalid resource_url: {0}")]
    MalformedResource(String),

    /// `client_ip` is not an IPv4 address or IPv4 CIDR block.
    #[error("invalid client_ip '{0}': expected an IPv4 address or IPv4 CIDR block")]
    InvalidIp(String),

    /// `expiry_seconds` or `not_before` is unusable.
    #[error("invalid expiry: {0}")]
    InvalidExpiry(String),

    /// Key material or key-pair id cannot be used. Startup only.
    #[error("signing key unavailable: {0}")]
    SigningUnavailable(String),

    /// Unexpected failure inside the signing path.
    #[error("internal signing error (incident {incident})")]
    InternalSigningError { incident: Uuid },
}

impl SigningError {
    /// Whether the error describes a problem with the caller's request.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SigningError::MissingParameter { .. }
                | SigningError::InvalidMode(_)
                | SigningError::MalformedResource(_)
                | SigningError::InvalidIp(_)
                | SigningError::InvalidExpiry(_)
        )
    }
}
