use crate::config::AppConfig;
use crate::error::ServerError;
use crate::middleware::auth::ApiKeys;
use cdnsign_core::SigningEngine;
use std::sync::Arc;

/// Shared application state.
///
/// The engine is immutable after startup, so handlers share it without locks.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SigningEngine>,
    pub api_keys: Arc<ApiKeys>,
    pub cookie_domain: Option<String>,
}

impl AppState {
    pub fn new(engine: SigningEngine, api_keys: ApiKeys, cookie_domain: Option<String>) -> Self {
        Self {
            engine: Arc::new(engine),
            api_keys: Arc::new(api_keys),
            cookie_domain: cookie_domain
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
        }
    }

    /// Load the signing key and API keys. Any failure here is fatal.
    pub fn init(cfg: &AppConfig) -> Result<Self, ServerError> {
        let engine = cfg.signing.build_engine()?;

        let api_keys = ApiKeys::new(cfg.auth.resolve_api_keys());
        if api_keys.is_empty() {
            return Err(ServerError::Config(
                "no API keys configured, set auth.api_keys or auth.api_key_env".to_string(),
            ));
        }

        Ok(Self::new(engine, api_keys, cfg.cookies.domain.clone()))
    }
}
