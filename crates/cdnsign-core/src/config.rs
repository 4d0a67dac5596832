//! Signer configuration.

use crate::engine::{EngineOptions, SigningEngine};
use crate::error::SigningError;
use crate::keys::{KeySource, RsaSha1Signer};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The `[signing]` section: which key signs, and under which key-pair id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignerConfig {
    /// Identifier of the public key registered with the CDN provider.
    #[serde(default)]
    pub key_pair_id: String,

    /// Path to the PEM private key file.
    #[serde(default)]
    pub private_key_file: Option<PathBuf>,

    /// Environment variable holding the PEM private key.
    #[serde(default)]
    pub private_key_env: Option<String>,

    /// Accept `http` resource URLs.
    #[serde(default)]
    pub allow_http: bool,

    /// Sign every request with a custom policy.
    #[serde(default)]
    pub always_custom_policy: bool,
}

impl SignerConfig {
    /// Where the private key comes from. The environment wins when it is set.
    pub fn key_source(&self) -> Result<KeySource, SigningError> {
        if let Some(env_var) = &self.private_key_env {
            if std::env::var_os(env_var).is_some() || self.private_key_file.is_none() {
                return Ok(KeySource::Env(env_var.clone()));
            }
        }

        match &self.private_key_file {
            Some(path) => Ok(KeySource::File(path.clone())),
            None => Err(SigningError::SigningUnavailable(
                "no private key configured, set private_key_file or private_key_env".to_string(),
            )),
        }
    }

    pub fn options(&self) -> EngineOptions {
        EngineOptions {
            allow_http: self.allow_http,
            always_custom_policy: self.always_custom_policy,
        }
    }

    /// Load the key and build the engine. Any failure is fatal at startup.
    pub fn build_engine(&self) -> Result<SigningEngine, SigningError> {
        let source = self.key_source()?;
        let signer: RsaSha1Signer = source.load()?;

        tracing::info!(
            key_source = %source,
            key_pair_id = %self.key_pair_id,
            modulus_bits = signer.modulus_bits(),
            always_custom_policy = self.always_custom_policy,
            "signing key loaded"
        );

        SigningEngine::new(signer, self.key_pair_id.as_str(), self.options())
    }
}
