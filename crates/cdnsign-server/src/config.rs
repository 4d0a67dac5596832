use crate::error::ServerError;
use cdnsign_core::SignerConfig;
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "CDNSIGN_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub signing: SignerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub cookies: CookieConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address, e.g. "0.0.0.0:8080"
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Accepted API keys. Prefer `api_key_env` outside of development.
    #[serde(default)]
    pub api_keys: Vec<String>,

    /// Environment variable holding one more accepted API key.
    #[serde(default)]
    pub api_key_env: Option<String>,
}

impl AuthConfig {
    /// Every accepted key, blanks dropped.
    pub fn resolve_api_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .api_keys
            .iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        if let Some(env_var) = &self.api_key_env {
            if let Ok(key) = env::var(env_var) {
                let key = key.trim();
                if !key.is_empty() {
                    keys.push(key.to_string());
                }
            }
        }

        keys
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CookieConfig {
    /// `Domain` attribute for signed cookies. Defaults to the resource host.
    #[serde(default)]
    pub domain: Option<String>,
}

impl AppConfig {
    pub fn from_toml(raw: &str) -> Result<Self, ServerError> {
        toml::from_str(raw).map_err(|e| ServerError::Config(e.to_string()))
    }
}

/// Load the config from `explicit`, else `CDNSIGN_CONFIG`, else `config.toml`.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig, ServerError> {
    let path = config_path(explicit);
    let raw = fs::read_to_string(&path)
        .map_err(|e| ServerError::Config(format!("cannot read {}: {e}", path.display())))?;
    AppConfig::from_toml(&raw)
        .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))
}

pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    if let Ok(p) = env::var(CONFIG_ENV) {
        return PathBuf::from(p);
    }
    PathBuf::from("config.toml")
}
