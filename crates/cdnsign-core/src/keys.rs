//! Private key management for policy signatures.
//!
//! The edge network verifies signatures with SHA-1 digests and
//! RSASSA-PKCS1-v1_5, against the public half registered under the
//! configured key-pair id. PKCS#1 v1.5 is deterministic: the same key and
//! bytes always produce the same signature.

use crate::error::SigningError;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use sha1::{Digest, Sha1};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Modulus size the edge network accepts when registering a public key.
pub const RECOMMENDED_MODULUS_BITS: usize = 2048;

/// Produces signatures over canonical policy bytes.
pub trait Signer: Send + Sync {
    fn sign(&self, message: &[u8]) -> anyhow::Result<Vec<u8>>;
}

impl<S: Signer + ?Sized> Signer for Arc<S> {
    fn sign(&self, message: &[u8]) -> anyhow::Result<Vec<u8>> {
        (**self).sign(message)
    }
}

/// RSA private key signing SHA-1 digests with PKCS#1 v1.5 padding.
///
/// Loaded once at startup and shared read-only; clones share the key.
#[derive(Clone)]
pub struct RsaSha1Signer {
    key: Arc<RsaPrivateKey>,
}

impl RsaSha1Signer {
    pub fn new(key: RsaPrivateKey) -> Result<Self, SigningError> {
        key.validate()
            .map_err(|e| SigningError::SigningUnavailable(format!("RSA key is inconsistent: {e}")))?;

        let signer = Self { key: Arc::new(key) };
        if signer.modulus_bits() < RECOMMENDED_MODULUS_BITS {
            tracing::warn!(
                modulus_bits = signer.modulus_bits(),
                recommended = RECOMMENDED_MODULUS_BITS,
                "RSA signing key is smaller than the edge network accepts for registration"
            );
        }
        Ok(signer)
    }

    /// Load from PEM text: PKCS#1 (`RSA PRIVATE KEY`) or PKCS#8 (`PRIVATE KEY`).
    pub fn from_pem(pem: &str) -> Result<Self, SigningError> {
        let pem = pem.trim();
        let key = if pem.contains("BEGIN RSA PRIVATE KEY") {
            RsaPrivateKey::from_pkcs1_pem(pem).map_err(|e| {
                SigningError::SigningUnavailable(format!("malformed PKCS#1 private key: {e}"))
            })?
        } else if pem.contains("BEGIN PRIVATE KEY") {
            RsaPrivateKey::from_pkcs8_pem(pem).map_err(|e| {
                SigningError::SigningUnavailable(format!("malformed PKCS#8 private key: {e}"))
            })?
        } else {
            return Err(SigningError::SigningUnavailable(
                "unsupported key format, expected a PEM-encoded RSA private key (PKCS#1 or PKCS#8)"
                    .to_string(),
            ));
        };
        Self::new(key)
    }

    /// Load a PEM private key file.
    pub fn load_from_file(path: &Path) -> Result<Self, SigningError> {
        let pem = std::fs::read_to_string(path).map_err(|e| {
            SigningError::SigningUnavailable(format!(
                "cannot read private key file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_pem(&pem)
    }

    pub fn modulus_bits(&self) -> usize {
        self.key.size() * 8
    }

    /// The public half, as SPKI PEM, for registering with the CDN provider.
    pub fn public_key_pem(&self) -> Result<String, SigningError> {
        self.key
            .to_public_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| SigningError::SigningUnavailable(format!("cannot encode public key: {e}")))
    }
}

/// Where the PEM private key comes from.
///
/// Parses from `env:NAME` for an environment variable, anything else is a
/// file path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    File(PathBuf),
    Env(String),
}

impl KeySource {
    pub fn load(&self) -> Result<RsaSha1Signer, SigningError> {
        match self {
            KeySource::File(path) => RsaSha1Signer::load_from_file(path),
            KeySource::Env(name) => {
                let pem = std::env::var(name).map_err(|_| {
                    SigningError::SigningUnavailable(format!(
                        "environment variable {name} is not set"
                    ))
                })?;
                // Single-line env values often carry escaped newlines
                RsaSha1Signer::from_pem(&pem.replace("\\n", "\n"))
            }
        }
    }
}

impl fmt::Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::File(path) => write!(f, "{}", path.display()),
            KeySource::Env(name) => write!(f, "env:{name}"),
        }
    }
}

impl FromStr for KeySource {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.strip_prefix("env:") {
            Some("") => Err(SigningError::SigningUnavailable(
                "empty environment variable name in key source".to_string(),
            )),
            Some(name) => Ok(KeySource::Env(name.to_string())),
            None if s.is_empty() => Err(SigningError::SigningUnavailable(
                "empty private key path".to_string(),
            )),
            None => Ok(KeySource::File(PathBuf::from(s))),
        }
    }
}

impl Signer for RsaSha1Signer {
    fn sign(&self, message: &[u8]) -> anyhow::Result<Vec<u8>> {
        let digest = Sha1::digest(message);
        Ok(self.key.sign(Pkcs1v15Sign::new::<Sha1>(), &digest)?)
    }
}

impl fmt::Debug for RsaSha1Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaSha1Signer")
            .field("modulus_bits", &self.modulus_bits())
            .finish_non_exhaustive()
    }
}
