//! # cdnsign-core
//!
//! Signing engine for CDN signed URLs and signed cookies.
//!
//! This crate turns an access request into a byte-exact access policy, signs
//! it with an RSA private key and renders the result in one of two delivery
//! shapes:
//! - Query-string parameters appended to the resource URL
//! - A set of three cookies
//!
//! ## Policy kinds
//!
//! | Kind | Used when | Delivered as |
//! |------|-----------|--------------|
//! | **Canned** | Exact resource, no IP restriction, no not-before | `Expires` |
//! | **Custom** | Wildcard, IP restriction or not-before | `Policy` |
//!
//! The edge network rebuilds a canned policy from the URL and expiry, so only
//! custom policies travel with the signature.
//!
//! ## Example
//!
//! ```no_run
//! use cdnsign_core::{EngineOptions, RawSigningRequest, RsaSha1Signer, SigningEngine};
//!
//! # fn main() -> Result<(), cdnsign_core::SigningError> {
//! let signer = RsaSha1Signer::load_from_file("keys/private_key.pem".as_ref())?;
//! let engine = SigningEngine::new(signer, "K2JCJMDEHXQW5F", EngineOptions::default())?;
//!
//! let payload = engine.handle(&RawSigningRequest::new("url", "https://cdn.example.com/file.png"))?;
//! # let _ = payload;
//! # Ok(())
//! # }
//! ```

pub mod assemble;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod keys;
pub mod policy;
pub mod request;

pub use assemble::{CookieSet, DeliveryPayload, Proof, QueryFragment, SignedArtifact, SignedCookie};
pub use config::SignerConfig;
pub use engine::{EngineOptions, SigningEngine};
pub use error::SigningError;
pub use keys::{KeySource, RsaSha1Signer, Signer};
pub use policy::{Policy, PolicyKind};
pub use request::{IpRestriction, Mode, RawSeconds, RawSigningRequest, RequestValidator, SigningRequest};
