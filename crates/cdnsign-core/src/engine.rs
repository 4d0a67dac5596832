//! The signing engine: request in, signed artifact out.

use crate::assemble::{DeliveryPayload, Proof, SignedArtifact, assemble};
use crate::codec;
use crate::error::SigningError;
use crate::keys::{RsaSha1Signer, Signer};
use crate::policy::Policy;
use crate::request::{RawSigningRequest, RequestValidator, SigningRequest};
use chrono::{DateTime, Utc};
use std::fmt;
use url::Url;
use uuid::Uuid;

/// Engine-wide switches, fixed at construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineOptions {
    /// Accept `http` resources in addition to `https`.
    pub allow_http: bool,
    /// Issue custom policies even where a canned one would do.
    pub always_custom_policy: bool,
}

/// Signs access policies with an injected key.
///
/// Holds no per-request state; share one instance across workers.
pub struct SigningEngine<S = RsaSha1Signer> {
    signer: S,
    key_pair_id: String,
    options: EngineOptions,
}

impl<S: Signer> SigningEngine<S> {
    /// Create an engine. The key-pair id must be non-empty ASCII alphanumerics.
    pub fn new(
        signer: S,
        key_pair_id: impl Into<String>,
        options: EngineOptions,
    ) -> Result<Self, SigningError> {
        let key_pair_id = key_pair_id.into().trim().to_string();
        if key_pair_id.is_empty() {
            return Err(SigningError::SigningUnavailable(
                "key pair id is not configured".to_string(),
            ));
        }
        if !key_pair_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(SigningError::SigningUnavailable(
                "key pair id must contain only ASCII letters and digits".to_string(),
            ));
        }

        Ok(Self {
            signer,
            key_pair_id,
            options,
        })
    }

    pub fn key_pair_id(&self) -> &str {
        &self.key_pair_id
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    pub fn validator(&self) -> RequestValidator {
        RequestValidator::new().allow_http(self.options.allow_http)
    }

    /// The policy this engine would sign for a request.
    pub fn policy_for(&self, request: &SigningRequest) -> Policy {
        if self.options.always_custom_policy {
            Policy::custom_for_request(request)
        } else {
            Policy::for_request(request)
        }
    }

    /// Sign a validated request. Pure function of the request and the key.
    pub fn sign(&self, request: &SigningRequest) -> Result<SignedArtifact, SigningError> {
        let policy = self.policy_for(request);
        tracing::debug!(policy = %policy.kind(), expires_at = policy.expires_at(), "built policy");
        let canonical = policy
            .canonical_bytes()
            .map_err(|e| internal_failure("policy serialization", e))?;
        let signature = self
            .signer
            .sign(&canonical)
            .map_err(|e| internal_failure("signature", format!("{e:#}")))?;

        let proof = match policy {
            Policy::Canned { expires_at, .. } => Proof::Expires(expires_at),
            Policy::Custom { .. } => Proof::Policy(codec::encode(&canonical)),
        };

        Ok(SignedArtifact {
            proof,
            signature: codec::encode(&signature),
            key_pair_id: self.key_pair_id.clone(),
        })
    }

    /// Validate, sign and shape a raw request.
    pub fn handle(&self, raw: &RawSigningRequest) -> Result<DeliveryPayload, SigningError> {
        self.handle_at(raw, Utc::now())
    }

    /// [`SigningEngine::handle`] with an explicit notion of "now".
    pub fn handle_at(
        &self,
        raw: &RawSigningRequest,
        now: DateTime<Utc>,
    ) -> Result<DeliveryPayload, SigningError> {
        let request = self.validator().validate_at(raw, now)?;
        let artifact = self.sign(&request)?;

        tracing::info!(
            mode = %request.mode,
            policy = %artifact.policy_kind(),
            host = resource_host(&request.resource_url).as_deref().unwrap_or("-"),
            expires_at = request.expires_at.timestamp(),
            "issued signed access"
        );

        Ok(assemble(request.mode, artifact, &request.resource_url))
    }
}

impl<S> fmt::Debug for SigningEngine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningEngine")
            .field("key_pair_id", &self.key_pair_id)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn internal_failure(stage: &'static str, cause: impl fmt::Display) -> SigningError {
    let incident = Uuid::new_v4();
    tracing::error!(%incident, stage, error = %cause, "signing failed");
    SigningError::InternalSigningError { incident }
}

fn resource_host(resource_url: &str) -> Option<String> {
    Url::parse(resource_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::{COOKIE_EXPIRES, COOKIE_KEY_PAIR_ID, COOKIE_POLICY, COOKIE_SIGNATURE};
    use crate::keys::tests::TEST_RSA_KEY_PKCS1;
    use crate::policy::PolicyKind;
    use crate::request::Mode;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::net::Ipv4Addr;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const EXPIRES: i64 = 1_767_290_400;

    #[derive(Default)]
    struct CountingSigner {
        calls: AtomicUsize,
    }

    impl Signer for CountingSigner {
        fn sign(&self, message: &[u8]) -> anyhow::Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(message.iter().rev().copied().collect())
        }
    }

    struct BrokenSigner;

    impl Signer for BrokenSigner {
        fn sign(&self, _message: &[u8]) -> anyhow::Result<Vec<u8>> {
            anyhow::bail!("hsm unreachable at /secret/path/key.pem")
        }
    }

    fn rsa_engine(options: EngineOptions) -> SigningEngine {
        let signer = RsaSha1Signer::from_pem(TEST_RSA_KEY_PKCS1).unwrap();
        SigningEngine::new(signer, "APKAEXAMPLE", options).unwrap()
    }

    fn at(epoch: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(epoch, 0).unwrap()
    }

    #[test]
    fn test_canned_artifact_matches_reference_signature() {
        let engine = rsa_engine(EngineOptions::default());
        let request = SigningRequest::new(Mode::Url, "https://cdn.example.com/file.png", at(EXPIRES));

        let artifact = engine.sign(&request).unwrap();
        assert_eq!(artifact.proof, Proof::Expires(EXPIRES));
        assert_eq!(
            artifact.signature,
            "FrMgbx3rzQEpHjzivN8cQ9bOKxQVg6BfRsjwpBRyui9aGP0xw5rOE-gfsbU3rekPehQOWKI1AhEYyHJ92~4SLA__"
        );
        assert_eq!(artifact.key_pair_id, "APKAEXAMPLE");
        assert!(artifact.policy().is_none());
    }

    #[test]
    fn test_custom_artifact_matches_reference_signature() {
        let engine = rsa_engine(EngineOptions::default());
        let request = SigningRequest::new(Mode::Cookie, "https://cdn.example.com/videos/*", at(EXPIRES))
            .with_client_ip("192.0.2.0/24".parse().unwrap());

        let artifact = engine.sign(&request).unwrap();
        assert_eq!(artifact.policy_kind(), PolicyKind::Custom);
        assert_eq!(
            artifact.policy(),
            Some(
                "eyJTdGF0ZW1lbnQiOlt7IlJlc291cmNlIjoiaHR0cHM6Ly9jZG4uZXhhbXBsZS5jb20vdmlkZW9zLyoiLCJDb25kaXRpb24iOnsiRGF0ZUxlc3NUaGFuIjp7IkFXUzpFcG9jaFRpbWUiOjE3NjcyOTA0MDB9LCJJcEFkZHJlc3MiOnsiQVdTOlNvdXJjZUlwIjoiMTkyLjAuMi4wLzI0In19fV19"
            )
        );
        assert_eq!(
            artifact.signature,
            "BH385Nz7Th9HXUg3-wll99PAfqCQEl19TTKSMWyr2St3TFQZlqkFQHtP19aMbYRzThbHOp96AYuNnNJjYrA0~g__"
        );
    }

    #[test]
    fn test_encoded_policy_decodes_to_signed_bytes() {
        let engine = rsa_engine(EngineOptions::default());
        let request = SigningRequest::new(Mode::Url, "https://cdn.example.com/videos/*", at(EXPIRES));

        let artifact = engine.sign(&request).unwrap();
        let decoded = codec::decode(artifact.policy().unwrap()).unwrap();
        assert_eq!(
            decoded,
            engine.policy_for(&request).canonical_bytes().unwrap()
        );
    }

    #[test]
    fn test_always_custom_policy() {
        let engine = rsa_engine(EngineOptions {
            always_custom_policy: true,
            ..Default::default()
        });
        let request = SigningRequest::new(Mode::Cookie, "https://cdn.example.com/file.png", at(EXPIRES));

        let artifact = engine.sign(&request).unwrap();
        assert_eq!(artifact.policy_kind(), PolicyKind::Custom);
    }

    #[test]
    fn test_handle_url_scenario() {
        let engine = rsa_engine(EngineOptions::default());
        let raw = RawSigningRequest::new("url", "https://cdn.example.com/file.png");

        let payload = engine.handle_at(&raw, at(EXPIRES - 300)).unwrap();
        let DeliveryPayload::Query(query) = payload else {
            panic!("expected a query payload");
        };
        assert_eq!(query.get("Expires"), Some("1767290400"));
        assert!(query.get("Signature").is_some());
        assert_eq!(query.get("Key-Pair-Id"), Some("APKAEXAMPLE"));
        assert!(query.get("Policy").is_none());
        assert!(query.fragment().starts_with('?'));
    }

    #[test]
    fn test_handle_cookie_scenario() {
        let engine = rsa_engine(EngineOptions::default());
        let raw = RawSigningRequest::new("cookie", "https://cdn.example.com/videos/*")
            .with_expiry_seconds(3600);

        let payload = engine.handle_at(&raw, at(EXPIRES)).unwrap();
        let DeliveryPayload::Cookies(cookies) = payload else {
            panic!("expected a cookie payload");
        };
        let names: Vec<_> = cookies.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec![COOKIE_POLICY, COOKIE_SIGNATURE, COOKIE_KEY_PAIR_ID]);
        assert!(cookies.get(COOKIE_EXPIRES).is_none());
    }

    #[test]
    fn test_validation_failures_never_reach_signer() {
        let signer = Arc::new(CountingSigner::default());
        let engine =
            SigningEngine::new(signer.clone(), "APKAEXAMPLE", EngineOptions::default()).unwrap();

        let missing = RawSigningRequest {
            request_type: Some("url".into()),
            ..Default::default()
        };
        assert!(matches!(
            engine.handle(&missing),
            Err(SigningError::MissingParameter { name: "resource_url" })
        ));

        let bad_ip = RawSigningRequest::new("url", "https://cdn.example.com/file.png")
            .with_client_ip("not-an-ip");
        assert!(matches!(engine.handle(&bad_ip), Err(SigningError::InvalidIp(_))));

        // leading zeros are ambiguous (octal in some parsers) and never accepted
        let zero_padded = RawSigningRequest::new("cookie", "https://cdn.example.com/videos/*")
            .with_client_ip("10.07.8.0/8");
        assert!(matches!(engine.handle(&zero_padded), Err(SigningError::InvalidIp(_))));

        assert_eq!(signer.calls.load(Ordering::SeqCst), 0);

        let ok = RawSigningRequest::new("url", "https://cdn.example.com/file.png");
        engine.handle(&ok).unwrap();
        assert_eq!(signer.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_signer_failure_is_opaque() {
        let engine = SigningEngine::new(BrokenSigner, "APKAEXAMPLE", EngineOptions::default()).unwrap();
        let request = SigningRequest::new(Mode::Url, "https://cdn.example.com/file.png", at(EXPIRES));

        let err = engine.sign(&request).unwrap_err();
        assert!(matches!(err, SigningError::InternalSigningError { .. }));
        assert!(!err.to_string().contains("/secret/path"));
        assert!(!err.to_string().contains("hsm"));
    }

    #[test]
    fn test_rejects_unusable_key_pair_id() {
        for id in ["", "   ", "APKA/../x", "APKA EXAMPLE"] {
            let result = SigningEngine::new(CountingSigner::default(), id, EngineOptions::default());
            assert!(matches!(result, Err(SigningError::SigningUnavailable(_))));
        }
    }

    #[test]
    fn test_http_follows_engine_option() {
        let raw = RawSigningRequest::new("url", "http://cdn.example.com/file.png");

        let strict = SigningEngine::new(CountingSigner::default(), "K1", EngineOptions::default()).unwrap();
        assert!(matches!(strict.handle(&raw), Err(SigningError::MalformedResource(_))));

        let lenient = SigningEngine::new(
            CountingSigner::default(),
            "K1",
            EngineOptions {
                allow_http: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert!(lenient.handle(&raw).is_ok());
    }

    proptest! {
        #[test]
        fn prop_sign_is_deterministic(
            segment in "[a-z0-9]{1,16}",
            wildcard in any::<bool>(),
            expires in 1_700_000_000i64..2_000_000_000,
            restrict in any::<bool>(),
        ) {
            let engine = rsa_engine(EngineOptions::default());
            let resource = if wildcard {
                format!("https://cdn.example.com/{segment}/*")
            } else {
                format!("https://cdn.example.com/{segment}")
            };
            let mut request = SigningRequest::new(Mode::Url, resource, at(expires));
            if restrict {
                request = request.with_client_ip("198.51.100.0/24".parse().unwrap());
            }

            prop_assert_eq!(engine.sign(&request).unwrap(), engine.sign(&request).unwrap());
        }

        #[test]
        fn prop_cookie_mode_always_yields_three(
            wildcard in any::<bool>(),
            ip in proptest::option::of((any::<[u8; 4]>(), 0u8..=32)),
        ) {
            let engine = SigningEngine::new(CountingSigner::default(), "K1", EngineOptions::default()).unwrap();
            let resource = if wildcard {
                "https://cdn.example.com/videos/*"
            } else {
                "https://cdn.example.com/videos/a.mp4"
            };
            let mut raw = RawSigningRequest::new("cookie", resource);
            if let Some((octets, prefix)) = ip {
                raw = raw.with_client_ip(format!("{}/{prefix}", Ipv4Addr::from(octets)));
            }

            let DeliveryPayload::Cookies(cookies) = engine.handle(&raw).unwrap() else {
                panic!("expected a cookie payload");
            };
            prop_assert_eq!(cookies.iter().count(), 3);
        }
    }
}
