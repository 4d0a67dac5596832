//! Rendering signed artifacts into their delivery shapes.
//!
//! The assembler only produces names and values. Cookie transport attributes
//! (`Domain`, `Path`, `Secure`, `HttpOnly`) belong to the HTTP front door.

use crate::policy::PolicyKind;
use crate::request::Mode;

pub const PARAM_EXPIRES: &str = "Expires";
pub const PARAM_POLICY: &str = "Policy";
pub const PARAM_SIGNATURE: &str = "Signature";
pub const PARAM_KEY_PAIR_ID: &str = "Key-Pair-Id";

pub const COOKIE_EXPIRES: &str = "CloudFront-Expires";
pub const COOKIE_POLICY: &str = "CloudFront-Policy";
pub const COOKIE_SIGNATURE: &str = "CloudFront-Signature";
pub const COOKIE_KEY_PAIR_ID: &str = "CloudFront-Key-Pair-Id";

/// What accompanies the signature so the edge can rebuild the signed policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Proof {
    /// Canned policy: the edge rebuilds it from the URL and this epoch.
    Expires(i64),
    /// Custom policy: the encoded policy document itself.
    Policy(String),
}

impl Proof {
    pub fn kind(&self) -> PolicyKind {
        match self {
            Proof::Expires(_) => PolicyKind::Canned,
            Proof::Policy(_) => PolicyKind::Custom,
        }
    }

    fn value(&self) -> String {
        match self {
            Proof::Expires(epoch) => epoch.to_string(),
            Proof::Policy(encoded) => encoded.clone(),
        }
    }
}

/// Output of the signing engine, before it is shaped for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedArtifact {
    pub proof: Proof,
    /// Encoded signature over the canonical policy bytes.
    pub signature: String,
    pub key_pair_id: String,
}

impl SignedArtifact {
    pub fn policy_kind(&self) -> PolicyKind {
        self.proof.kind()
    }

    /// The encoded policy, present only for custom policies.
    pub fn policy(&self) -> Option<&str> {
        match &self.proof {
            Proof::Policy(encoded) => Some(encoded),
            Proof::Expires(_) => None,
        }
    }
}

/// Query parameters to append to the resource URL, in a stable order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryFragment {
    resource_url: String,
    params: Vec<(&'static str, String)>,
}

impl QueryFragment {
    pub fn resource_url(&self) -> &str {
        &self.resource_url
    }

    pub fn params(&self) -> &[(&'static str, String)] {
        &self.params
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    /// `?` for a URL without a query, `&` if one exists, nothing if the URL
    /// already ends in a separator.
    pub fn separator(&self) -> &'static str {
        if self.resource_url.ends_with('?') || self.resource_url.ends_with('&') {
            ""
        } else if self.resource_url.contains('?') {
            "&"
        } else {
            "?"
        }
    }

    /// `name=value` pairs joined by `&`, without a leading separator.
    ///
    /// Values come from the URL-safe codec, decimal epochs and an
    /// alphanumeric key-pair id, so no percent-encoding is needed.
    pub fn query_string(&self) -> String {
        self.params
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// The fragment to append to the resource URL, separator included.
    pub fn fragment(&self) -> String {
        format!("{}{}", self.separator(), self.query_string())
    }

    pub fn signed_url(&self) -> String {
        format!("{}{}", self.resource_url, self.fragment())
    }
}

/// A single signed cookie name and value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedCookie {
    pub name: &'static str,
    pub value: String,
}

/// Exactly three cookies: expires-or-policy, signature, key-pair id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSet {
    resource_url: String,
    cookies: [SignedCookie; 3],
}

impl CookieSet {
    /// The resource the cookies were issued for.
    pub fn resource_url(&self) -> &str {
        &self.resource_url
    }

    pub fn cookies(&self) -> &[SignedCookie; 3] {
        &self.cookies
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cookies.iter().map(|c| (c.name, c.value.as_str()))
    }
}

/// The delivery shape returned to the front door.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryPayload {
    Query(QueryFragment),
    Cookies(CookieSet),
}

impl DeliveryPayload {
    pub fn mode(&self) -> Mode {
        match self {
            DeliveryPayload::Query(_) => Mode::Url,
            DeliveryPayload::Cookies(_) => Mode::Cookie,
        }
    }
}

/// Shape a signed artifact for the requested mode.
pub fn assemble(mode: Mode, artifact: SignedArtifact, resource_url: &str) -> DeliveryPayload {
    let proof_value = artifact.proof.value();

    match mode {
        Mode::Url => {
            let proof_name = match artifact.proof {
                Proof::Expires(_) => PARAM_EXPIRES,
                Proof::Policy(_) => PARAM_POLICY,
            };
            DeliveryPayload::Query(QueryFragment {
                resource_url: resource_url.to_string(),
                params: vec![
                    (proof_name, proof_value),
                    (PARAM_SIGNATURE, artifact.signature),
                    (PARAM_KEY_PAIR_ID, artifact.key_pair_id),
                ],
            })
        }
        Mode::Cookie => {
            let proof_name = match artifact.proof {
                Proof::Expires(_) => COOKIE_EXPIRES,
                Proof::Policy(_) => COOKIE_POLICY,
            };
            DeliveryPayload::Cookies(CookieSet {
                resource_url: resource_url.to_string(),
                cookies: [
                    SignedCookie {
                        name: proof_name,
                        value: proof_value,
                    },
                    SignedCookie {
                        name: COOKIE_SIGNATURE,
                        value: artifact.signature,
                    },
                    SignedCookie {
                        name: COOKIE_KEY_PAIR_ID,
                        value: artifact.key_pair_id,
                    },
                ],
            })
        }
    }
}
