//! Access policy documents and their canonical byte form.
//!
//! The signature covers the exact bytes produced by [`Policy::canonical_bytes`]:
//! compact JSON, fixed key order, optional conditions omitted entirely when
//! absent. Any change here invalidates every signature issued before it.

use crate::request::{IpRestriction, SigningRequest};
use serde::Serialize;
use std::fmt;

/// Whether a policy can be expressed by its expiry alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    Canned,
    Custom,
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyKind::Canned => f.write_str("canned"),
            PolicyKind::Custom => f.write_str("custom"),
        }
    }
}

/// A single-statement access policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Policy {
    /// Exact resource, expiry only. Delivered as `Expires`.
    Canned { resource: String, expires_at: i64 },
    /// Wildcard, IP restriction and/or not-before. Delivered as `Policy`.
    Custom {
        resource: String,
        expires_at: i64,
        not_before: Option<i64>,
        source_ip: Option<IpRestriction>,
    },
}

impl Policy {
    /// Canned iff the resource has no wildcard and the request carries no
    /// IP restriction or not-before bound.
    pub fn for_request(request: &SigningRequest) -> Self {
        if request.has_wildcard() || request.client_ip.is_some() || request.not_before.is_some()
        {
            Self::custom_for_request(request)
        } else {
            Policy::Canned {
                resource: request.resource_url.clone(),
                expires_at: request.expires_at.timestamp(),
            }
        }
    }

    /// Always build a custom policy, even where a canned one would do.
    pub fn custom_for_request(request: &SigningRequest) -> Self {
        Policy::Custom {
            resource: request.resource_url.clone(),
            expires_at: request.expires_at.timestamp(),
            not_before: request.not_before.map(|nb| nb.timestamp()),
            source_ip: request.client_ip,
        }
    }

    pub fn kind(&self) -> PolicyKind {
        match self {
            Policy::Canned { .. } => PolicyKind::Canned,
            Policy::Custom { .. } => PolicyKind::Custom,
        }
    }

    pub fn resource(&self) -> &str {
        match self {
            Policy::Canned { resource, .. } | Policy::Custom { resource, .. } => resource,
        }
    }

    pub fn expires_at(&self) -> i64 {
        match self {
            Policy::Canned { expires_at, .. } | Policy::Custom { expires_at, .. } => *expires_at,
        }
    }

    /// The exact bytes that get signed.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        let condition = match self {
            Policy::Canned { expires_at, .. } => Condition {
                date_less_than: EpochTime {
                    epoch_time: *expires_at,
                },
                date_greater_than: None,
                ip_address: None,
            },
            Policy::Custom {
                expires_at,
                not_before,
                source_ip,
                ..
            } => Condition {
                date_less_than: EpochTime {
                    epoch_time: *expires_at,
                },
                date_greater_than: not_before.map(|epoch_time| EpochTime { epoch_time }),
                ip_address: source_ip.map(|ip| SourceIp {
                    source_ip: ip.to_string(),
                }),
            },
        };

        serde_json::to_vec(&Document {
            statement: [Statement {
                resource: self.resource(),
                condition,
            }],
        })
    }
}

// Field declaration order below is the serialized key order.

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Document<'a> {
    statement: [Statement<'a>; 1],
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Statement<'a> {
    resource: &'a str,
    condition: Condition,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Condition {
    date_less_than: EpochTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    date_greater_than: Option<EpochTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ip_address: Option<SourceIp>,
}

#[derive(Serialize)]
struct EpochTime {
    #[serde(rename = "AWS:EpochTime")]
    epoch_time: i64,
}

#[derive(Serialize)]
struct SourceIp {
    #[serde(rename = "AWS:SourceIp")]
    source_ip: String,
}
