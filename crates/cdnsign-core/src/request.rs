//! Inbound signing requests and their validation.
//!
//! [`RawSigningRequest`] mirrors the wire fields handed over by the HTTP front
//! door. [`RequestValidator`] turns it into a [`SigningRequest`] with defaults
//! applied and every field parsed.

use crate::error::SigningError;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use url::Url;

/// Lifetime applied when `expiry_seconds` is omitted.
pub const DEFAULT_EXPIRY_SECONDS: i64 = 300;

/// Wildcard character accepted in the final path segment of a resource.
pub const WILDCARD: char = '*';

/// Delivery shape requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Query-string parameters appended to the resource URL.
    Url,
    /// Three signed cookies.
    Cookie,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Url => "url",
            Mode::Cookie => "cookie",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("url") {
            Ok(Mode::Url)
        } else if trimmed.eq_ignore_ascii_case("cookie") {
            Ok(Mode::Cookie)
        } else {
            Err(SigningError::InvalidMode(trimmed.to_string()))
        }
    }
}

/// A seconds value as it may arrive on the wire: a JSON integer or a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawSeconds {
    Integer(i64),
    Text(String),
}

impl RawSeconds {
    fn parse(&self, field: &str) -> Result<i64, SigningError> {
        match self {
            RawSeconds::Integer(n) => Ok(*n),
            RawSeconds::Text(s) => {
                let invalid =
                    || SigningError::InvalidExpiry(format!("{field} must be an integer, got '{s}'"));
                let trimmed = s.trim();
                // i64::from_str accepts a leading '+'
                let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                trimmed.parse::<i64>().map_err(|_| invalid())
            }
        }
    }
}

/// Unvalidated request fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSigningRequest {
    /// `url` or `cookie`, case-insensitive.
    #[serde(default)]
    pub request_type: Option<String>,

    /// Absolute URL of the protected resource.
    #[serde(default)]
    pub resource_url: Option<String>,

    /// Token lifetime in seconds. Defaults to [`DEFAULT_EXPIRY_SECONDS`].
    #[serde(default)]
    pub expiry_seconds: Option<RawSeconds>,

    /// IPv4 address or CIDR block the token is restricted to.
    #[serde(default)]
    pub client_ip: Option<String>,

    /// Epoch seconds before which the token is not valid.
    #[serde(default)]
    pub not_before: Option<RawSeconds>,
}

impl RawSigningRequest {
    pub fn new(request_type: impl Into<String>, resource_url: impl Into<String>) -> Self {
        Self {
            request_type: Some(request_type.into()),
            resource_url: Some(resource_url.into()),
            ..Default::default()
        }
    }

    pub fn with_expiry_seconds(mut self, seconds: i64) -> Self {
        self.expiry_seconds = Some(RawSeconds::Integer(seconds));
        self
    }

    pub fn with_client_ip(mut self, client_ip: impl Into<String>) -> Self {
        self.client_ip = Some(client_ip.into());
        self
    }

    pub fn with_not_before(mut self, epoch_seconds: i64) -> Self {
        self.not_before = Some(RawSeconds::Integer(epoch_seconds));
        self
    }
}

/// An IPv4 CIDR block. Bare addresses parse as `/32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IpRestriction {
    addr: Ipv4Addr,
    prefix: u8,
}

impl IpRestriction {
    pub fn new(addr: Ipv4Addr, prefix: u8) -> Option<Self> {
        (prefix <= 32).then_some(Self { addr, prefix })
    }

    pub fn addr(&self) -> Ipv4Addr {
        self.addr
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }
}

impl fmt::Display for IpRestriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}

impl FromStr for IpRestriction {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SigningError::InvalidIp(s.to_string());
        let trimmed = s.trim();

        let (addr, prefix) = match trimmed.split_once('/') {
            Some((addr, prefix)) => {
                // u8::from_str accepts a leading '+'
                if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                (addr, prefix.parse::<u8>().map_err(|_| invalid())?)
            }
            None => (trimmed, 32),
        };

        let addr = addr.parse::<Ipv4Addr>().map_err(|_| invalid())?;
        IpRestriction::new(addr, prefix).ok_or_else(invalid)
    }
}

/// A validated access request.
///
/// `expires_at` is strictly in the future at validation time. Constructing
/// the struct directly skips that check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningRequest {
    pub mode: Mode,
    pub resource_url: String,
    pub expires_at: DateTime<Utc>,
    pub client_ip: Option<IpRestriction>,
    pub not_before: Option<DateTime<Utc>>,
}

impl SigningRequest {
    pub fn new(mode: Mode, resource_url: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            mode,
            resource_url: resource_url.into(),
            expires_at,
            client_ip: None,
            not_before: None,
        }
    }

    pub fn with_client_ip(mut self, client_ip: IpRestriction) -> Self {
        self.client_ip = Some(client_ip);
        self
    }

    pub fn with_not_before(mut self, not_before: DateTime<Utc>) -> Self {
        self.not_before = Some(not_before);
        self
    }

    /// Whether the resource contains the wildcard character.
    pub fn has_wildcard(&self) -> bool {
        self.resource_url.contains(WILDCARD)
    }
}

/// Normalizes and validates raw requests. Pure: no I/O, no shared state.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestValidator {
    allow_http: bool,
}

impl RequestValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept plain `http` resources in addition to `https`.
    pub fn allow_http(mut self, allow: bool) -> Self {
        self.allow_http = allow;
        self
    }

    /// Validate against the current instant.
    pub fn validate(&self, raw: &RawSigningRequest) -> Result<SigningRequest, SigningError> {
        self.validate_at(raw, Utc::now())
    }

    /// Validate with an explicit notion of "now".
    pub fn validate_at(
        &self,
        raw: &RawSigningRequest,
        now: DateTime<Utc>,
    ) -> Result<SigningRequest, SigningError> {
        let mode = non_blank(raw.request_type.as_deref())
            .ok_or(SigningError::MissingParameter {
                name: "request_type",
            })?
            .parse::<Mode>()?;

        let resource_url = non_blank(raw.resource_url.as_deref()).ok_or(
            SigningError::MissingParameter {
                name: "resource_url",
            },
        )?;
        let resource_url = self.validate_resource(resource_url)?;

        let expires_at = expiry_from(raw.expiry_seconds.as_ref(), now)?;

        let client_ip = non_blank(raw.client_ip.as_deref())
            .map(str::parse::<IpRestriction>)
            .transpose()?;

        let not_before = raw
            .not_before
            .as_ref()
            .map(|nb| not_before_from(nb, expires_at))
            .transpose()?;

        Ok(SigningRequest {
            mode,
            resource_url,
            expires_at,
            client_ip,
            not_before,
        })
    }

    fn validate_resource(&self, resource: &str) -> Result<String, SigningError> {
        let malformed = |reason: &str| SigningError::MalformedResource(reason.to_string());

        if resource
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(malformed("must not contain whitespace or control characters"));
        }

        let parsed = Url::parse(resource)
            .map_err(|e| SigningError::MalformedResource(format!("not an absolute URL ({e})")))?;

        match parsed.scheme() {
            "https" => {}
            "http" if self.allow_http => {}
            other => {
                return Err(SigningError::MalformedResource(format!(
                    "scheme '{other}' is not allowed, use https"
                )));
            }
        }

        if parsed.host_str().is_none_or(str::is_empty) {
            return Err(malformed("missing host"));
        }
        if parsed.fragment().is_some() {
            return Err(malformed("fragments are never sent to the edge and cannot be signed"));
        }

        match resource.matches(WILDCARD).count() {
            0 => {}
            1 => {
                let last_segment = parsed.path().rsplit('/').next().unwrap_or_default();
                if !last_segment.contains(WILDCARD) {
                    return Err(malformed("wildcard is only allowed in the final path segment"));
                }
            }
            _ => return Err(malformed("at most one wildcard is allowed")),
        }

        Ok(resource.to_string())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn expiry_from(raw: Option<&RawSeconds>, now: DateTime<Utc>) -> Result<DateTime<Utc>, SigningError> {
    let seconds = match raw {
        Some(raw) => raw.parse("expiry_seconds")?,
        None => DEFAULT_EXPIRY_SECONDS,
    };
    if seconds <= 0 {
        return Err(SigningError::InvalidExpiry(format!(
            "expiry_seconds must be greater than zero, got {seconds}"
        )));
    }

    TimeDelta::try_seconds(seconds)
        .and_then(|delta| now.checked_add_signed(delta))
        .ok_or_else(|| {
            SigningError::InvalidExpiry(format!(
                "expiry_seconds {seconds} exceeds the representable time range"
            ))
        })
}

fn not_before_from(
    raw: &RawSeconds,
    expires_at: DateTime<Utc>,
) -> Result<DateTime<Utc>, SigningError> {
    let epoch = raw.parse("not_before")?;
    if epoch < 0 {
        return Err(SigningError::InvalidExpiry(format!(
            "not_before must not be negative, got {epoch}"
        )));
    }
    let not_before = DateTime::<Utc>::from_timestamp(epoch, 0).ok_or_else(|| {
        SigningError::InvalidExpiry(format!(
            "not_before {epoch} exceeds the representable time range"
        ))
    })?;
    if epoch >= expires_at.timestamp() {
        return Err(SigningError::InvalidExpiry(
            "not_before must be earlier than the expiry".to_string(),
        ));
    }
    Ok(not_before)
}
