//! `cdnsign sign` - Issue one signed URL or cookie set from the terminal.

use anyhow::Context;
use cdnsign_core::{
    DeliveryPayload, EngineOptions, KeySource, RawSigningRequest, SigningEngine,
};
use clap::Args;

#[derive(Args, Debug)]
pub struct SignArgs {
    /// Delivery shape: url or cookie
    #[arg(long)]
    pub mode: String,

    /// Absolute URL of the protected resource, optionally ending in a * segment
    #[arg(long)]
    pub resource: String,

    /// Token lifetime, e.g. "300", "15m", "2h", "7d"
    #[arg(long, default_value = "300")]
    pub expires_in: String,

    /// IPv4 address or CIDR block the token is restricted to
    #[arg(long)]
    pub client_ip: Option<String>,

    /// Epoch seconds before which the token is not valid
    #[arg(long)]
    pub not_before: Option<i64>,

    /// Key file path, or env:VAR to read PEM text from an environment variable
    #[arg(long, env = "CDNSIGN_PRIVATE_KEY_SOURCE")]
    pub key: String,

    /// Key-pair id registered with the CDN provider
    #[arg(long, env = "CDNSIGN_KEY_PAIR_ID")]
    pub key_pair_id: String,

    /// Accept http resource URLs
    #[arg(long, default_value_t = false)]
    pub allow_http: bool,

    /// Always issue a custom policy
    #[arg(long, default_value_t = false)]
    pub always_custom: bool,
}

pub fn run(args: &SignArgs) -> anyhow::Result<()> {
    let payload = issue(args)?;
    println!("{}", render(&payload));
    Ok(())
}

/// Build an engine from the arguments and sign the request.
pub fn issue(args: &SignArgs) -> anyhow::Result<DeliveryPayload> {
    let source: KeySource = args.key.parse()?;
    let signer = source
        .load()
        .with_context(|| format!("failed to load private key from {source}"))?;
    tracing::debug!(key_source = %source, modulus_bits = signer.modulus_bits(), "signing key loaded");

    let engine = SigningEngine::new(
        signer,
        args.key_pair_id.as_str(),
        EngineOptions {
            allow_http: args.allow_http,
            always_custom_policy: args.always_custom,
        },
    )?;

    let mut raw = RawSigningRequest::new(args.mode.as_str(), args.resource.as_str())
        .with_expiry_seconds(parse_duration(&args.expires_in)?);
    if let Some(ip) = &args.client_ip {
        raw = raw.with_client_ip(ip.as_str());
    }
    if let Some(not_before) = args.not_before {
        raw = raw.with_not_before(not_before);
    }

    Ok(engine.handle(&raw)?)
}

/// The signed URL, or one `Name=Value` line per cookie.
pub fn render(payload: &DeliveryPayload) -> String {
    match payload {
        DeliveryPayload::Query(query) => query.signed_url(),
        DeliveryPayload::Cookies(cookies) => cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Parse a lifetime like "90", "15m", "2h" or "7d" into seconds.
fn parse_duration(s: &str) -> anyhow::Result<i64> {
    let s = s.trim().to_lowercase();
    let parse = |n: &str| {
        n.trim()
            .parse::<i64>()
            .with_context(|| format!("invalid lifetime '{s}'"))
    };

    if let Some(days) = s.strip_suffix('d') {
        return Ok(parse(days)?.saturating_mul(86_400));
    }
    if let Some(hours) = s.strip_suffix('h') {
        return Ok(parse(hours)?.saturating_mul(3_600));
    }
    if let Some(minutes) = s.strip_suffix('m') {
        return Ok(parse(minutes)?.saturating_mul(60));
    }
    if let Some(seconds) = s.strip_suffix('s') {
        return parse(seconds);
    }

    // bare numbers are seconds
    parse(s.as_str())
}
