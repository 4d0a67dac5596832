//! `cdnsign key check` - Validate a signing key at rest.

use anyhow::Context;
use cdnsign_core::KeySource;
use cdnsign_core::keys::RECOMMENDED_MODULUS_BITS;

/// What `key check` found.
#[derive(Debug)]
pub struct KeyReport {
    pub modulus_bits: usize,
    pub public_key_pem: String,
}

impl KeyReport {
    pub fn meets_recommendation(&self) -> bool {
        self.modulus_bits >= RECOMMENDED_MODULUS_BITS
    }
}

pub fn inspect(key: &str) -> anyhow::Result<KeyReport> {
    let source: KeySource = key.parse()?;
    let signer = source
        .load()
        .with_context(|| format!("failed to load private key from {source}"))?;

    Ok(KeyReport {
        modulus_bits: signer.modulus_bits(),
        public_key_pem: signer.public_key_pem()?,
    })
}

pub fn check(key: &str) -> anyhow::Result<()> {
    let report = inspect(key)?;

    println!("✔ Private key loaded ({} bits)", report.modulus_bits);
    if !report.meets_recommendation() {
        println!(
            "⚠️  The CDN provider only registers {RECOMMENDED_MODULUS_BITS}-bit keys. Generate a new key before going live."
        );
    }
    println!();
    println!("Public key (register this with the CDN provider):");
    print!("{}", report.public_key_pem);

    Ok(())
}
