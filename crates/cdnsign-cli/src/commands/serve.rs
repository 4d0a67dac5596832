//! `cdnsign serve` - Run the HTTP signing service.

use anyhow::Context;
use std::path::PathBuf;

pub async fn run(config: Option<PathBuf>) -> anyhow::Result<()> {
    let cfg = cdnsign_server::load_config(config.as_deref())
        .context("failed to load configuration")?;

    cdnsign_server::serve(cfg)
        .await
        .context("signing service failed")
}
