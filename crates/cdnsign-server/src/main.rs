use anyhow::Context;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = cdnsign_server::load_config(None).context("failed to load configuration")?;
    cdnsign_server::serve(cfg)
        .await
        .context("cdnsign-server failed")?;

    Ok(())
}
