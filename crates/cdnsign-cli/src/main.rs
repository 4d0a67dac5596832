use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "cdnsign", version, about = "Issue CDN signed URLs and signed cookies")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP signing service.
    Serve {
        /// Path to the TOML config file
        #[arg(long, env = "CDNSIGN_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Issue a single signed URL or cookie set.
    Sign(commands::sign::SignArgs),

    /// Signing key utilities
    Key {
        #[command(subcommand)]
        cmd: KeyCommand,
    },
}

#[derive(Subcommand, Debug)]
enum KeyCommand {
    /// Load a PEM private key and print its public half.
    Check {
        /// Key file path, or env:VAR to read PEM text from an environment variable
        #[arg(long, env = "CDNSIGN_PRIVATE_KEY_SOURCE")]
        key: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Serve { config } => commands::serve::run(config).await?,
        Command::Sign(args) => commands::sign::run(&args)?,
        Command::Key { cmd } => match cmd {
            KeyCommand::Check { key } => commands::key::check(&key)?,
        },
    }

    Ok(())
}
