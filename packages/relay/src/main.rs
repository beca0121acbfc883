use clap::Parser;
use tracing_subscriber::EnvFilter;

use pr4kh4r_relay::config::Config;

#[derive(Parser)]
#[command(name = "pr4kh4r-relay")]
#[command(about = "OAuth token-exchange relay for Pr4kh4r AI")]
#[command(version)]
struct Cli {
    /// Port to listen on (overrides PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Allowed browser origin (overrides CORS_ORIGIN)
    #[arg(long)]
    cors_origin: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(origin) = cli.cors_origin {
        config.cors_origin = origin;
    }

    pr4kh4r_relay::run_server(config).await
}
