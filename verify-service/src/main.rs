use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::EnvFilter;

use verify_service::config::load_service_config;
use verify_service::{build_verifier, handler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = load_service_config()?;
    let verifier = build_verifier(&config).await?;

    let input = BufReader::new(tokio::io::stdin());
    let handled = handler::run(&verifier, input, tokio::io::stdout()).await?;
    info!(handled, "input closed; shutting down");
    Ok(())
}
