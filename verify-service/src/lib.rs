pub mod config;
pub mod handler;

use anyhow::{Context, Result};
use jwks_auth::{JwksFetcher, TokenVerifier};
use tracing::info;

use crate::config::ServiceConfig;

/// Fetches the key set once. Any failure here leaves the service unable to
/// verify anything and must abort startup.
pub async fn build_verifier(config: &ServiceConfig) -> Result<TokenVerifier> {
    info!(
        jwks_url = %config.jwks_url,
        region = %config.region,
        user_pool_id = %config.user_pool_id,
        "Configuring JWKS fetcher"
    );
    let fetcher = JwksFetcher::with_timeout(config.jwks_url.clone(), config.fetch_timeout)
        .context("failed to build JWKS client")?;
    let verifier = TokenVerifier::builder(config.verifier_config())
        .with_jwks_fetcher(fetcher)
        .build()
        .await
        .with_context(|| format!("failed to load JWKS from {}", config.jwks_url))?;
    info!("token verifier initialised");
    Ok(verifier)
}
