use anyhow::{anyhow, Context, Result};
use jwks_auth::{cognito_jwks_url, Algorithm, AudienceClaim, VerifierConfig};
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub region: String,
    pub user_pool_id: String,
    pub app_client_id: String,
    pub jwks_url: String,
    pub fetch_timeout: Duration,
    pub allowed_algorithms: Vec<Algorithm>,
    pub audience_claim: AudienceClaim,
    pub leeway_seconds: u32,
}

impl ServiceConfig {
    pub fn verifier_config(&self) -> VerifierConfig {
        VerifierConfig::new(self.app_client_id.clone())
            .with_allowed_algorithms(self.allowed_algorithms.iter().copied())
            .with_audience_claim(self.audience_claim)
            .with_leeway(self.leeway_seconds)
    }
}

pub fn load_service_config() -> Result<ServiceConfig> {
    service_config_from(|key| env::var(key).ok())
}

pub fn service_config_from<F>(lookup: F) -> Result<ServiceConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let required = |key: &str| {
        lookup(key)
            .and_then(|value| normalize_optional(&value))
            .with_context(|| format!("{key} must be set"))
    };

    let region = required("COGNITO_REGION")?;
    let user_pool_id = required("COGNITO_USER_POOL_ID")?;
    let app_client_id = required("COGNITO_APP_CLIENT_ID")?;

    let jwks_url = lookup("JWKS_URL")
        .and_then(|value| normalize_optional(&value))
        .unwrap_or_else(|| cognito_jwks_url(&region, &user_pool_id));

    let fetch_timeout = lookup("JWKS_FETCH_TIMEOUT_SECONDS")
        .map(|value| value.trim().parse::<u64>())
        .transpose()
        .context("Failed to parse JWKS_FETCH_TIMEOUT_SECONDS")?
        .map(Duration::from_secs)
        .unwrap_or(jwks_auth::DEFAULT_FETCH_TIMEOUT);

    let allowed_algorithms = lookup("JWT_ALLOWED_ALGORITHMS")
        .map(|value| parse_algorithms(&value))
        .transpose()
        .context("Failed to parse JWT_ALLOWED_ALGORITHMS")?
        .unwrap_or_else(|| vec![Algorithm::RS256]);

    let audience_claim = lookup("JWT_AUDIENCE_CLAIM")
        .map(|value| parse_audience_claim(&value))
        .transpose()
        .context("Failed to parse JWT_AUDIENCE_CLAIM")?
        .unwrap_or(AudienceClaim::Aud);

    let leeway_seconds = lookup("JWT_LEEWAY_SECONDS")
        .map(|value| value.trim().parse::<u32>())
        .transpose()
        .context("Failed to parse JWT_LEEWAY_SECONDS")?
        .unwrap_or(0);

    Ok(ServiceConfig {
        region,
        user_pool_id,
        app_client_id,
        jwks_url,
        fetch_timeout,
        allowed_algorithms,
        audience_claim,
        leeway_seconds,
    })
}

fn parse_algorithms(value: &str) -> Result<Vec<Algorithm>> {
    let mut algorithms = Vec::new();
    for item in value.split(|c| c == ',' || c == ';' || c == ' ') {
        let trimmed = item.trim();
        if trimmed.is_empty() {
            continue;
        }
        let algorithm = Algorithm::from_str(&trimmed.to_ascii_uppercase())
            .map_err(|_| anyhow!("Unknown JWT algorithm '{trimmed}'"))?;
        if !algorithms.contains(&algorithm) {
            algorithms.push(algorithm);
        }
    }
    if algorithms.is_empty() {
        return Err(anyhow!("At least one algorithm must be allowed"));
    }
    Ok(algorithms)
}

fn parse_audience_claim(value: &str) -> Result<AudienceClaim> {
    match value.trim().to_ascii_lowercase().as_str() {
        "aud" => Ok(AudienceClaim::Aud),
        "client_id" => Ok(AudienceClaim::ClientId),
        other => Err(anyhow!(
            "Unsupported audience claim '{other}'. Use aud or client_id."
        )),
    }
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
