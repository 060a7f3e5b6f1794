use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{crypto, Algorithm, DecodingKey};
use tracing::{debug, warn};

use crate::cache::{KeySet, KeySetCache};
use crate::claims::{check_audience, check_expiration, Claims};
use crate::config::VerifierConfig;
use crate::error::{JwksError, JwksResult, VerificationFailure, VerifyResult};
use crate::jwks::{JwksFetcher, SigningKey};
use crate::token::CompactToken;

/// Verifies tokens against a shared, already populated key set.
#[derive(Clone)]
pub struct TokenVerifier {
    config: VerifierConfig,
    cache: Arc<KeySetCache>,
}

impl TokenVerifier {
    pub fn builder(config: VerifierConfig) -> TokenVerifierBuilder {
        TokenVerifierBuilder::new(config)
    }

    /// Verifier over a fixed set of keys; performs no network I/O.
    pub fn with_key_set(config: VerifierConfig, keys: KeySet) -> Self {
        Self {
            config,
            cache: Arc::new(KeySetCache::preloaded(keys)),
        }
    }

    pub fn cache(&self) -> &Arc<KeySetCache> {
        &self.cache
    }

    /// Verifies against the current wall-clock time.
    pub fn verify(&self, token: &str) -> VerifyResult<Claims> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Runs the full pipeline with `now` in Unix seconds. Every rejection is
    /// logged with its reason before being returned.
    pub fn verify_at(&self, token: &str, now: i64) -> VerifyResult<Claims> {
        self.run_pipeline(token, now).inspect_err(|failure| {
            warn!(reason = failure.reason(), error = %failure, "token rejected");
        })
    }

    fn run_pipeline(&self, raw: &str, now: i64) -> VerifyResult<Claims> {
        let token = CompactToken::parse(raw)?;
        let header = token.header()?;

        let signing_key = self
            .cache
            .find(&header.kid)
            .ok_or_else(|| VerificationFailure::KeyNotFound(header.kid.clone()))?;

        let (algorithm, decoding_key) = self.construct_key(signing_key, &header.alg)?;

        // signature covers the literal header.payload bytes of the input
        let verified = crypto::verify(
            token.signature(),
            token.signing_input().as_bytes(),
            &decoding_key,
            algorithm,
        )
        .unwrap_or(false);
        if !verified {
            return Err(VerificationFailure::SignatureInvalid);
        }

        let claims = token.claims()?;
        check_expiration(&claims, now, self.config.leeway_seconds)?;
        check_audience(&claims, self.config.audience_claim, &self.config.audience)?;

        debug!(kid = %header.kid, "verified token successfully");
        Ok(Claims::new(claims))
    }

    /// The algorithm comes from the cached key; the header may only agree with it.
    fn construct_key(
        &self,
        key: &SigningKey,
        header_alg: &str,
    ) -> VerifyResult<(Algorithm, DecodingKey)> {
        let kid = key.kid();
        let declared = key.algorithm().ok_or_else(|| {
            VerificationFailure::UnsupportedAlgorithm(format!("key '{kid}' declares no algorithm"))
        })?;

        let algorithm = Algorithm::from_str(declared).map_err(|_| {
            VerificationFailure::UnsupportedAlgorithm(format!(
                "key '{kid}' declares unknown alg '{declared}'"
            ))
        })?;
        if !is_rsa(algorithm) || !self.config.allowed_algorithms.contains(&algorithm) {
            return Err(VerificationFailure::UnsupportedAlgorithm(format!(
                "alg '{declared}' of key '{kid}' is not allowed"
            )));
        }
        if header_alg != declared {
            return Err(VerificationFailure::UnsupportedAlgorithm(format!(
                "token alg '{header_alg}' does not match key '{kid}' alg '{declared}'"
            )));
        }
        if key.key_type() != "RSA" {
            return Err(VerificationFailure::UnsupportedAlgorithm(format!(
                "key '{kid}' has type '{}' but alg '{declared}' requires RSA",
                key.key_type()
            )));
        }

        let (modulus, exponent) = key.rsa_components().ok_or_else(|| {
            VerificationFailure::UnsupportedAlgorithm(format!("key '{kid}' missing RSA components"))
        })?;
        let decoding_key = DecodingKey::from_rsa_components(modulus, exponent).map_err(|err| {
            VerificationFailure::UnsupportedAlgorithm(format!(
                "key '{kid}' has unusable RSA material: {err}"
            ))
        })?;
        Ok((algorithm, decoding_key))
    }
}

fn is_rsa(algorithm: Algorithm) -> bool {
    matches!(
        algorithm,
        Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512
    )
}

pub struct TokenVerifierBuilder {
    config: VerifierConfig,
    cache: Option<Arc<KeySetCache>>,
}

impl TokenVerifierBuilder {
    fn new(config: VerifierConfig) -> Self {
        Self {
            config,
            cache: None,
        }
    }

    pub fn with_jwks_url(self, url: impl Into<String>) -> JwksResult<Self> {
        Ok(self.with_jwks_fetcher(JwksFetcher::new(url)?))
    }

    pub fn with_jwks_fetcher(self, fetcher: JwksFetcher) -> Self {
        self.with_cache(Arc::new(KeySetCache::new(fetcher)))
    }

    /// Shares a cache with other verifiers; it is still fetched at most once.
    pub fn with_cache(mut self, cache: Arc<KeySetCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_key_set(self, keys: KeySet) -> Self {
        self.with_cache(Arc::new(KeySetCache::preloaded(keys)))
    }

    /// Populates the cache before returning, so a verifier never exists
    /// without keys.
    pub async fn build(self) -> JwksResult<TokenVerifier> {
        let cache = self.cache.ok_or(JwksError::NotConfigured)?;
        cache.load().await?;
        Ok(TokenVerifier {
            config: self.config,
            cache,
        })
    }
}
