use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::error::{JwksError, JwksResult};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// One public key from the provider's key set. Material is kept as published;
/// the verifier turns it into a usable key per token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningKey {
    kid: String,
    algorithm: Option<String>,
    kty: String,
    n: Option<String>,
    e: Option<String>,
}

impl SigningKey {
    pub fn rsa(
        kid: impl Into<String>,
        algorithm: impl Into<String>,
        n: impl Into<String>,
        e: impl Into<String>,
    ) -> Self {
        Self {
            kid: kid.into(),
            algorithm: Some(algorithm.into()),
            kty: "RSA".to_string(),
            n: Some(n.into()),
            e: Some(e.into()),
        }
    }

    /// Builds a key from a single JSON Web Key object.
    pub fn from_jwk(jwk: serde_json::Value) -> JwksResult<Self> {
        let entry: JwkEntry =
            serde_json::from_value(jwk).map_err(|err| JwksError::Decode(err.to_string()))?;
        Self::from_entry(entry)
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn algorithm(&self) -> Option<&str> {
        self.algorithm.as_deref()
    }

    pub fn key_type(&self) -> &str {
        &self.kty
    }

    /// RSA modulus and exponent, base64url encoded.
    pub fn rsa_components(&self) -> Option<(&str, &str)> {
        match (&self.n, &self.e) {
            (Some(n), Some(e)) => Some((n.as_str(), e.as_str())),
            _ => None,
        }
    }

    fn from_entry(entry: JwkEntry) -> JwksResult<Self> {
        let kid = entry.kid.ok_or(JwksError::MissingKid)?;
        let kty = entry.kty.unwrap_or_else(|| "RSA".to_string());
        // RSA keys without an explicit alg are published for RS256
        let algorithm = match entry.alg {
            Some(alg) => Some(alg),
            None if kty == "RSA" => Some("RS256".to_string()),
            None => None,
        };
        Ok(Self {
            kid,
            algorithm,
            kty,
            n: entry.n,
            e: entry.e,
        })
    }
}

#[derive(Clone)]
pub struct JwksFetcher {
    client: Client,
    url: String,
}

impl JwksFetcher {
    pub fn new(url: impl Into<String>) -> JwksResult<Self> {
        Self::with_timeout(url, DEFAULT_FETCH_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> JwksResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| JwksError::Client(err.to_string()))?;
        Ok(Self::with_client(client, url))
    }

    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Single GET of the key set document, no retries.
    pub async fn fetch(&self) -> JwksResult<Vec<SigningKey>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|err| JwksError::Fetch(err.to_string()))?;

        if !response.status().is_success() {
            return Err(JwksError::Status {
                status: response.status().as_u16(),
                url: self.url.clone(),
            });
        }

        let body: JwksResponse = response
            .json()
            .await
            .map_err(|err| JwksError::Decode(err.to_string()))?;

        let keys = body
            .keys
            .into_iter()
            .map(SigningKey::from_entry)
            .collect::<JwksResult<Vec<_>>>()?;
        if keys.is_empty() {
            return Err(JwksError::Empty(self.url.clone()));
        }
        Ok(keys)
    }
}

#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<JwkEntry>,
}

#[derive(Debug, Deserialize)]
struct JwkEntry {
    kid: Option<String>,
    kty: Option<String>,
    alg: Option<String>,
    n: Option<String>,
    e: Option<String>,
}
