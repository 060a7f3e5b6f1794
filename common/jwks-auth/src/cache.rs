use std::collections::HashSet;

use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::error::{JwksError, JwksResult};
use crate::jwks::{JwksFetcher, SigningKey};

/// Immutable snapshot of the provider's keys, in fetch order.
#[derive(Debug, Clone, Default)]
pub struct KeySet {
    keys: Vec<SigningKey>,
}

impl KeySet {
    pub fn new(keys: Vec<SigningKey>) -> Self {
        Self { keys }
    }

    /// First key whose `kid` matches exactly.
    pub fn find(&self, kid: &str) -> Option<&SigningKey> {
        self.keys.iter().find(|key| key.kid() == kid)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn duplicate_kids(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.keys
            .iter()
            .map(SigningKey::kid)
            .filter(|kid| !seen.insert(*kid))
            .collect()
    }
}

/// Key set fetched at most once per process and read-only afterwards.
pub struct KeySetCache {
    fetcher: Option<JwksFetcher>,
    keys: OnceCell<KeySet>,
}

impl KeySetCache {
    pub fn new(fetcher: JwksFetcher) -> Self {
        Self {
            fetcher: Some(fetcher),
            keys: OnceCell::new(),
        }
    }

    /// Cache that is already populated and never touches the network.
    pub fn preloaded(keys: KeySet) -> Self {
        Self {
            fetcher: None,
            keys: OnceCell::new_with(Some(keys)),
        }
    }

    /// Populates the cache on first call. Concurrent first callers share a
    /// single fetch; once populated this never fetches again. A failed fetch
    /// leaves the cache empty and is not retried here.
    pub async fn load(&self) -> JwksResult<&KeySet> {
        self.keys.get_or_try_init(|| self.fetch_key_set()).await
    }

    async fn fetch_key_set(&self) -> JwksResult<KeySet> {
        let fetcher = self.fetcher.as_ref().ok_or(JwksError::NotConfigured)?;
        let keys = KeySet::new(fetcher.fetch().await?);
        for kid in keys.duplicate_kids() {
            warn!(kid, jwks_url = %fetcher.url(), "duplicate kid in JWKS; first entry wins");
        }
        info!(count = keys.len(), jwks_url = %fetcher.url(), "loaded JWKS keys");
        Ok(keys)
    }

    pub fn is_loaded(&self) -> bool {
        self.keys.initialized()
    }

    /// Lookup by key identifier. An unloaded cache holds no keys.
    pub fn find(&self, kid: &str) -> Option<&SigningKey> {
        self.keys.get().and_then(|keys| keys.find(kid))
    }

    pub fn jwks_url(&self) -> Option<&str> {
        self.fetcher.as_ref().map(JwksFetcher::url)
    }
}
