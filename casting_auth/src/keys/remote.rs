use std::{sync::Arc, time::Duration};

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use http::{header, HeaderValue, StatusCode};
use tokio::{sync::Mutex, time::Instant};

use super::{
    backoff::{ErrorBackoffConfig, ErrorBackoffHandler},
    KeySource,
};
use crate::{config::AuthConfig, error::KeySetError, jwk::Jwks};

const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug)]
struct CachedKeys {
    jwks: Arc<Jwks>,
    fetched_at: Instant,
    etag: Option<HeaderValue>,
    last_modified: Option<HeaderValue>,
}

/// A key set fetched from an identity provider's JWKS endpoint
///
/// The fetched set is reused until the cache lifetime passes. An expired set
/// is never served: if the provider cannot be reached, the fetch fails. At
/// most one request to the provider is in flight at a time, and callers that
/// waited for it share its result.
#[derive(Debug)]
pub struct RemoteKeys {
    jwks_url: String,
    client: reqwest::Client,
    cache_ttl: Duration,
    min_refresh_interval: Duration,
    retries: u32,
    backoff: ErrorBackoffConfig,
    cached: ArcSwapOption<CachedKeys>,
    refill: Mutex<()>,
}

impl RemoteKeys {
    /// Fetches keys from `jwks_url`, giving up on a request after `timeout`
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(jwks_url: impl Into<String>, timeout: Duration) -> Result<Self, KeySetError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("casting_auth/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self::with_client(jwks_url, client))
    }

    /// Fetches keys from `jwks_url` using an existing HTTP client
    pub fn with_client(jwks_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            jwks_url: jwks_url.into(),
            client,
            cache_ttl: DEFAULT_CACHE_TTL,
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
            retries: 0,
            backoff: ErrorBackoffConfig::default(),
            cached: ArcSwapOption::empty(),
            refill: Mutex::new(()),
        }
    }

    /// Fetches keys from the provider named in `config`
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn from_config(config: &AuthConfig) -> Result<Self, KeySetError> {
        Ok(Self::new(config.jwks_url(), config.jwks_fetch_timeout())?
            .with_cache_ttl(config.jwks_cache_ttl())
            .with_min_refresh_interval(config.jwks_min_refresh_interval())
            .with_retries(config.jwks_fetch_retries()))
    }

    /// Sets how long a fetched key set is reused
    ///
    /// With a zero lifetime, every call to [`get_keys()`][KeySource::get_keys]
    /// goes to the provider.
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Sets the minimum time between refreshes forced by an unknown key ID
    #[must_use]
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    /// Sets how many times a failed request is retried
    #[must_use]
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Sets the delays between retries
    #[must_use]
    pub fn with_backoff(mut self, backoff: ErrorBackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    /// The URL the key set is fetched from
    #[must_use]
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    fn fresh(&self) -> Option<Arc<Jwks>> {
        match &*self.cached.load() {
            Some(cached) if cached.fetched_at.elapsed() < self.cache_ttl => {
                Some(Arc::clone(&cached.jwks))
            }
            _ => None,
        }
    }

    #[tracing::instrument(skip(self), fields(jwks.url = %self.jwks_url))]
    async fn fetch(&self) -> Result<Arc<Jwks>, KeySetError> {
        let mut backoff = ErrorBackoffHandler::new(self.backoff);
        let mut attempt = 0;

        loop {
            match self.fetch_once().await {
                Ok(jwks) => return Ok(jwks),
                Err(error) if attempt < self.retries => {
                    attempt += 1;
                    let delay = backoff.error();
                    tracing::warn!(
                        %error,
                        attempt,
                        retry_in_ms = delay.as_millis() as u64,
                        "key set fetch failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(error) => {
                    tracing::warn!(%error, "key set fetch failed");
                    return Err(error);
                }
            }
        }
    }

    async fn fetch_once(&self) -> Result<Arc<Jwks>, KeySetError> {
        let previous = self.cached.load_full();

        let mut request = self.client.get(&self.jwks_url);
        if let Some(prev) = &previous {
            if let Some(etag) = &prev.etag {
                request = request.header(header::IF_NONE_MATCH, etag.clone());
            }
            if let Some(last_modified) = &prev.last_modified {
                request = request.header(header::IF_MODIFIED_SINCE, last_modified.clone());
            }
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_MODIFIED {
            if let Some(prev) = previous {
                tracing::debug!("key set not modified");
                self.cached.store(Some(Arc::new(CachedKeys {
                    jwks: Arc::clone(&prev.jwks),
                    fetched_at: Instant::now(),
                    etag: prev.etag.clone(),
                    last_modified: prev.last_modified.clone(),
                })));
                return Ok(Arc::clone(&prev.jwks));
            }
        }

        if !status.is_success() {
            return Err(KeySetError::UnexpectedStatus(status));
        }

        let etag = response.headers().get(header::ETAG).cloned();
        let last_modified = response.headers().get(header::LAST_MODIFIED).cloned();
        let body = response.bytes().await?;
        let jwks: Jwks = serde_json::from_slice(&body)?;

        tracing::info!(jwks.keys = jwks.keys().len(), "refreshed signing key set");

        let jwks = Arc::new(jwks);
        self.cached.store(Some(Arc::new(CachedKeys {
            jwks: Arc::clone(&jwks),
            fetched_at: Instant::now(),
            etag,
            last_modified,
        })));

        Ok(jwks)
    }
}

#[async_trait]
impl KeySource for RemoteKeys {
    async fn get_keys(&self) -> Result<Arc<Jwks>, KeySetError> {
        if let Some(jwks) = self.fresh() {
            return Ok(jwks);
        }

        let _refill = self.refill.lock().await;

        if let Some(jwks) = self.fresh() {
            return Ok(jwks);
        }

        self.fetch().await
    }

    async fn refresh_keys(&self) -> Result<Arc<Jwks>, KeySetError> {
        let _refill = self.refill.lock().await;

        if let Some(cached) = self.cached.load_full() {
            if cached.fetched_at.elapsed() < self.min_refresh_interval {
                tracing::debug!(
                    jwks.url = %self.jwks_url,
                    "key set was refreshed recently; reusing it"
                );
                return Ok(Arc::clone(&cached.jwks));
            }
        }

        self.fetch().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use color_eyre::Result;
    use tracing_test::traced_test;

    use super::*;
    use crate::{
        jwk::KeyIdRef,
        test_support::{jwks_with, JwksServer, K1},
    };

    fn remote(server: &JwksServer) -> Result<RemoteKeys> {
        Ok(RemoteKeys::new(server.url(), Duration::from_secs(5))?)
    }

    #[tokio::test]
    async fn serves_cached_set_within_lifetime() -> Result<()> {
        let server = JwksServer::start(&jwks_with(&[("K1", &*K1)])).await;
        let keys = remote(&server)?;

        for _ in 0..3 {
            let jwks = keys.get_keys().await?;
            assert!(jwks.get_key_by_id(KeyIdRef::from_static("K1")).is_some());
        }

        assert_eq!(server.hits(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn zero_lifetime_fetches_every_time() -> Result<()> {
        let server = JwksServer::start(&jwks_with(&[("K1", &*K1)])).await;
        let keys = remote(&server)?.with_cache_ttl(Duration::ZERO);

        for _ in 0..3 {
            let jwks = keys.get_keys().await?;
            assert_eq!(jwks.keys().len(), 1);
        }

        assert_eq!(server.hits(), 3);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_cold_requests_share_one_fetch() -> Result<()> {
        let server = JwksServer::start(&jwks_with(&[("K1", &*K1)])).await;
        let keys = Arc::new(remote(&server)?);

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let keys = Arc::clone(&keys);
                tokio::spawn(async move { keys.get_keys().await })
            })
            .collect();

        for task in tasks {
            task.await??;
        }

        assert_eq!(server.hits(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn forced_refresh_is_rate_limited() -> Result<()> {
        let server = JwksServer::start(&jwks_with(&[("K1", &*K1)])).await;
        let keys = remote(&server)?;

        keys.get_keys().await?;
        keys.refresh_keys().await?;
        assert_eq!(server.hits(), 1);

        let eager = remote(&server)?.with_min_refresh_interval(Duration::ZERO);
        eager.get_keys().await?;
        eager.refresh_keys().await?;
        assert_eq!(server.hits(), 3);
        Ok(())
    }

    #[tokio::test]
    #[traced_test]
    async fn unsuccessful_status_is_an_error() -> Result<()> {
        let server = JwksServer::start_raw(r#"{"keys":[]}"#.to_owned(), usize::MAX).await;
        let keys = remote(&server)?;

        let err = keys.get_keys().await.unwrap_err();
        assert!(matches!(
            err,
            KeySetError::UnexpectedStatus(StatusCode::SERVICE_UNAVAILABLE)
        ));
        assert!(logs_contain("key set fetch failed"));
        Ok(())
    }

    #[tokio::test]
    async fn failed_fetch_is_retried_when_configured() -> Result<()> {
        let server = JwksServer::start_raw(r#"{"keys":[]}"#.to_owned(), 1).await;
        let keys = remote(&server)?.with_retries(1).with_backoff(ErrorBackoffConfig::new(
            Duration::from_millis(1),
            Duration::from_millis(1),
            2,
        ));

        keys.get_keys().await?;
        assert_eq!(server.hits(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn no_retries_by_default() -> Result<()> {
        let server = JwksServer::start_raw(r#"{"keys":[]}"#.to_owned(), 1).await;
        let keys = remote(&server)?;

        assert!(keys.get_keys().await.is_err());
        assert_eq!(server.hits(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn malformed_document_is_an_error() -> Result<()> {
        let server = JwksServer::start_raw(r#"{"not_keys":[]}"#.to_owned(), 0).await;
        let keys = remote(&server)?;

        assert!(matches!(
            keys.get_keys().await,
            Err(KeySetError::Malformed(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn expired_set_is_revalidated_with_etag() -> Result<()> {
        let server = JwksServer::start(&jwks_with(&[("K1", &*K1)])).await;
        let keys = remote(&server)?.with_cache_ttl(Duration::ZERO);

        let first = keys.get_keys().await?;
        let second = keys.get_keys().await?;

        assert!(Arc::ptr_eq(&first, &second), "304 should reuse the cached set");
        assert_eq!(server.hits(), 2);
        Ok(())
    }

    #[test]
    fn url_comes_from_configuration() -> Result<()> {
        let config = AuthConfig::new("tenant.auth0.com", "casting")?;
        let keys = RemoteKeys::from_config(&config)?;
        assert_eq!(keys.jwks_url(), "https://tenant.auth0.com/.well-known/jwks.json");
        Ok(())
    }
}
