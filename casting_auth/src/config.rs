//! Verification settings
//!
//! An [`AuthConfig`] is built once at startup and handed to the components
//! that need it. Nothing in this crate reads the process environment.

use std::time::Duration;

use thiserror::Error;

use crate::{
    jwa::Algorithm,
    jwt::{Audience, Issuer, Validator},
};

const DEFAULT_JWKS_CACHE_TTL: Duration = Duration::from_secs(300);
const DEFAULT_JWKS_FETCH_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_JWKS_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// The configuration is unusable
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No identity provider domain was given
    #[error("identity provider domain must not be empty")]
    EmptyDomain,

    /// No audience was given
    #[error("API audience must not be empty")]
    EmptyAudience,

    /// No algorithms were approved
    #[error("at least one signing algorithm must be allowed")]
    NoAlgorithms,
}

/// Settings for verifying tokens issued by a single identity provider
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthConfig {
    domain: String,
    audience: Audience,
    algorithms: Vec<Algorithm>,
    leeway: Duration,
    jwks_cache_ttl: Duration,
    jwks_fetch_timeout: Duration,
    jwks_min_refresh_interval: Duration,
    jwks_fetch_retries: u32,
}

impl AuthConfig {
    /// Constructs a configuration for the given provider domain and API audience
    ///
    /// The domain is a bare host name such as `tenant.auth0.com`. By default only
    /// `RS256` is allowed, expiry is checked without leeway, and the key set is
    /// cached for five minutes.
    ///
    /// # Errors
    ///
    /// Returns an error if either value is empty.
    pub fn new(domain: impl Into<String>, audience: impl Into<Audience>) -> Result<Self, ConfigError> {
        let domain = domain.into();
        let domain = domain.trim().trim_end_matches('/');
        if domain.is_empty() {
            return Err(ConfigError::EmptyDomain);
        }

        let audience = audience.into();
        if audience.as_str().is_empty() {
            return Err(ConfigError::EmptyAudience);
        }

        Ok(Self {
            domain: domain.to_owned(),
            audience,
            algorithms: vec![Algorithm::RS256],
            leeway: Duration::ZERO,
            jwks_cache_ttl: DEFAULT_JWKS_CACHE_TTL,
            jwks_fetch_timeout: DEFAULT_JWKS_FETCH_TIMEOUT,
            jwks_min_refresh_interval: DEFAULT_JWKS_MIN_REFRESH_INTERVAL,
            jwks_fetch_retries: 0,
        })
    }

    /// Replaces the allowed signing algorithms
    ///
    /// # Errors
    ///
    /// Returns an error if no algorithms are given.
    pub fn with_algorithms<I>(mut self, algorithms: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = Algorithm>,
    {
        let mut algs: Vec<Algorithm> = Vec::new();
        for alg in algorithms {
            if !algs.contains(&alg) {
                algs.push(alg);
            }
        }

        if algs.is_empty() {
            return Err(ConfigError::NoAlgorithms);
        }

        self.algorithms = algs;
        Ok(self)
    }

    /// Grants leeway when checking token expiry
    #[must_use]
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    /// Sets how long a fetched key set is reused
    ///
    /// A zero duration fetches the key set for every verification.
    #[must_use]
    pub fn with_jwks_cache_ttl(mut self, ttl: Duration) -> Self {
        self.jwks_cache_ttl = ttl;
        self
    }

    /// Sets the timeout for a single key set request
    #[must_use]
    pub fn with_jwks_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.jwks_fetch_timeout = timeout;
        self
    }

    /// Sets the minimum time between forced refreshes for unknown key IDs
    #[must_use]
    pub fn with_jwks_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.jwks_min_refresh_interval = interval;
        self
    }

    /// Sets how many times a failed key set request is retried
    #[must_use]
    pub fn with_jwks_fetch_retries(mut self, retries: u32) -> Self {
        self.jwks_fetch_retries = retries;
        self
    }

    /// The identity provider domain
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// The expected token audience
    #[must_use]
    pub fn audience(&self) -> &Audience {
        &self.audience
    }

    /// The expected token issuer, `https://<domain>/`
    pub fn issuer(&self) -> Issuer {
        Issuer::new(format!("https://{}/", self.domain))
    }

    /// The location of the provider's published key set
    #[must_use]
    pub fn jwks_url(&self) -> String {
        format!("https://{}/.well-known/jwks.json", self.domain)
    }

    /// The allowed signing algorithms
    #[must_use]
    pub fn algorithms(&self) -> &[Algorithm] {
        &self.algorithms
    }

    /// Leeway granted when checking expiry
    #[must_use]
    pub fn leeway(&self) -> Duration {
        self.leeway
    }

    /// How long a fetched key set is reused
    #[must_use]
    pub fn jwks_cache_ttl(&self) -> Duration {
        self.jwks_cache_ttl
    }

    /// Timeout for a single key set request
    #[must_use]
    pub fn jwks_fetch_timeout(&self) -> Duration {
        self.jwks_fetch_timeout
    }

    /// Minimum time between forced refreshes
    #[must_use]
    pub fn jwks_min_refresh_interval(&self) -> Duration {
        self.jwks_min_refresh_interval
    }

    /// How many times a failed key set request is retried
    #[must_use]
    pub fn jwks_fetch_retries(&self) -> u32 {
        self.jwks_fetch_retries
    }

    /// Builds the claims validator described by this configuration
    pub fn validator(&self) -> Validator {
        Validator::new(self.audience.clone(), self.issuer())
            .with_approved_algorithms(self.algorithms.iter().copied())
            .with_leeway(self.leeway)
    }
}
