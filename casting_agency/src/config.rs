//! Process configuration
//!
//! Values are read from command-line flags, falling back to environment
//! variables of the same name. A `.env` file is honored when present.

use std::{net::SocketAddr, time::Duration};

use casting_auth::{jwa::Algorithm, AuthConfig, ConfigError};
use clap::Parser;

/// Serve the Casting Agency API
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Opts {
    /// The identity provider's domain, such as `casting.eu.auth0.com`
    #[arg(long, env)]
    pub auth0_domain: String,

    /// The audience that tokens must be issued for
    #[arg(long, env)]
    pub api_audience: String,

    /// Comma-separated list of allowed signing algorithms
    #[arg(long, env, value_delimiter = ',', default_value = "RS256")]
    pub algorithms: Vec<Algorithm>,

    /// The address to listen on
    #[arg(long, env, default_value = "127.0.0.1:8080")]
    pub bind_address: SocketAddr,

    /// How long a fetched signing key set is reused, in seconds
    #[arg(long, env, default_value_t = 300)]
    pub jwks_cache_ttl_secs: u64,

    /// Timeout for fetching the signing key set, in seconds
    #[arg(long, env, default_value_t = 5)]
    pub jwks_fetch_timeout_secs: u64,

    /// How many times a failed key set fetch is retried
    #[arg(long, env, default_value_t = 0)]
    pub jwks_fetch_retries: u32,

    /// Leeway granted when checking token expiry, in seconds
    #[arg(long, env, default_value_t = 0)]
    pub token_leeway_secs: u64,
}

impl Opts {
    /// Builds the token verification settings
    ///
    /// # Errors
    ///
    /// Returns an error if the domain, audience, or algorithm list is empty.
    pub fn auth_config(&self) -> Result<AuthConfig, ConfigError> {
        Ok(AuthConfig::new(&self.auth0_domain, self.api_audience.as_str())?
            .with_algorithms(self.algorithms.iter().copied())?
            .with_leeway(Duration::from_secs(self.token_leeway_secs))
            .with_jwks_cache_ttl(Duration::from_secs(self.jwks_cache_ttl_secs))
            .with_jwks_fetch_timeout(Duration::from_secs(self.jwks_fetch_timeout_secs))
            .with_jwks_fetch_retries(self.jwks_fetch_retries))
    }
}
