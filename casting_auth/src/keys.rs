//! Sources of signing keys
//!
//! The verifier asks a [`KeySource`] for the current key set on every
//! verification. [`RemoteKeys`] fetches the identity provider's published set
//! and caches it for a bounded time. [`LocalKeys`] serves a fixed set.

use std::{fmt, sync::Arc};

use arc_swap::ArcSwap;
use async_trait::async_trait;

use crate::{error::KeySetError, jwk::Jwks};

mod backoff;
mod remote;

pub use backoff::ErrorBackoffConfig;
pub use remote::RemoteKeys;

/// Provides the signing key set used to verify tokens
#[async_trait]
pub trait KeySource: fmt::Debug + Send + Sync {
    /// The current key set
    ///
    /// # Errors
    ///
    /// Returns an error if the key set cannot be obtained.
    async fn get_keys(&self) -> Result<Arc<Jwks>, KeySetError>;

    /// A key set that is as fresh as the source allows
    ///
    /// Called when a token names a key that the current set does not contain.
    /// Sources may rate limit refreshes and return the current set instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the key set cannot be obtained.
    async fn refresh_keys(&self) -> Result<Arc<Jwks>, KeySetError> {
        self.get_keys().await
    }
}

#[async_trait]
impl<T> KeySource for Arc<T>
where
    T: KeySource + ?Sized,
{
    async fn get_keys(&self) -> Result<Arc<Jwks>, KeySetError> {
        (**self).get_keys().await
    }

    async fn refresh_keys(&self) -> Result<Arc<Jwks>, KeySetError> {
        (**self).refresh_keys().await
    }
}

/// A key set held in memory
///
/// The set can be replaced while in use.
#[derive(Debug)]
pub struct LocalKeys {
    keys: ArcSwap<Jwks>,
}

impl LocalKeys {
    /// Serves the given key set
    pub fn new(jwks: Jwks) -> Self {
        Self {
            keys: ArcSwap::from_pointee(jwks),
        }
    }

    /// Replaces the served key set
    pub fn replace(&self, jwks: Jwks) {
        self.keys.store(Arc::new(jwks));
    }
}

#[async_trait]
impl KeySource for LocalKeys {
    async fn get_keys(&self) -> Result<Arc<Jwks>, KeySetError> {
        Ok(self.keys.load_full())
    }
}
