//! Token verification against the provider's signing keys

use std::sync::Arc;

use crate::{
    clock::{Clock, System},
    config::AuthConfig,
    error::{self, AuthError, JwtVerifyError},
    jwk::KeyId,
    jwt::{ClaimSet, JwtRef, Validator},
    keys::KeySource,
};

/// Verifies bearer tokens and produces their claims
///
/// Verification proceeds in a fixed order, and the first failure ends it:
///
/// 1. decode the token header and require a `kid`
/// 2. obtain the key set, refreshing it once if the `kid` is unknown
/// 3. require an approved algorithm and a compatible key
/// 4. check the signature
/// 5. check expiry, then audience, then issuer
#[derive(Clone, Debug)]
pub struct TokenVerifier {
    keys: Arc<dyn KeySource>,
    validator: Validator,
    clock: Arc<dyn Clock>,
}

impl TokenVerifier {
    /// Constructs a verifier that checks tokens against keys from `keys`
    pub fn new(keys: impl KeySource + 'static, validator: Validator) -> Self {
        Self {
            keys: Arc::new(keys),
            validator,
            clock: Arc::new(System),
        }
    }

    /// Constructs a verifier using the claims requirements in `config`
    pub fn from_config(config: &AuthConfig, keys: impl KeySource + 'static) -> Self {
        Self::new(keys, config.validator())
    }

    /// Replaces the clock used to check expiry
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The claims validator in use
    #[must_use]
    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Verifies `token` and returns its claims
    ///
    /// # Errors
    ///
    /// * `invalid_header` (401) if the token is malformed or names no key
    /// * `invalid_header` (400) if no matching key exists, the key set cannot be
    ///   obtained, or the algorithm, key, or signature is unacceptable
    /// * `token_expired` (401) if the token has expired
    /// * `invalid_claims` (401) if the audience or issuer is wrong or missing
    pub async fn verify(&self, token: &JwtRef) -> Result<ClaimSet, AuthError> {
        let decomposed = token.decompose().map_err(reject)?;

        let kid: KeyId = decomposed
            .untrusted_header()
            .kid()
            .map(ToOwned::to_owned)
            .ok_or_else(error::missing_key_id)
            .map_err(reject)?;

        let mut keys = self.keys.get_keys().await.map_err(key_set_unavailable)?;

        if keys.get_key_by_id(&kid).is_none() {
            tracing::debug!(jwk.kid = %kid, "key ID not in key set; refreshing");
            keys = self
                .keys
                .refresh_keys()
                .await
                .map_err(key_set_unavailable)?;
        }

        let Some(jwk) = keys.get_key_by_id(&kid) else {
            tracing::debug!(jwk.kid = %kid, "no signing key matches token");
            return Err(error::unknown_signing_key());
        };

        let alg = self
            .validator
            .approve_algorithm(decomposed.untrusted_header().alg())
            .map_err(reject)?;

        let key = jwk.verifying_key(alg).map_err(reject)?;

        let claims = decomposed
            .verify(&key, alg, &self.validator, &*self.clock)
            .map_err(reject)?;

        tracing::debug!(jwk.kid = %kid, jwt.alg = %alg, "token verified");

        Ok(claims)
    }
}

fn reject(err: impl Into<JwtVerifyError>) -> AuthError {
    let err = err.into();
    tracing::debug!(error = %err, "token rejected");
    AuthError::from(err)
}

fn key_set_unavailable(err: error::KeySetError) -> AuthError {
    tracing::warn!(error = %err, "unable to obtain signing key set; rejecting token");
    AuthError::from(err)
}
