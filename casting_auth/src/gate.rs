//! The authorization gate in front of protected operations

use std::{future::Future, sync::Arc};

use http::HeaderMap;

use crate::{
    config::AuthConfig,
    error::{AuthError, KeySetError},
    extract::extract_bearer,
    jwt::ClaimSet,
    keys::RemoteKeys,
    permission::{check_permission, PermissionRef},
    verifier::TokenVerifier,
};

/// Runs extraction, verification, and permission checks for a request
///
/// Cloning an `Authorizer` is cheap, and all clones share the same verifier
/// and key cache.
#[derive(Clone, Debug)]
pub struct Authorizer {
    verifier: Arc<TokenVerifier>,
}

impl Authorizer {
    /// Wraps a token verifier
    pub fn new(verifier: TokenVerifier) -> Self {
        Self {
            verifier: Arc::new(verifier),
        }
    }

    /// Builds an authorizer that fetches keys from the provider named in `config`
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client for the key set cannot be constructed.
    pub fn from_config(config: &AuthConfig) -> Result<Self, KeySetError> {
        let keys = RemoteKeys::from_config(config)?;
        Ok(Self::new(TokenVerifier::from_config(config, keys)))
    }

    /// Authorizes a request that requires the `required` permission
    ///
    /// Extraction, verification, and the permission check run in order and
    /// the first failure is returned unchanged. On success the verified claims
    /// are returned.
    ///
    /// # Errors
    ///
    /// Returns the first [`AuthError`] encountered.
    #[tracing::instrument(level = "debug", skip_all, fields(permission = %required))]
    pub async fn authorize(
        &self,
        required: &PermissionRef,
        headers: &HeaderMap,
    ) -> Result<ClaimSet, AuthError> {
        let token = extract_bearer(headers)?;
        let claims = self.verifier.verify(&token).await?;
        check_permission(required, &claims)?;
        Ok(claims)
    }

    /// Runs `operation` with the verified claims if the request is authorized
    ///
    /// `operation` is not invoked at all when authorization fails.
    ///
    /// # Errors
    ///
    /// Returns the first [`AuthError`] encountered.
    pub async fn call<F, Fut, T>(
        &self,
        required: &PermissionRef,
        headers: &HeaderMap,
        operation: F,
    ) -> Result<T, AuthError>
    where
        F: FnOnce(ClaimSet) -> Fut,
        Fut: Future<Output = T>,
    {
        let claims = self.authorize(required, headers).await?;
        Ok(operation(claims).await)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use color_eyre::Result;
    use http::{header, HeaderValue, StatusCode};

    use super::*;
    use crate::{
        clock::TestClock,
        jwt::{Jwt, Validator},
        keys::LocalKeys,
        permission::Permission,
        test_support::{jwks_with, sign, valid_payload, AUDIENCE, ISSUER, K1, NOW},
        ErrorCode,
    };

    fn authorizer() -> Authorizer {
        Authorizer::new(
            TokenVerifier::new(
                LocalKeys::new(jwks_with(&[("K1", &*K1)])),
                Validator::new(AUDIENCE, ISSUER),
            )
            .with_clock(Arc::new(TestClock::new(NOW))),
        )
    }

    fn bearer(token: &Jwt) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::try_from(format!("Bearer {:#}", token))?,
        );
        Ok(headers)
    }

    #[tokio::test]
    async fn grants_held_permission() -> Result<()> {
        let headers = bearer(&sign("K1", &K1, valid_payload()))?;
        let claims = authorizer()
            .authorize(PermissionRef::from_static("get:movies"), &headers)
            .await?;

        assert_eq!(
            claims.permissions(),
            Some(&[Permission::from_static("get:movies")][..])
        );
        Ok(())
    }

    #[tokio::test]
    async fn missing_credential_stops_at_extraction() {
        let err = authorizer()
            .authorize(PermissionRef::from_static("get:movies"), &HeaderMap::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::MissingAuthorizationHeader);
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn lacking_permission_is_unauthorized() -> Result<()> {
        let headers = bearer(&sign("K1", &K1, valid_payload()))?;
        let err = authorizer()
            .authorize(PermissionRef::from_static("delete:movie"), &headers)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unauthorized);
        Ok(())
    }

    #[tokio::test]
    async fn permissions_claim_absent_is_a_bad_request() -> Result<()> {
        let mut payload = valid_payload();
        if let Some(claims) = payload.as_object_mut() {
            claims.remove("permissions");
        }
        let headers = bearer(&sign("K1", &K1, payload))?;

        let err = authorizer()
            .authorize(PermissionRef::from_static("get:movies"), &headers)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidClaims);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        authorizer()
            .authorize(PermissionRef::unrestricted(), &headers)
            .await?;
        Ok(())
    }

    #[tokio::test]
    async fn operation_receives_claims() -> Result<()> {
        let headers = bearer(&sign("K1", &K1, valid_payload()))?;
        let subject = authorizer()
            .call(PermissionRef::from_static("get:movies"), &headers, |claims| async move {
                claims.subject().map(|s| s.as_str().to_owned())
            })
            .await?;

        assert_eq!(subject.as_deref(), Some("auth0|casting-director"));
        Ok(())
    }

    #[tokio::test]
    async fn operation_is_skipped_on_failure() {
        let invoked = AtomicBool::new(false);
        let result = authorizer()
            .call(PermissionRef::from_static("get:movies"), &HeaderMap::new(), |_| async {
                invoked.store(true, Ordering::SeqCst);
            })
            .await;

        assert!(result.is_err());
        assert!(!invoked.load(Ordering::SeqCst));
    }
}
