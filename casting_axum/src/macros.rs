//! Extractors that assert a presented token grants a given permission

/// Constructs an extractor that authorizes the request for a single permission
///
/// For a more concise way to construct several guards, see
/// [`permission_guards!`][crate::permission_guards!].
///
/// ```
/// use casting_axum::permission_guard;
///
/// permission_guard!(ReadMovies; "get:movies");
///
/// assert_eq!(ReadMovies::PERMISSION, "get:movies");
/// ```
///
/// A guard declared with `*` accepts any verified token, regardless of the
/// permissions it carries:
///
/// ```
/// use casting_axum::permission_guard;
///
/// permission_guard!(pub Authenticated; *);
/// ```
///
/// The guard is used by adding it to a handler's arguments. The verified
/// claims are available from the guard.
///
/// ```
/// use casting_axum::permission_guard;
///
/// permission_guard!(DeleteActor; "delete:actor");
///
/// async fn delete_actor(guard: DeleteActor) -> String {
///     format!("deleted on behalf of {:?}", guard.claims().subject())
/// }
/// ```
#[macro_export]
macro_rules! permission_guard {
    (@guard $vis:vis $i:ident; $permission:expr; $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug)]
        $vis struct $i($vis $crate::__private::ClaimSet);

        impl $i {
            /// The permission this guard requires
            #[allow(dead_code)]
            $vis const PERMISSION: &'static str = $permission;

            #[allow(dead_code)]
            $vis fn into_claims(self) -> $crate::__private::ClaimSet {
                self.0
            }

            #[allow(dead_code)]
            $vis fn claims(&self) -> &$crate::__private::ClaimSet {
                &self.0
            }
        }

        #[$crate::__private::async_trait]
        impl<S> $crate::__private::FromRequestParts<S> for $i
        where
            S: Sync,
        {
            type Rejection = $crate::AuthRejection;

            async fn from_request_parts(
                parts: &mut $crate::__private::Parts,
                _state: &S,
            ) -> Result<Self, Self::Rejection> {
                let required = $crate::__private::PermissionRef::from_static(Self::PERMISSION);
                $crate::__private::authorize(parts, required).await.map(Self)
            }
        }
    };
    ($vis:vis $i:ident; *) => {
        $crate::permission_guard!(
            @guard $vis $i;
            "";
            "A permission guard that allows any request bearing a verified token"
        );
    };
    ($vis:vis $i:ident; $permission:literal) => {
        $crate::permission_guard!(
            @guard $vis $i;
            $permission;
            concat!("Ensures that a verified token grants the `", $permission, "` permission")
        );
    };
}

/// Convenience macro for services that need to define many guards
///
/// # Example
///
/// ```
/// use casting_axum::permission_guards;
///
/// permission_guards! {
///     permission ReadActors = "get:actors";
///     permission CreateActor = "post:actor";
///     pub permission UpdateActor = "patch:actor";
///     permission Authenticated = *;
/// }
/// ```
///
/// The above defines a guard type for each permission, as with
/// [`permission_guard!`].
#[macro_export]
macro_rules! permission_guards {
    ($($vis:vis permission $i:ident = $permission:tt);* $(;)?) => {
        $(
            $crate::permission_guard!($vis $i; $permission);
        )*
    };
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        extract::FromRequestParts,
        http::{header, request::Parts, Request, StatusCode},
        routing::get,
        Extension, Router,
    };
    use casting_auth::{
        clock::{Clock, System},
        jwa::Algorithm,
        jwk::{Jwk, Jwks, PrivateKey},
        jwt::{Headers, Jwt, Validator},
        ErrorBody, ErrorCode, LocalKeys, Permission, TokenVerifier,
    };
    use color_eyre::Result;
    use once_cell::sync::Lazy;
    use tower::ServiceExt;

    use crate::AuthRejection;
    use casting_auth::Authorizer;

    permission_guard!(ReadMovies; "get:movies");

    permission_guards! {
        permission DeleteMovie = "delete:movie";
        permission Authenticated = *;
    }

    static KEY: Lazy<PrivateKey> = Lazy::new(|| PrivateKey::generate().expect("RSA key generation"));

    fn authorizer() -> Authorizer {
        let jwks: Jwks = [Jwk::from_public_key("K1", KEY.public_key())].into_iter().collect();
        Authorizer::new(TokenVerifier::new(
            LocalKeys::new(jwks),
            Validator::new("aud1", "https://provider/"),
        ))
    }

    fn mint(permissions: &[&str]) -> Result<Jwt> {
        let now = System.now().0;
        let payload = serde_json::json!({
            "sub": "auth0|producer",
            "aud": "aud1",
            "iss": "https://provider/",
            "exp": now + 3600,
            "permissions": permissions,
        });

        Ok(Jwt::try_from_parts_with_signature(
            &Headers::new(Algorithm::RS256).with_key_id("K1"),
            &payload,
            &KEY,
        )?)
    }

    fn request(token: Option<&Jwt>) -> Parts {
        let mut builder = Request::builder();
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {:#}", token));
        }

        let mut parts = builder.body(()).expect("valid request").into_parts().0;
        parts.extensions.insert(authorizer());
        parts
    }

    #[tokio::test]
    async fn guard_with_held_permission_yields_claims() -> Result<()> {
        let token = mint(&["get:movies"])?;
        let guard = ReadMovies::from_request_parts(&mut request(Some(&token)), &()).await?;

        assert_eq!(
            guard.claims().permissions(),
            Some(&[Permission::from_static("get:movies")][..])
        );
        assert_eq!(
            guard.into_claims().subject().map(|s| s.as_str()),
            Some("auth0|producer")
        );
        Ok(())
    }

    #[tokio::test]
    async fn guard_without_permission_is_unauthorized() -> Result<()> {
        let token = mint(&["get:movies"])?;
        match DeleteMovie::from_request_parts(&mut request(Some(&token)), &()).await {
            Err(AuthRejection::Denied(err)) => {
                assert_eq!(err.code(), ErrorCode::Unauthorized);
                assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
            }
            other => panic!("expected a denial, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn unrestricted_guard_accepts_any_verified_token() -> Result<()> {
        let token = mint(&[])?;
        Authenticated::from_request_parts(&mut request(Some(&token)), &()).await?;

        let err = Authenticated::from_request_parts(&mut request(None), &())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn guard_without_authorizer_is_a_server_error() {
        let mut parts = Request::new(()).into_parts().0;
        match ReadMovies::from_request_parts(&mut parts, &()).await {
            Err(AuthRejection::MissingAuthorizer) => {}
            other => panic!("expected a missing authorizer, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn router_renders_rejections_as_json() -> Result<()> {
        async fn handler(_: DeleteMovie) -> &'static str {
            "deleted"
        }

        let router = Router::new()
            .route("/movies", get(handler))
            .layer(Extension(authorizer()));

        let token = mint(&["get:movies"])?;
        let response = router
            .clone()
            .oneshot(
                Request::get("/movies")
                    .header(header::AUTHORIZATION, format!("Bearer {:#}", token))
                    .body(Body::empty())?,
            )
            .await?;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        let body: ErrorBody = serde_json::from_slice(&body)?;
        assert_eq!(body.code, ErrorCode::Unauthorized);
        assert_eq!(body.description, "You do not possess the correct permissions.");

        let token = mint(&["delete:movie"])?;
        let response = router
            .oneshot(
                Request::get("/movies")
                    .header(header::AUTHORIZATION, format!("Bearer {:#}", token))
                    .body(Body::empty())?,
            )
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        Ok(())
    }
}
