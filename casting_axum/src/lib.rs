//! Axum extractors that enforce Casting Agency permissions
//!
//! A permission guard is a unit of authorization declared with
//! [`permission_guard!`] or [`permission_guards!`]. Adding a guard to a handler's
//! arguments runs the full [`Authorizer`] pipeline for that request before the
//! handler body executes. Failures are rendered as a JSON body of the form
//! `{"code": "...", "description": "..."}` with the status chosen by the
//! authorizer.
//!
//! The guards expect an [`Authorizer`] in the request extensions, which is
//! typically provided by an [`axum::Extension`] layer.
//!
//! # Example
//!
//! ```no_run
//! use axum::{routing::get, Extension, Router};
//! use casting_auth::{AuthConfig, Authorizer};
//!
//! mod permission {
//!     casting_axum::permission_guards! {
//!         pub permission ReadMovies = "get:movies";
//!         pub permission DeleteMovie = "delete:movie";
//!     }
//! }
//!
//! async fn list_movies(guard: permission::ReadMovies) -> String {
//!     format!("movies for {:?}", guard.claims().subject())
//! }
//!
//! async fn delete_movie(_: permission::DeleteMovie) -> &'static str {
//!     "deleted"
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AuthConfig::new("casting.eu.auth0.com", "casting")?;
//!     let authorizer = Authorizer::from_config(&config)?;
//!
//!     let router = Router::new()
//!         .route("/movies", get(list_movies).delete(delete_movie))
//!         .layer(Extension(authorizer));
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```
//!
//! [`axum::Extension`]: https://docs.rs/axum/latest/axum/struct.Extension.html

#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

use std::{error::Error, fmt};

use axum_core::response::{IntoResponse, Response};
use casting_auth::{AuthError, Authorizer};
use http::{header, HeaderValue, StatusCode};

mod macros;

/// An error indicating that the request could not be authorized
#[derive(Debug)]
#[non_exhaustive]
pub enum AuthRejection {
    /// No [`Authorizer`] was available in the request extensions
    MissingAuthorizer,

    /// The authorizer rejected the request
    Denied(AuthError),
}

impl AuthRejection {
    /// The status code the rejection renders with
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingAuthorizer => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Denied(err) => err.status(),
        }
    }
}

impl From<AuthError> for AuthRejection {
    fn from(err: AuthError) -> Self {
        Self::Denied(err)
    }
}

impl fmt::Display for AuthRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingAuthorizer => f.write_str("authorizer missing from request extensions"),
            Self::Denied(_) => f.write_str("request denied"),
        }
    }
}

impl Error for AuthRejection {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::MissingAuthorizer => None,
            Self::Denied(err) => Some(err),
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let err = match self {
            Self::MissingAuthorizer => {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "authorizer missing from request extensions",
                )
                    .into_response()
            }
            Self::Denied(err) => err,
        };

        let body = match serde_json::to_vec(&err.body()) {
            Ok(body) => body,
            Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        };

        let mut response = (
            err.status(),
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            )],
            body,
        )
            .into_response();

        if err.status() == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, invalid_token(err.description()));
        }

        response
    }
}

fn invalid_token(description: &str) -> HeaderValue {
    const BARE: HeaderValue = HeaderValue::from_static(r#"Bearer error="invalid_token""#);

    if description.is_empty() {
        return BARE;
    }

    HeaderValue::try_from(format!(
        r#"Bearer error="invalid_token", error_description="{}""#,
        description.escape_default()
    ))
    .unwrap_or(BARE)
}

#[doc(hidden)]
pub mod __private {
    pub use async_trait::async_trait;
    pub use axum_core::extract::FromRequestParts;
    pub use casting_auth::{ClaimSet, PermissionRef};
    pub use http::request::Parts;

    use casting_auth::Authorizer;

    use crate::AuthRejection;

    pub async fn authorize(
        parts: &Parts,
        required: &PermissionRef,
    ) -> Result<ClaimSet, AuthRejection> {
        let authorizer = parts
            .extensions
            .get::<Authorizer>()
            .ok_or(AuthRejection::MissingAuthorizer)?;

        Ok(authorizer.authorize(required, &parts.headers).await?)
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use casting_auth::{AuthConfig, ErrorBody, ErrorCode};
    use color_eyre::Result;
    use http::HeaderMap;

    use super::*;

    async fn denial(headers: HeaderMap) -> Result<AuthError> {
        let config = AuthConfig::new("provider", "aud1")?;
        let authorizer = Authorizer::from_config(&config)?;
        let err = authorizer
            .authorize(casting_auth::PermissionRef::from_static("get:movies"), &headers)
            .await
            .expect_err("request without a credential must be denied");
        Ok(err)
    }

    #[tokio::test]
    async fn unauthorized_carries_www_authenticate() -> Result<()> {
        let response = AuthRejection::from(denial(HeaderMap::new()).await?).into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers()[header::WWW_AUTHENTICATE],
            r#"Bearer error="invalid_token", error_description="Authorization header is missing!""#
        );

        let body = to_bytes(response.into_body(), usize::MAX).await?;
        let body: ErrorBody = serde_json::from_slice(&body)?;
        assert_eq!(body.code, ErrorCode::MissingAuthorizationHeader);
        assert_eq!(body.description, "Authorization header is missing!");
        Ok(())
    }

    #[test]
    fn missing_authorizer_is_a_server_error() {
        let response = AuthRejection::MissingAuthorizer.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
    }

    #[test]
    fn description_is_escaped_for_headers() {
        let value = invalid_token("\0\n\ttest™: \"quoted\"");
        assert_eq!(
            value,
            r#"Bearer error="invalid_token", error_description="\u{0}\n\ttest\u{2122}: \"quoted\"""#
        );
    }

    #[test]
    fn empty_description_is_omitted() {
        assert_eq!(invalid_token(""), r#"Bearer error="invalid_token""#);
    }
}
