//! Bearer token verification and permission enforcement
//!
//! This crate guards the Casting Agency API. Each protected request passes
//! through an [`Authorizer`], which
//!
//! 1. extracts the bearer token from the `Authorization` header,
//! 2. verifies the token's RSA signature against the identity provider's
//!    published key set, along with its expiry, audience, and issuer, and
//! 3. checks that the verified claims grant the required permission.
//!
//! The first failing step produces an [`AuthError`] carrying an error code,
//! a description, and the HTTP status to report. When every step passes, the
//! verified [`ClaimSet`] is handed to the protected operation.
//!
//! # Example
//!
//! ```no_run
//! use casting_auth::{AuthConfig, Authorizer, PermissionRef};
//! use http::{header, HeaderMap, HeaderValue};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AuthConfig::new("casting.eu.auth0.com", "casting")?;
//! let authorizer = Authorizer::from_config(&config)?;
//!
//! let mut headers = HeaderMap::new();
//! headers.insert(
//!     header::AUTHORIZATION,
//!     HeaderValue::from_static("Bearer eyJhbGciOiJSUzI1NiIsImtpZCI6IksxIn0.e30.c2ln"),
//! );
//!
//! match authorizer.authorize(PermissionRef::from_static("get:movies"), &headers).await {
//!     Ok(claims) => println!("permissions: {:?}", claims.permissions()),
//!     Err(err) => println!("{} {}", err.status(), err.body().description),
//! }
//! # Ok(())
//! # }
//! ```

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
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod base64url;
pub mod clock;
pub mod config;
pub mod error;
pub mod extract;
pub mod gate;
pub mod jwa;
pub mod jwk;
pub mod jwt;
pub mod keys;
pub mod permission;
pub mod verifier;

#[cfg(test)]
mod test_support;

pub use config::{AuthConfig, ConfigError};
pub use error::{AuthError, ErrorBody, ErrorCode};
pub use extract::extract_bearer;
pub use gate::Authorizer;
pub use jwt::{ClaimSet, Jwt, JwtRef};
pub use keys::{KeySource, LocalKeys, RemoteKeys};
pub use permission::{check_permission, Permission, PermissionRef};
pub use verifier::TokenVerifier;
