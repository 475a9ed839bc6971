//! Bearer credential extraction

use http::{header, HeaderMap};

use crate::{
    error::{self, AuthError},
    jwt::Jwt,
};

/// Pulls the bearer token out of the `Authorization` header
///
/// The header must contain exactly two whitespace-separated parts, the first
/// of which is `Bearer` in any letter case. The second part is returned
/// verbatim. It is not inspected further.
///
/// # Errors
///
/// * `missing_authorization_header` (401) if the header is absent or empty
/// * `invalid_header` (401) if the header does not have the `Bearer <token>` shape
pub fn extract_bearer(headers: &HeaderMap) -> Result<Jwt, AuthError> {
    let value = match headers.get(header::AUTHORIZATION) {
        Some(value) if !value.is_empty() => value,
        _ => return Err(error::missing_authorization_header()),
    };

    let value = value
        .to_str()
        .map_err(|_| error::malformed_authorization_header())?;

    let mut parts = value.split_whitespace();
    let (scheme, token) = match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) => (scheme, token),
        _ => return Err(error::malformed_authorization_header()),
    };

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(error::non_bearer_scheme());
    }

    Ok(Jwt::from(token))
}
