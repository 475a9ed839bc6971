//! Authorization failures and the lower-level errors they are built from
//!
//! Every check performed by this crate ultimately produces an [`AuthError`],
//! which carries the machine-readable [`ErrorCode`], a human-readable
//! description, and the HTTP status code to report. The remaining types in
//! this module describe *why* a token was rejected in more detail and are
//! folded into an [`AuthError`] at the boundary of the verifier.

#![allow(missing_copy_implementations)]

use std::{borrow::Cow, error::Error as StdError, fmt};

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable classification of an authorization failure
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// No credential was supplied
    MissingAuthorizationHeader,
    /// The credential or token header was malformed or could not be matched to a key
    InvalidHeader,
    /// The token signature was valid, but the token is past its expiry
    TokenExpired,
    /// The token audience or issuer was wrong, or the permission list was absent
    InvalidClaims,
    /// The token is valid but does not grant the required permission
    Unauthorized,
}

impl ErrorCode {
    /// The wire representation of the code
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingAuthorizationHeader => "missing_authorization_header",
            Self::InvalidHeader => "invalid_header",
            Self::TokenExpired => "token_expired",
            Self::InvalidClaims => "invalid_claims",
            Self::Unauthorized => "unauthorized",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A terminal authorization failure
///
/// Once produced, an `AuthError` is propagated unchanged to the caller. It is
/// never retried or recovered from inside this crate.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{code}: {description}")]
pub struct AuthError {
    code: ErrorCode,
    description: Cow<'static, str>,
    status: StatusCode,
}

impl AuthError {
    /// The machine-readable failure code
    #[inline]
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    /// A human-readable description of the failure
    #[inline]
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The HTTP status code that should be reported for this failure
    #[inline]
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// The serializable body reported to clients
    #[must_use]
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code,
            description: self.description.clone().into_owned(),
        }
    }
}

/// The client-facing representation of an [`AuthError`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// The machine-readable failure code
    pub code: ErrorCode,
    /// A human-readable description of the failure
    pub description: String,
}

const fn auth_error(code: ErrorCode, description: &'static str, status: StatusCode) -> AuthError {
    AuthError {
        code,
        description: Cow::Borrowed(description),
        status,
    }
}

pub(crate) const fn missing_authorization_header() -> AuthError {
    auth_error(
        ErrorCode::MissingAuthorizationHeader,
        "Authorization header is missing!",
        StatusCode::UNAUTHORIZED,
    )
}

pub(crate) const fn malformed_authorization_header() -> AuthError {
    auth_error(
        ErrorCode::InvalidHeader,
        "Authorization header must be formatted correctly Bearer token",
        StatusCode::UNAUTHORIZED,
    )
}

pub(crate) const fn non_bearer_scheme() -> AuthError {
    auth_error(
        ErrorCode::InvalidHeader,
        "Authorization header must start with the bearer",
        StatusCode::UNAUTHORIZED,
    )
}

pub(crate) const fn malformed_token() -> AuthError {
    auth_error(
        ErrorCode::InvalidHeader,
        "Authorization malformed.",
        StatusCode::UNAUTHORIZED,
    )
}

pub(crate) const fn unparseable_token() -> AuthError {
    auth_error(
        ErrorCode::InvalidHeader,
        "Unable to parse authentication token.",
        StatusCode::BAD_REQUEST,
    )
}

pub(crate) const fn unknown_signing_key() -> AuthError {
    auth_error(
        ErrorCode::InvalidHeader,
        "Unable to find the appropriate key.",
        StatusCode::BAD_REQUEST,
    )
}

pub(crate) const fn token_expired() -> AuthError {
    auth_error(
        ErrorCode::TokenExpired,
        "Token expired.",
        StatusCode::UNAUTHORIZED,
    )
}

pub(crate) const fn incorrect_claims() -> AuthError {
    auth_error(
        ErrorCode::InvalidClaims,
        "Incorrect claims. Please, check the audience and issuer.",
        StatusCode::UNAUTHORIZED,
    )
}

pub(crate) const fn missing_permissions() -> AuthError {
    auth_error(
        ErrorCode::InvalidClaims,
        "You do not have permission to access this data.",
        StatusCode::BAD_REQUEST,
    )
}

pub(crate) const fn permission_not_held() -> AuthError {
    auth_error(
        ErrorCode::Unauthorized,
        "You do not possess the correct permissions.",
        StatusCode::UNAUTHORIZED,
    )
}

/// The provided name does not match a supported signature algorithm
#[derive(Debug, Error)]
#[error("'{alg}' does not match supported algorithms")]
pub struct UnknownAlgorithm {
    alg: String,
}

#[inline]
pub(crate) fn unknown_algorithm(alg: impl Into<String>) -> UnknownAlgorithm {
    UnknownAlgorithm { alg: alg.into() }
}

/// The JWK cannot be used with the requested algorithm
#[derive(Debug, Error)]
#[error("key incompatible with algorithm '{alg}'")]
pub struct IncompatibleAlgorithm {
    alg: crate::jwa::Algorithm,
}

#[inline]
pub(crate) const fn incompatible_algorithm(alg: crate::jwa::Algorithm) -> IncompatibleAlgorithm {
    IncompatibleAlgorithm { alg }
}

/// The JWK has a usage that disallows signature verification
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
#[error("JWK cannot be used to verify signatures")]
pub struct JwkUsageMismatch {
    _p: (),
}

pub(crate) const fn jwk_usage_mismatch() -> JwkUsageMismatch {
    JwkUsageMismatch { _p: () }
}

/// The JWT is not made up of a header, payload, and signature
#[derive(Clone, Copy, Debug, Error)]
#[error("malformed JWT")]
pub struct MalformedJwt {
    _p: (),
}

pub(crate) const fn malformed_jwt() -> MalformedJwt {
    MalformedJwt { _p: () }
}

/// The JWT header section is malformed
#[derive(Debug, Error)]
#[error("malformed JWT header")]
pub struct MalformedJwtHeader {
    #[from]
    source: Box<dyn StdError + Send + Sync + 'static>,
}

pub(crate) fn malformed_jwt_header(
    source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
) -> MalformedJwtHeader {
    MalformedJwtHeader {
        source: source.into(),
    }
}

/// The JWT payload section is malformed
#[derive(Debug, Error)]
#[error("malformed JWT payload")]
pub struct MalformedJwtPayload {
    #[from]
    source: Box<dyn StdError + Send + Sync + 'static>,
}

pub(crate) fn malformed_jwt_payload(
    source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
) -> MalformedJwtPayload {
    MalformedJwtPayload {
        source: source.into(),
    }
}

/// The JWT signature section is malformed
#[derive(Debug, Error)]
#[error("malformed JWT signature")]
pub struct MalformedJwtSignature {
    #[from]
    source: Box<dyn StdError + Send + Sync + 'static>,
}

pub(crate) fn malformed_jwt_signature(
    source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
) -> MalformedJwtSignature {
    MalformedJwtSignature {
        source: source.into(),
    }
}

/// The JWT header does not name a key
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
#[error("JWT header has no key ID")]
pub struct MissingKeyId {
    _p: (),
}

pub(crate) const fn missing_key_id() -> MissingKeyId {
    MissingKeyId { _p: () }
}

/// The signature did not match
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
#[error("signature mismatch")]
pub struct SignatureMismatch {
    _p: (),
}

pub(crate) const fn signature_mismatch() -> SignatureMismatch {
    SignatureMismatch { _p: () }
}

/// The key material was rejected
#[derive(Debug, Error)]
#[error("key rejected")]
pub struct KeyRejected {
    #[from]
    source: Box<dyn StdError + Send + Sync + 'static>,
}

pub(crate) fn key_rejected(
    source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
) -> KeyRejected {
    KeyRejected {
        source: source.into(),
    }
}

/// Unexpected error (possibly a bug)
#[derive(Debug, Error)]
#[error("unexpected error")]
pub struct Unexpected {
    #[from]
    source: Box<dyn StdError + Send + Sync + 'static>,
}

#[cfg(any(test, feature = "private-keys"))]
pub(crate) fn unexpected(
    source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
) -> Unexpected {
    Unexpected {
        source: source.into(),
    }
}

/// An error occurring while verifying a signature with a JWK
#[derive(Debug, Error)]
pub enum JwkVerifyError {
    /// The key cannot be used with the token's algorithm
    #[error(transparent)]
    IncompatibleAlgorithm(#[from] IncompatibleAlgorithm),

    /// The key is not meant for signature verification
    #[error(transparent)]
    JwkUsageMismatch(#[from] JwkUsageMismatch),

    /// The key material is unusable
    #[error(transparent)]
    KeyRejected(#[from] KeyRejected),

    /// The signature is invalid
    #[error(transparent)]
    SignatureMismatch(#[from] SignatureMismatch),
}

/// An error occurring while verifying a JWT
#[derive(Debug, Error)]
pub enum JwtVerifyError {
    /// The JWT was rejected by the JWK
    #[error("token rejected by JWK")]
    JwkVerifyError(#[from] JwkVerifyError),

    /// The JWT is malformed, without a discernible header, payload, and signature
    #[error(transparent)]
    MalformedToken(#[from] MalformedJwt),

    /// The JWT header is malformed
    #[error(transparent)]
    MalformedTokenHeader(#[from] MalformedJwtHeader),

    /// The JWT payload is malformed
    #[error(transparent)]
    MalformedTokenPayload(#[from] MalformedJwtPayload),

    /// The JWT signature is malformed
    #[error(transparent)]
    MalformedTokenSignature(#[from] MalformedJwtSignature),

    /// The JWT header does not identify a key
    #[error(transparent)]
    MissingKeyId(#[from] MissingKeyId),

    /// The JWT was rejected by the claims validator
    #[error("token rejected by claims validator")]
    ClaimsRejected(#[from] ClaimsRejected),
}

impl JwtVerifyError {
    /// Whether the token could not be split, or its header could not be read
    ///
    /// Payload and signature decoding failures are not included.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::MalformedToken(_) | Self::MalformedTokenHeader(_) | Self::MissingKeyId(_)
        )
    }
}

/// An error occurring while minting a JWT
#[derive(Debug, Error)]
pub enum JwtSigningError {
    /// The header names an algorithm that cannot be used for signing
    #[error(transparent)]
    UnknownAlgorithm(#[from] UnknownAlgorithm),

    /// The JWT header could not be serialized
    #[error(transparent)]
    MalformedJwtHeader(#[from] MalformedJwtHeader),

    /// The JWT payload could not be serialized
    #[error(transparent)]
    MalformedJwtPayload(#[from] MalformedJwtPayload),

    /// The signing operation failed
    #[error(transparent)]
    Unexpected(#[from] Unexpected),
}

/// An error occurring when validating the claims of a JWT
#[derive(Debug, Error)]
pub enum ClaimsRejected {
    /// The token algorithm is not acceptable
    #[error("invalid algorithm")]
    InvalidAlgorithm(#[source] UnknownAlgorithm),

    /// The token audience is not acceptable
    #[error("invalid audience")]
    InvalidAudience,

    /// The token issuer is not acceptable
    #[error("invalid issuer")]
    InvalidIssuer,

    /// The token is expired according to the `exp` claim
    #[error("token expired")]
    TokenExpired,

    /// A required claim is missing
    #[error("required {_0} claim missing")]
    MissingRequiredClaim(&'static str),
}

/// An error occurring while obtaining the signing key set
#[derive(Debug, Error)]
pub enum KeySetError {
    /// The request for the key set could not be completed
    #[error("key set request failed")]
    Transport(#[from] reqwest::Error),

    /// The key set endpoint responded with an unsuccessful status
    #[error("key set endpoint responded with status {0}")]
    UnexpectedStatus(StatusCode),

    /// The key set document could not be decoded
    #[error("key set document is malformed")]
    Malformed(#[from] serde_json::Error),
}

impl From<ClaimsRejected> for AuthError {
    fn from(err: ClaimsRejected) -> Self {
        match err {
            ClaimsRejected::TokenExpired => token_expired(),
            ClaimsRejected::InvalidAudience
            | ClaimsRejected::InvalidIssuer
            | ClaimsRejected::MissingRequiredClaim(_) => incorrect_claims(),
            ClaimsRejected::InvalidAlgorithm(_) => unparseable_token(),
        }
    }
}

impl From<JwtVerifyError> for AuthError {
    fn from(err: JwtVerifyError) -> Self {
        match err {
            JwtVerifyError::ClaimsRejected(err) => err.into(),
            err if err.is_malformed() => malformed_token(),
            _ => unparseable_token(),
        }
    }
}

impl From<KeySetError> for AuthError {
    fn from(_: KeySetError) -> Self {
        unparseable_token()
    }
}
