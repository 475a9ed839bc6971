//! JSON Web Keys and key sets
//!
//! Key sets published by an identity provider may contain keys this crate
//! cannot use. Such keys are kept in the set, and the problem is only
//! reported if a token actually names one of them. Entries that are not
//! JSON objects at all are skipped with a warning.

use aliri_braid::braid;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{base64url::Base64Url, error, jwa::Algorithm};

#[cfg(any(test, feature = "private-keys"))]
mod private;
mod rsa;

#[cfg(any(test, feature = "private-keys"))]
#[cfg_attr(docsrs, doc(cfg(feature = "private-keys")))]
pub use private::PrivateKey;
pub use rsa::PublicKey;

/// An identifier for a specific key
#[braid(serde, ref_doc = "A borrowed reference to a [`KeyId`]")]
pub struct KeyId;

const RSA_KEY_TYPE: &str = "RSA";
const SIGNATURE_USE: &str = "sig";

/// A JSON Web Key record from a key set
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    #[serde(default)]
    kty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kid: Option<KeyId>,
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    usage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    alg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    n: Option<Base64Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    e: Option<Base64Url>,
}

impl Jwk {
    /// Constructs a signature verification key record for an RSA public key
    pub fn from_public_key(kid: impl Into<KeyId>, key: &PublicKey) -> Self {
        Self {
            kty: RSA_KEY_TYPE.to_owned(),
            kid: Some(kid.into()),
            usage: Some(SIGNATURE_USE.to_owned()),
            alg: None,
            n: Some(Base64Url::from_raw(key.modulus())),
            e: Some(Base64Url::from_raw(key.exponent())),
        }
    }

    /// Restricts the key to a single algorithm
    #[must_use]
    pub fn with_algorithm(mut self, alg: Algorithm) -> Self {
        self.alg = Some(alg.into());
        self
    }

    /// The key's identifier, if any
    #[must_use]
    pub fn key_id(&self) -> Option<&KeyIdRef> {
        self.kid.as_deref()
    }

    /// The key type (`kty`)
    #[must_use]
    pub fn key_type(&self) -> &str {
        &self.kty
    }

    /// The intended usage (`use`), if restricted
    #[must_use]
    pub fn usage(&self) -> Option<&str> {
        self.usage.as_deref()
    }

    /// The algorithm the key is restricted to, if any
    #[must_use]
    pub fn algorithm(&self) -> Option<&str> {
        self.alg.as_deref()
    }

    /// Produces the RSA public key for verifying a signature made with `alg`
    ///
    /// # Errors
    ///
    /// Returns an error if the record is not an RSA signing key compatible
    /// with `alg`, or if its key material is missing or unusable.
    pub fn verifying_key(&self, alg: Algorithm) -> Result<PublicKey, error::JwkVerifyError> {
        if self.kty != RSA_KEY_TYPE {
            return Err(error::incompatible_algorithm(alg).into());
        }

        if matches!(&self.usage, Some(u) if u != SIGNATURE_USE) {
            return Err(error::jwk_usage_mismatch().into());
        }

        if matches!(&self.alg, Some(a) if a != alg.as_str()) {
            return Err(error::incompatible_algorithm(alg).into());
        }

        match (&self.n, &self.e) {
            (Some(n), Some(e)) => Ok(PublicKey::from_components(n.as_slice(), e.as_slice())?),
            _ => Err(error::key_rejected("key record is missing its modulus or exponent").into()),
        }
    }
}

/// A JSON Web Key Set
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwks {
    #[serde(deserialize_with = "deserialize_keys")]
    keys: Vec<Jwk>,
}

impl Jwks {
    /// The keys in the set
    #[must_use]
    pub fn keys(&self) -> &[Jwk] {
        &self.keys
    }

    /// Finds the first key with the given identifier
    #[must_use]
    pub fn get_key_by_id(&self, kid: &KeyIdRef) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.key_id() == Some(kid))
    }
}

impl FromIterator<Jwk> for Jwks {
    fn from_iter<I: IntoIterator<Item = Jwk>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

fn deserialize_keys<'de, D>(deserializer: D) -> Result<Vec<Jwk>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;

    let keys = raw
        .into_iter()
        .enumerate()
        .filter_map(|(idx, value)| match serde_json::from_value::<Jwk>(value) {
            Ok(jwk) => Some(jwk),
            Err(error) => {
                tracing::warn!(
                    jwks.index = idx,
                    %error,
                    "skipping unreadable entry in key set"
                );
                None
            }
        })
        .collect();

    Ok(keys)
}
