use std::{fmt, sync::Arc};

use openssl::rsa::Rsa;
use ring::{rand::SystemRandom, signature::RsaKeyPair};

use super::PublicKey;
use crate::{error, jwa::Algorithm};

/// An RSA private key used to mint tokens
///
/// Intended for tests and for tooling that issues tokens to exercise the API.
#[derive(Clone)]
pub struct PrivateKey {
    der: Vec<u8>,
    public: PublicKey,
    ring_cache: Arc<RsaKeyPair>,
}

impl PrivateKey {
    /// Generates a new 2048-bit RSA private key
    ///
    /// # Errors
    ///
    /// Returns an error if the key could not be generated.
    pub fn generate() -> Result<Self, error::Unexpected> {
        let rsa = Rsa::generate(2048).map_err(error::unexpected)?;
        let der = rsa.private_key_to_der().map_err(error::unexpected)?;
        Self::from_der(&der).map_err(error::unexpected)
    }

    /// Loads a PKCS#1 DER-encoded RSA private key
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be parsed or is not usable for signing.
    pub fn from_der(der: &[u8]) -> Result<Self, error::KeyRejected> {
        let rsa = Rsa::private_key_from_der(der).map_err(error::key_rejected)?;
        let public = PublicKey::from_components(&rsa.n().to_vec(), &rsa.e().to_vec())?;
        let key_pair = RsaKeyPair::from_der(der).map_err(|e| error::key_rejected(e.to_string()))?;

        Ok(Self {
            der: der.to_vec(),
            public,
            ring_cache: Arc::new(key_pair),
        })
    }

    /// The DER encoding of the private key
    #[must_use]
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// The matching public key
    #[must_use]
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Signs `message` with the given algorithm
    ///
    /// # Errors
    ///
    /// Returns an error if the signing operation fails.
    pub fn sign(&self, alg: Algorithm, message: &[u8]) -> Result<Vec<u8>, error::Unexpected> {
        let mut signature = vec![0; self.public.modulus().len()];
        self.ring_cache
            .sign(
                alg.signing_padding(),
                &SystemRandom::new(),
                message,
                &mut signature,
            )
            .map_err(|_| error::unexpected("RSA signing failed"))?;
        Ok(signature)
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("public", &self.public)
            .field("private", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signatures_verify_with_public_key() -> color_eyre::Result<()> {
        let key = PrivateKey::generate()?;
        let message = b"header.payload";

        for alg in [Algorithm::RS256, Algorithm::RS512, Algorithm::PS256] {
            let signature = key.sign(alg, message)?;
            key.public_key().verify(alg, message, &signature)?;
            assert!(key
                .public_key()
                .verify(alg, b"header.tampered", &signature)
                .is_err());
        }

        Ok(())
    }

    #[test]
    fn reloads_from_der() -> color_eyre::Result<()> {
        let key = PrivateKey::generate()?;
        let reloaded = PrivateKey::from_der(key.der())?;
        assert_eq!(reloaded.public_key(), key.public_key());
        Ok(())
    }

    #[test]
    fn debug_output_is_redacted() -> color_eyre::Result<()> {
        let key = PrivateKey::generate()?;
        assert!(format!("{:?}", key).contains("<redacted>"));
        Ok(())
    }
}
