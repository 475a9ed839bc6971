use std::fmt;

use ring::signature::RsaPublicKeyComponents;

use crate::{error, jwa::Algorithm};

const MIN_MODULUS_BYTES: usize = 2048 / 8;
const MAX_MODULUS_BYTES: usize = 8192 / 8;

/// An RSA public key used to verify token signatures
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey {
    modulus: Vec<u8>,
    exponent: Vec<u8>,
}

impl PublicKey {
    /// Constructs a public key from its big-endian modulus and exponent
    ///
    /// Leading zero octets are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the modulus is not between 2048 and 8192 bits
    /// or if the exponent is empty.
    pub fn from_components(modulus: &[u8], exponent: &[u8]) -> Result<Self, error::KeyRejected> {
        let modulus = strip_leading_zeros(modulus);
        let exponent = strip_leading_zeros(exponent);

        if !(MIN_MODULUS_BYTES..=MAX_MODULUS_BYTES).contains(&modulus.len()) {
            return Err(error::key_rejected(format!(
                "modulus of {} bits is outside the supported 2048 to 8192 bit range",
                modulus.len() * 8
            )));
        }

        if exponent.is_empty() {
            return Err(error::key_rejected("exponent must not be zero"));
        }

        Ok(Self {
            modulus: modulus.to_vec(),
            exponent: exponent.to_vec(),
        })
    }

    /// The big-endian modulus
    #[must_use]
    pub fn modulus(&self) -> &[u8] {
        &self.modulus
    }

    /// The big-endian public exponent
    #[must_use]
    pub fn exponent(&self) -> &[u8] {
        &self.exponent
    }

    /// Verifies `signature` over `message`
    ///
    /// # Errors
    ///
    /// Returns an error if the signature does not match.
    pub fn verify(
        &self,
        alg: Algorithm,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), error::SignatureMismatch> {
        let components = RsaPublicKeyComponents {
            n: &self.modulus,
            e: &self.exponent,
        };

        components
            .verify(alg.verification_params(), message, signature)
            .map_err(|_| error::signature_mismatch())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("bits", &(self.modulus.len() * 8))
            .field("exponent", &self.exponent)
            .finish()
    }
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}
