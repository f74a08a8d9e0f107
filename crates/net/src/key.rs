use rand::rngs::OsRng;
use rsa::{Pkcs1v15Encrypt, PublicKeyParts, RsaPrivateKey};
use rsa_der::public_key_to_der;
use thiserror::Error;

const RSA_BIT_SIZE: usize = 1024;
const RSA_BLOCK_SIZE: usize = RSA_BIT_SIZE / 8;

pub const SHARED_SECRET_LENGTH: usize = 16;
pub const VERIFY_TOKEN_LENGTH: usize = 4;

pub type SharedSecret = [u8; SHARED_SECRET_LENGTH];

/// 4-byte verify token as described [`here`].
///
/// [`here`]: https://wiki.vg/Protocol#Encryption_Request
pub type VerifyToken = [u8; VERIFY_TOKEN_LENGTH];

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("ciphertext is {0} bytes, exceeds the {RSA_BLOCK_SIZE}-byte RSA block")]
    OversizedCiphertext(usize),
    #[error("RSA padding invalid")]
    InvalidPadding,
    #[error("decrypted payload is {got} bytes, expected {want}")]
    LengthMismatch { got: usize, want: usize },
}

/// Server-wide RSA key material. Generated once at startup, then only
/// read: connections share it behind an [`Arc`] with no further
/// synchronization.
///
/// [`Arc`]: std::sync::Arc
pub struct ServerKeypair {
    key: RsaPrivateKey,
    spki_der: Box<[u8]>,
}

impl ServerKeypair {
    pub fn generate() -> anyhow::Result<Self> {
        let mut rng = OsRng;
        let key = RsaPrivateKey::new(&mut rng, RSA_BIT_SIZE)?;

        // The DER encoding is what goes on the wire and what the
        // server-id digest covers, so it is computed exactly once
        let spki_der = public_key_to_der(&key.n().to_bytes_be(), &key.e().to_bytes_be())
            .into_boxed_slice();

        Ok(Self {
            key,
            spki_der,
        })
    }

    /// Cached ASN.1 `SubjectPublicKeyInfo` encoding of the public half.
    pub fn spki_der(&self) -> &[u8] {
        &self.spki_der
    }

    pub fn spki_der_len(&self) -> usize {
        self.spki_der.len()
    }

    /// Decrypts the client's shared-secret blob.
    ///
    /// The big-integer routines yield the payload most-significant-byte
    /// first while the cipher and the session digest consume it in wire
    /// order, so the returned secret is already byte-reversed. Callers
    /// never see the raw integer order.
    pub fn decrypt_shared_secret(&self, ciphertext: &[u8]) -> Result<SharedSecret, KeyError> {
        let mut secret: SharedSecret = self.decrypt(ciphertext)?;
        secret.reverse();

        Ok(secret)
    }

    /// Decrypts the echoed verify token. No byte-order fixup here: the
    /// token is compared as-is.
    pub fn decrypt_verify_token(&self, ciphertext: &[u8]) -> Result<VerifyToken, KeyError> {
        self.decrypt(ciphertext)
    }

    fn decrypt<const N: usize>(&self, ciphertext: &[u8]) -> Result<[u8; N], KeyError> {
        if ciphertext.len() > RSA_BLOCK_SIZE {
            return Err(KeyError::OversizedCiphertext(ciphertext.len()));
        }

        let payload = self
            .key
            .decrypt(Pkcs1v15Encrypt, ciphertext)
            .map_err(|_| KeyError::InvalidPadding)?;

        <[u8; N]>::try_from(payload.as_slice()).map_err(|_| KeyError::LengthMismatch {
            got: payload.len(),
            want: N,
        })
    }
}
