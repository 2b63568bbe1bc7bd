//! Cryptographic operations for certificates and advertisements.
//!
//! Everything that signs or verifies goes through here:
//!
//! | Primitive   | Algorithm       | Purpose                                  |
//! |-------------|-----------------|------------------------------------------|
//! | Hash        | BLAKE3 (32 B)   | Digest of a packet's signed portion      |
//! | Signature   | Ed25519 (64 B)  | Certificate and LSA signatures           |

use crate::types::{Hash, PubKey, Signature};

/// Compute the BLAKE3 digest of arbitrary bytes.
#[inline]
pub fn content_hash(data: &[u8]) -> Hash {
    Hash(*blake3::hash(data).as_bytes())
}

/// Sign a digest with an Ed25519 signing key.
pub fn sign_hash(signing_key: &ed25519_dalek::SigningKey, hash: &Hash) -> Signature {
    use ed25519_dalek::Signer;
    let sig = signing_key.sign(hash.as_bytes());
    Signature(sig.to_bytes())
}

/// Verify an Ed25519 signature over a digest.
///
/// Uses `verify_strict()` (rejects small-order keys, checks canonical S).
pub fn verify_hash(pubkey: &PubKey, hash: &Hash, signature: &Signature) -> Result<(), CryptoError> {
    let vk = verifying_key(pubkey)?;
    let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    vk.verify_strict(hash.as_bytes(), &sig)
        .map_err(|_| CryptoError::InvalidSignature)
}

/// Deserialize a `PubKey` into an Ed25519 `VerifyingKey`.
pub fn verifying_key(pubkey: &PubKey) -> Result<ed25519_dalek::VerifyingKey, CryptoError> {
    ed25519_dalek::VerifyingKey::from_bytes(&pubkey.0).map_err(|_| CryptoError::InvalidPublicKey)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid Ed25519 signature")]
    InvalidSignature,

    #[error("invalid Ed25519 public key")]
    InvalidPublicKey,
}
