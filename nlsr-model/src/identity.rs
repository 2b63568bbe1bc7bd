//! Signing identities
//!
//! Each router and NLSR process owns an Ed25519 keypair:
//! - Private key: stored locally (router) or generated per start (process)
//! - Public key: published inside an `IdentityCertificate`

use crate::crypto;
use crate::types::{Hash, PubKey, Signature};
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid key length: expected 32 bytes, got {0}")]
    InvalidKeyLength(usize),
}

/// An Ed25519 keypair able to sign certificates and advertisements.
#[derive(Clone)]
pub struct SigningIdentity {
    signing_key: SigningKey,
}

impl SigningIdentity {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        Self { signing_key }
    }

    /// Load from a key file, or generate and save if it doesn't exist.
    /// Returns (identity, is_new).
    pub fn load_or_generate(path: impl AsRef<Path>) -> Result<(Self, bool), IdentityError> {
        let path = path.as_ref();
        if path.exists() {
            Ok((Self::load(path)?, false))
        } else {
            let identity = Self::generate();
            identity.save(path)?;
            Ok((identity, true))
        }
    }

    /// Load a private key file (32 raw bytes).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, IdentityError> {
        use zeroize::Zeroizing;

        let bytes = Zeroizing::new(fs::read(path)?);
        if bytes.len() != 32 {
            return Err(IdentityError::InvalidKeyLength(bytes.len()));
        }

        let mut key_bytes = Zeroizing::new([0u8; 32]);
        key_bytes.copy_from_slice(&bytes);
        Ok(Self {
            signing_key: SigningKey::from_bytes(&key_bytes),
        })
    }

    /// Save the private key, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), IdentityError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::File::create(path)?;
        file.write_all(self.signing_key.as_bytes())?;
        Ok(())
    }

    pub fn public_key(&self) -> PubKey {
        PubKey::from(self.signing_key.verifying_key().to_bytes())
    }

    /// Key identifier component used in certificate names (`ksk-` + 8 hex chars).
    pub fn key_id(&self) -> String {
        format!("ksk-{}", hex::encode(&self.public_key().as_bytes()[..4]))
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    pub fn sign_hash(&self, hash: &Hash) -> Signature {
        crypto::sign_hash(&self.signing_key, hash)
    }
}

impl std::fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigningIdentity({})", self.key_id())
    }
}
