//! Identity certificates
//!
//! A certificate binds a name of the form `<identity>/KEY/<key-id>` to an
//! Ed25519 public key. It names its signer through a key locator, which may be
//! the signer's certificate name or that name plus one trailing version
//! component.
//!
//! The signature covers the BLAKE3 digest of the protobuf encoding with the
//! signature field set to 64 zero bytes (`Signature::EMPTY`).

use crate::clock::Clock;
use crate::crypto::{self, content_hash};
use crate::identity::SigningIdentity;
use crate::name::{Name, NameError};
use crate::types::{Hash, PubKey, Signature};
use base64::Engine;
use prost::Message;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// One year, in milliseconds.
pub const DEFAULT_VALIDITY_MS: u64 = 365 * 24 * 60 * 60 * 1000;

#[derive(Error, Debug)]
pub enum CertificateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("Invalid name: {0}")]
    Name(#[from] NameError),

    #[error("Invalid public key length: expected 32 bytes, got {0}")]
    InvalidPublicKeyLength(usize),

    #[error("Invalid signature length: expected 64 bytes, got {0}")]
    InvalidSignatureLength(usize),
}

/// On-disk / on-wire encoding of a certificate file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CertEncoding {
    /// Base64 text of the protobuf bytes (bootstrap certificate files).
    #[default]
    Base64,
    /// Raw protobuf bytes.
    Binary,
}

/// Protobuf wire form.
#[derive(Clone, PartialEq, Message)]
pub struct CertificateWire {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub signer: String,
    #[prost(bytes = "vec", tag = "3")]
    pub public_key: Vec<u8>,
    #[prost(uint64, tag = "4")]
    pub not_before_ms: u64,
    #[prost(uint64, tag = "5")]
    pub not_after_ms: u64,
    #[prost(bytes = "vec", tag = "6")]
    pub signature: Vec<u8>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct IdentityCertificate {
    name: Name,
    signer: Name,
    public_key: PubKey,
    not_before_ms: u64,
    not_after_ms: u64,
    signature: Signature,
}

impl IdentityCertificate {
    pub fn builder(name: Name, public_key: PubKey) -> CertificateBuilder {
        CertificateBuilder::new(name, public_key)
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    /// Key locator of the signing certificate.
    pub fn signer_name(&self) -> &Name {
        &self.signer
    }

    pub fn public_key(&self) -> &PubKey {
        &self.public_key
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn not_before_ms(&self) -> u64 {
        self.not_before_ms
    }

    pub fn not_after_ms(&self) -> u64 {
        self.not_after_ms
    }

    pub fn is_valid_at(&self, now_ms: u64) -> bool {
        self.not_before_ms <= now_ms && now_ms <= self.not_after_ms
    }

    /// Whether `clock` currently lies inside the validity window.
    pub fn is_valid_now(&self, clock: &dyn Clock) -> bool {
        clock.is_within(self.not_before_ms, self.not_after_ms)
    }

    /// Identity this certificate certifies (the components before `KEY`).
    pub fn identity(&self) -> Name {
        match self.name.position("KEY") {
            Some(pos) => self.name.prefix(pos),
            None => self.name.clone(),
        }
    }

    fn to_wire(&self, signature: &Signature) -> CertificateWire {
        CertificateWire {
            name: self.name.to_string(),
            signer: self.signer.to_string(),
            public_key: self.public_key.as_bytes().to_vec(),
            not_before_ms: self.not_before_ms,
            not_after_ms: self.not_after_ms,
            signature: signature.as_bytes().to_vec(),
        }
    }

    /// Digest of the signed portion.
    pub fn signed_hash(&self) -> Hash {
        content_hash(&self.to_wire(&Signature::EMPTY).encode_to_vec())
    }

    /// Check the signature against the signer's public key.
    pub fn verify_with(&self, signer_key: &PubKey) -> Result<(), crypto::CryptoError> {
        crypto::verify_hash(signer_key, &self.signed_hash(), &self.signature)
    }

    pub fn encode(&self) -> Vec<u8> {
        self.to_wire(&self.signature).encode_to_vec()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CertificateError> {
        let wire = CertificateWire::decode(bytes)?;
        Ok(Self {
            name: wire.name.parse()?,
            signer: wire.signer.parse()?,
            public_key: PubKey::try_from(wire.public_key)
                .map_err(|v| CertificateError::InvalidPublicKeyLength(v.len()))?,
            not_before_ms: wire.not_before_ms,
            not_after_ms: wire.not_after_ms,
            signature: Signature::try_from(wire.signature)
                .map_err(|v| CertificateError::InvalidSignatureLength(v.len()))?,
        })
    }

    /// Load a certificate file.
    pub fn load(path: impl AsRef<Path>, encoding: CertEncoding) -> Result<Self, CertificateError> {
        let raw = fs::read(path)?;
        let bytes = match encoding {
            CertEncoding::Binary => raw,
            CertEncoding::Base64 => {
                let text: Vec<u8> = raw.into_iter().filter(|b| !b.is_ascii_whitespace()).collect();
                base64::engine::general_purpose::STANDARD.decode(text)?
            }
        };
        Self::decode(&bytes)
    }

    /// Write a certificate file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>, encoding: CertEncoding) -> Result<(), CertificateError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = self.encode();
        match encoding {
            CertEncoding::Binary => fs::write(path, bytes)?,
            CertEncoding::Base64 => {
                fs::write(path, base64::engine::general_purpose::STANDARD.encode(bytes))?
            }
        }
        Ok(())
    }
}

/// Builder for issuing certificates.
pub struct CertificateBuilder {
    name: Name,
    public_key: PubKey,
    not_before_ms: u64,
    not_after_ms: u64,
}

impl CertificateBuilder {
    pub fn new(name: Name, public_key: PubKey) -> Self {
        Self {
            name,
            public_key,
            not_before_ms: 0,
            not_after_ms: u64::MAX,
        }
    }

    /// Valid for `DEFAULT_VALIDITY_MS` starting at the clock's current time.
    pub fn valid_now(self, clock: &dyn Clock) -> Self {
        self.valid_for(clock, DEFAULT_VALIDITY_MS)
    }

    pub fn valid_for(mut self, clock: &dyn Clock, lifetime_ms: u64) -> Self {
        (self.not_before_ms, self.not_after_ms) = clock.validity_window(lifetime_ms);
        self
    }

    pub fn validity(mut self, not_before_ms: u64, not_after_ms: u64) -> Self {
        self.not_before_ms = not_before_ms;
        self.not_after_ms = not_after_ms;
        self
    }

    /// Sign with `issuer`, recording `signer` as the key locator.
    pub fn sign(self, issuer: &SigningIdentity, signer: Name) -> IdentityCertificate {
        let mut cert = IdentityCertificate {
            name: self.name,
            signer,
            public_key: self.public_key,
            not_before_ms: self.not_before_ms,
            not_after_ms: self.not_after_ms,
            signature: Signature::EMPTY,
        };
        cert.signature = issuer.sign_hash(&cert.signed_hash());
        cert
    }

    /// Self-signed: the certificate is its own key locator.
    pub fn self_sign(self, issuer: &SigningIdentity) -> IdentityCertificate {
        let signer = self.name.clone();
        self.sign(issuer, signer)
    }
}
