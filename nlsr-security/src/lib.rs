//! NLSR Security
//!
//! Trust decisions for incoming identity certificates:
//! - `WaitingList`: certificates blocked on a signer that is not yet verified
//! - `CertificateStore`: known certificates, freshness and verification cascade
//! - `KeyNameClassifier`: role and owner extraction from certificate names
//! - `KeyManager`: bootstrap of the local hierarchy and admission policy

pub mod cert_store;
pub mod key_manager;
pub mod key_role;
pub mod waiting_list;

pub use cert_store::{CertificateRecord, CertificateStore, Ed25519Verifier, SignatureVerifier};
pub use key_manager::{BootstrapError, BootstrapParams, KeyManager, PolicyViolation, BOOTSTRAP_CERT_SEQ};
pub use key_role::{KeyNameClassifier, KeyRole, NameTokens};
pub use waiting_list::{WaitingList, WaitingListEntry};
