//! NLSR Model
//!
//! Pure data types for the NLSR trust subsystem: hierarchical names, identity
//! certificates, signed advertisements and the crypto helpers behind them.
//! Nothing here knows about stores, sequence files or the daemon.

pub mod certificate;
pub mod clock;
pub mod crypto;
pub mod data;
pub mod identity;
pub mod name;
pub mod types;

pub use certificate::{CertEncoding, CertificateBuilder, CertificateError, IdentityCertificate};
pub use clock::{Clock, MockClock, SystemClock};
pub use crypto::CryptoError;
pub use data::SignedData;
pub use identity::{IdentityError, SigningIdentity};
pub use name::{Name, NameError};
pub use types::{Hash, PubKey, Signature};
