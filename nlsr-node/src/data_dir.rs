//! Data directory management
//!
//! Per-user state of a router:
//! - `router.key` - router Ed25519 private key
//! - `nlsrSeqNo.txt` - combined LSA sequence number
//! - `nlsrCertSeqNo.txt` - certificate sequence number
//! - `nlsrCertDir/` - bootstrap certificates (`root.cert`, `site.cert`, ...)

use std::path::{Path, PathBuf};

const APP_NAME: &str = "nlsr";

pub const LSA_SEQ_FILE: &str = "nlsrSeqNo.txt";
pub const CERT_SEQ_FILE: &str = "nlsrCertSeqNo.txt";

#[derive(Debug, Clone)]
pub struct DataDir {
    base: PathBuf,
}

impl DataDir {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Per-user configuration directory.
    ///
    /// - Linux: `~/.config/nlsr/`
    /// - macOS: `~/Library/Application Support/nlsr/`
    pub fn default_location() -> Option<Self> {
        dirs::config_dir().map(|d| Self::new(d.join(APP_NAME)))
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn router_key(&self) -> PathBuf {
        self.base.join("router.key")
    }

    pub fn cert_dir(&self) -> PathBuf {
        self.base.join("nlsrCertDir")
    }

    pub fn lsa_seq_file(&self) -> PathBuf {
        self.base.join(LSA_SEQ_FILE)
    }

    pub fn cert_seq_file(&self) -> PathBuf {
        self.base.join(CERT_SEQ_FILE)
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.base)
    }
}
