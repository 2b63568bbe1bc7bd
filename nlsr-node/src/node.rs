//! RouterNode - wires key management to the persisted sequence numbers

use crate::config::RouterConfig;
use crate::data_dir::DataDir;
use crate::sequencing::{CertificateSequence, SequenceError, SequencingManager};
use nlsr_model::{IdentityCertificate, IdentityError, Name, SignedData, SigningIdentity};
use nlsr_security::{BootstrapError, KeyManager, PolicyViolation};
use std::fmt;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Bootstrap error: {0}")]
    Bootstrap(#[from] BootstrapError),

    #[error("Sequence error: {0}")]
    Sequence(#[from] SequenceError),
}

/// Advertisement classes with their own sequence counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LsaType {
    Name,
    Coordinate,
    Adjacency,
}

impl LsaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LsaType::Name => "name",
            LsaType::Coordinate => "coordinate",
            LsaType::Adjacency => "adjacency",
        }
    }
}

impl fmt::Display for LsaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A running router's trust state.
pub struct RouterNode {
    config: RouterConfig,
    key_manager: KeyManager,
    sequencing: SequencingManager,
    cert_seq: CertificateSequence,
}

impl RouterNode {
    /// Resume sequence numbers, load the router key and bootstrap trust.
    pub fn start(config: RouterConfig, data_dir: &DataDir) -> Result<Self, NodeError> {
        data_dir.ensure_dirs()?;

        let sequencing = SequencingManager::init_from_persisted(config.lsa_seq_file_in(data_dir))?;
        let cert_seq = CertificateSequence::init_from_persisted(config.cert_seq_file_in(data_dir))?;

        let key_path = data_dir.router_key();
        let (router_key, is_new) = SigningIdentity::load_or_generate(&key_path)?;
        if is_new {
            warn!(
                path = %key_path.display(),
                key_id = %router_key.key_id(),
                "generated new router key, router.cert must be reissued for it"
            );
        }

        let key_manager = KeyManager::bootstrap(
            &config.bootstrap_params(),
            &config.cert_dir_in(data_dir),
            &router_key,
            cert_seq.seq(),
        )?;

        info!(router = %key_manager.router_name(), seq = %sequencing, "router node started");
        Ok(Self {
            config,
            key_manager,
            sequencing,
            cert_seq,
        })
    }

    /// Certificate received from a neighbour.
    pub fn receive_certificate(
        &mut self,
        certificate: IdentityCertificate,
        seq_no: u64,
    ) -> Result<bool, PolicyViolation> {
        self.key_manager.on_certificate_received(certificate, seq_no)
    }

    /// Advertisement received from a neighbour.
    pub fn receive_data(&self, data: &SignedData) -> bool {
        self.key_manager.verify_data(data)
    }

    pub fn advertise_name_lsa(&mut self, content: Vec<u8>) -> Result<SignedData, NodeError> {
        self.advertise(LsaType::Name, content)
    }

    pub fn advertise_coordinate_lsa(&mut self, content: Vec<u8>) -> Result<SignedData, NodeError> {
        self.advertise(LsaType::Coordinate, content)
    }

    pub fn advertise_adjacency_lsa(&mut self, content: Vec<u8>) -> Result<SignedData, NodeError> {
        self.advertise(LsaType::Adjacency, content)
    }

    /// Bump the counter for `lsa_type`, persist, then sign.
    fn advertise(&mut self, lsa_type: LsaType, content: Vec<u8>) -> Result<SignedData, NodeError> {
        let seq = match lsa_type {
            LsaType::Name => self.sequencing.increment_name_seq(),
            LsaType::Coordinate => self.sequencing.increment_coordinate_seq(),
            LsaType::Adjacency => self.sequencing.increment_adjacency_seq(),
        };
        self.sequencing.persist()?;
        Ok(self.key_manager.sign_data(self.lsa_name(lsa_type, seq), content))
    }

    /// `<network>/NLSR/LSA/<router name>/<type>/<seq>/0`
    pub fn lsa_name(&self, lsa_type: LsaType, seq: u64) -> Name {
        self.config
            .network
            .clone()
            .append("NLSR")
            .append("LSA")
            .join(self.key_manager.router_name())
            .append(lsa_type.as_str())
            .append(seq.to_string())
            .append("0")
    }

    /// Names of certificates as they become verified.
    pub fn subscribe_verified(&self) -> broadcast::Receiver<Name> {
        self.key_manager.store().subscribe_verified()
    }

    /// Persist both sequence files.
    pub fn shutdown(&self) -> Result<(), NodeError> {
        self.sequencing.persist()?;
        self.cert_seq.persist()?;
        info!(seq = %self.sequencing, cert_seq = self.cert_seq.seq(), "sequence numbers saved");
        Ok(())
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn key_manager(&self) -> &KeyManager {
        &self.key_manager
    }

    pub fn sequencing(&self) -> &SequencingManager {
        &self.sequencing
    }

    pub fn cert_seq(&self) -> u64 {
        self.cert_seq.seq()
    }
}
