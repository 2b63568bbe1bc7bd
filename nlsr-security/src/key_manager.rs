//! KeyManager - identity bootstrap and trust policy
//!
//! At startup the four bootstrap certificates are read from the certificate
//! directory and inserted pre-trusted. A fresh process key is then certified
//! by the router key and inserted pre-trusted as well.
//!
//! Afterwards every certificate received from the network goes through
//! `on_certificate_received`, which enforces the hierarchy policy before
//! handing the certificate to the store.

use crate::cert_store::CertificateStore;
use crate::key_role::{KeyNameClassifier, KeyRole, KEY_MARKER, PROCESS_MARKER, ROUTER_MARKER};
use nlsr_model::{
    CertEncoding, CertificateError, Clock, IdentityCertificate, Name, SignedData, SigningIdentity,
    SystemClock,
};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const ROOT_CERT_FILE: &str = "root.cert";
pub const SITE_CERT_FILE: &str = "site.cert";
pub const OPERATOR_CERT_FILE: &str = "operator.cert";
pub const ROUTER_CERT_FILE: &str = "router.cert";

/// Sequence number of the root, site and operator certificates.
pub const BOOTSTRAP_CERT_SEQ: u64 = 10;

#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("failed to load {}: {source}", path.display())]
    Certificate {
        path: PathBuf,
        #[source]
        source: CertificateError,
    },

    #[error("router key does not match certificate {0}")]
    RouterKeyMismatch(Name),
}

/// Why a received certificate was refused before reaching the store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyViolation {
    #[error("{signer_role} key cannot sign a {subject_role} certificate")]
    SignerBelowSubject {
        subject_role: KeyRole,
        signer_role: KeyRole,
    },

    #[error("{0} key cannot sign a certificate of its own role")]
    SameRole(KeyRole),

    #[error("{role} certificate {subject} is outside the signer's scope")]
    OutOfScope { subject: Name, role: KeyRole },
}

/// Names the local identity is composed from.
#[derive(Debug, Clone)]
pub struct BootstrapParams {
    pub network: Name,
    pub root_key_prefix: Name,
    pub site_name: Name,
    pub router_name: Name,
}

impl BootstrapParams {
    /// `<root-prefix>/<site>/R.Start/<router>`
    pub fn router_identity(&self) -> Name {
        self.root_key_prefix
            .clone()
            .join(&self.site_name)
            .append(ROUTER_MARKER)
            .join(&self.router_name)
    }

    /// `<router identity>/nlsr`
    pub fn process_identity(&self) -> Name {
        self.router_identity().append(PROCESS_MARKER)
    }

    /// `<network>/<site>/<router>`, the name LSAs are published under.
    pub fn full_router_name(&self) -> Name {
        self.network
            .clone()
            .join(&self.site_name)
            .join(&self.router_name)
    }
}

fn load_cert(dir: &Path, file: &str) -> Result<IdentityCertificate, BootstrapError> {
    let path = dir.join(file);
    IdentityCertificate::load(&path, CertEncoding::Base64)
        .map_err(|source| BootstrapError::Certificate { path, source })
}

pub struct KeyManager {
    store: CertificateStore,
    classifier: KeyNameClassifier,
    router_identity: Name,
    process_identity: Name,
    router_name: Name,
    root_cert_name: Name,
    site_cert_name: Name,
    operator_cert_name: Name,
    router_cert_name: Name,
    process_cert_name: Name,
    process_key: SigningIdentity,
    cert_seq: u64,
}

impl KeyManager {
    /// Bootstrap with an Ed25519-verifying store on the system clock.
    pub fn bootstrap(
        params: &BootstrapParams,
        cert_dir: &Path,
        router_key: &SigningIdentity,
        cert_seq: u64,
    ) -> Result<Self, BootstrapError> {
        Self::bootstrap_with_store(
            params,
            cert_dir,
            router_key,
            cert_seq,
            CertificateStore::default(),
            &SystemClock,
        )
    }

    /// Bootstrap into a caller-provided store.
    ///
    /// All four certificate files are read before anything is inserted, so a
    /// failed bootstrap leaves no trust state behind.
    pub fn bootstrap_with_store(
        params: &BootstrapParams,
        cert_dir: &Path,
        router_key: &SigningIdentity,
        cert_seq: u64,
        mut store: CertificateStore,
        clock: &dyn Clock,
    ) -> Result<Self, BootstrapError> {
        let root = load_cert(cert_dir, ROOT_CERT_FILE)?;
        let site = load_cert(cert_dir, SITE_CERT_FILE)?;
        let operator = load_cert(cert_dir, OPERATOR_CERT_FILE)?;
        let router = load_cert(cert_dir, ROUTER_CERT_FILE)?;

        if router.public_key() != &router_key.public_key() {
            return Err(BootstrapError::RouterKeyMismatch(router.name().clone()));
        }

        let router_identity = params.router_identity();
        let process_identity = params.process_identity();
        if router.identity() != router_identity {
            warn!(
                cert = %router.name(),
                expected = %router_identity,
                "router certificate does not match configured router identity"
            );
        }

        let root_cert_name = root.name().clone();
        let site_cert_name = site.name().clone();
        let operator_cert_name = operator.name().clone();
        let router_cert_name = router.name().clone();

        store.add_certificate(root, BOOTSTRAP_CERT_SEQ, true);
        store.add_certificate(site, BOOTSTRAP_CERT_SEQ, true);
        store.add_certificate(operator, BOOTSTRAP_CERT_SEQ, true);
        store.add_certificate(router, cert_seq, true);

        let process_key = SigningIdentity::generate();
        let process_cert = IdentityCertificate::builder(
            process_identity
                .clone()
                .append(KEY_MARKER)
                .append(process_key.key_id()),
            process_key.public_key(),
        )
        .valid_now(clock)
        .sign(router_key, router_cert_name.clone());
        let process_cert_name = process_cert.name().clone();
        store.add_certificate(process_cert, cert_seq, true);

        info!(
            router = %router_identity,
            process_cert = %process_cert_name,
            cert_seq,
            "key manager bootstrapped"
        );

        Ok(Self {
            store,
            classifier: KeyNameClassifier::new(params.root_key_prefix.clone(), params.network.clone()),
            router_identity,
            process_identity,
            router_name: params.full_router_name(),
            root_cert_name,
            site_cert_name,
            operator_cert_name,
            router_cert_name,
            process_cert_name,
            process_key,
            cert_seq,
        })
    }

    /// Check that `signer_name` may sign a certificate named `subject_name`.
    pub fn check_hierarchy(&self, subject_name: &Name, signer_name: &Name) -> Result<(), PolicyViolation> {
        let c = &self.classifier;
        let subject_role = c.classify(subject_name);
        let signer_role = c.classify(signer_name);

        if signer_role > subject_role {
            return Err(PolicyViolation::SignerBelowSubject {
                subject_role,
                signer_role,
            });
        }
        if signer_role == subject_role && subject_role != KeyRole::Root {
            return Err(PolicyViolation::SameRole(subject_role));
        }

        let in_scope = match subject_role {
            KeyRole::Root => &c.extract_root_name(subject_name) == c.root_prefix(),
            KeyRole::Site => c.extract_root_name(subject_name) == c.extract_root_name(signer_name),
            KeyRole::Operator | KeyRole::Router => {
                let site = c.extract_site_name(subject_name);
                site.is_some() && site == c.extract_site_name(signer_name)
            }
            KeyRole::Process => {
                let router = c.extract_router_name(subject_name);
                router.is_some() && router == c.extract_router_name(signer_name)
            }
        };
        if !in_scope {
            return Err(PolicyViolation::OutOfScope {
                subject: subject_name.clone(),
                role: subject_role,
            });
        }
        Ok(())
    }

    /// Admit a certificate received from the network.
    ///
    /// `Ok(false)` means the store already holds an equal or fresher copy.
    pub fn on_certificate_received(
        &mut self,
        certificate: IdentityCertificate,
        seq_no: u64,
    ) -> Result<bool, PolicyViolation> {
        if let Err(violation) = self.check_hierarchy(certificate.name(), certificate.signer_name()) {
            warn!(name = %certificate.name(), error = %violation, "certificate rejected");
            return Err(violation);
        }
        debug!(
            name = %certificate.name(),
            role = %self.classifier.classify(certificate.name()),
            seq_no,
            "certificate received"
        );
        Ok(self.store.add_certificate(certificate, seq_no, false))
    }

    /// Check a signed advertisement.
    ///
    /// The signer must be stored and verified, the packet must come from the
    /// same router as the signer's certificate and the signature must hold.
    pub fn verify_data(&self, data: &SignedData) -> bool {
        let Some(signer) = self.store.match_by_name(data.signer_name()) else {
            debug!(name = %data.name(), signer = %data.signer_name(), "unknown signer");
            return false;
        };
        if !signer.is_verified() {
            debug!(name = %data.name(), signer = %data.signer_name(), "signer not verified");
            return false;
        }

        let packet_router = self.classifier.extract_router_name(data.name());
        if packet_router.is_none() || packet_router != self.classifier.extract_router_name(signer.name()) {
            warn!(name = %data.name(), signer = %signer.name(), "router name mismatch");
            return false;
        }

        match data.verify_with(signer.certificate().public_key()) {
            Ok(()) => true,
            Err(e) => {
                warn!(name = %data.name(), error = %e, "data signature check failed");
                false
            }
        }
    }

    /// Sign an advertisement with the process key.
    pub fn sign_data(&self, name: Name, content: Vec<u8>) -> SignedData {
        SignedData::sign(name, content, &self.process_key, self.process_cert_name.clone())
    }

    pub fn store(&self) -> &CertificateStore {
        &self.store
    }

    pub fn classifier(&self) -> &KeyNameClassifier {
        &self.classifier
    }

    pub fn cert_seq(&self) -> u64 {
        self.cert_seq
    }

    pub fn get_certificate_seq(&self, name: &Name) -> Option<u64> {
        self.store.get_certificate_seq(name)
    }

    pub fn is_new_certificate(&self, name: &Name, seq_no: u64) -> bool {
        self.store.is_newer_than_store(name, seq_no)
    }

    pub fn router_identity(&self) -> &Name {
        &self.router_identity
    }

    pub fn process_identity(&self) -> &Name {
        &self.process_identity
    }

    /// `<network>/<site>/<router>`
    pub fn router_name(&self) -> &Name {
        &self.router_name
    }

    pub fn root_cert_name(&self) -> &Name {
        &self.root_cert_name
    }

    pub fn site_cert_name(&self) -> &Name {
        &self.site_cert_name
    }

    pub fn operator_cert_name(&self) -> &Name {
        &self.operator_cert_name
    }

    pub fn router_cert_name(&self) -> &Name {
        &self.router_cert_name
    }

    pub fn process_cert_name(&self) -> &Name {
        &self.process_cert_name
    }
}
