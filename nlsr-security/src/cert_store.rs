//! CertificateStore - known certificates and their verification state
//!
//! The store is the only owner of certificate records. Everything else refers
//! to certificates by name.
//!
//! A certificate becomes verified in one of two ways:
//! 1. It is inserted pre-trusted (bootstrap certificates, our own process cert).
//! 2. Its signer is in the store and verified, and its signature checks out.
//!
//! When the signer is missing or not yet verified, the certificate is parked in
//! the `WaitingList` under its key locator. Every time a certificate becomes
//! verified, the waiting list entries that resolve to it are drained through a
//! work queue, and each waitee that verifies is queued in turn.
//!
//! Lookups use the tolerant rule from `Name::resolves_to`: a stored name
//! matches a lookup name equal to it or one trailing component longer. Two
//! records never overlap under that rule.

use crate::waiting_list::WaitingList;
use nlsr_model::{Clock, IdentityCertificate, Name, PubKey, SystemClock};
use std::collections::VecDeque;
use std::fmt;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Signature check against a signer's public key.
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, subject: &IdentityCertificate, signer_key: &PubKey) -> bool;
}

/// Ed25519 signature check plus the subject's validity window.
#[derive(Debug, Clone, Default)]
pub struct Ed25519Verifier<C: Clock = SystemClock> {
    clock: C,
}

impl<C: Clock> Ed25519Verifier<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> SignatureVerifier for Ed25519Verifier<C> {
    fn verify(&self, subject: &IdentityCertificate, signer_key: &PubKey) -> bool {
        if !subject.is_valid_now(&self.clock) {
            debug!(name = %subject.name(), now = self.clock.now_ms(), "certificate outside validity window");
            return false;
        }
        subject.verify_with(signer_key).is_ok()
    }
}

/// A stored certificate with its freshness and trust state.
#[derive(Clone, Debug)]
pub struct CertificateRecord {
    certificate: IdentityCertificate,
    seq_no: u64,
    verified: bool,
}

impl CertificateRecord {
    pub fn name(&self) -> &Name {
        self.certificate.name()
    }

    pub fn signer_name(&self) -> &Name {
        self.certificate.signer_name()
    }

    pub fn certificate(&self) -> &IdentityCertificate {
        &self.certificate
    }

    pub fn seq_no(&self) -> u64 {
        self.seq_no
    }

    pub fn is_verified(&self) -> bool {
        self.verified
    }
}

/// Outcome of one verification attempt for a stored certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Attempt {
    /// Flipped from unverified to verified.
    Verified,
    /// Was already verified.
    AlreadyVerified,
    /// Parked on its signer.
    Deferred,
    /// Signer was available but the signature did not check out.
    Failed,
    /// No such record.
    Missing,
}

pub struct CertificateStore {
    records: Vec<CertificateRecord>,
    waiting_list: WaitingList,
    verifier: Box<dyn SignatureVerifier>,
    verified_tx: broadcast::Sender<Name>,
}

impl Default for CertificateStore {
    fn default() -> Self {
        Self::new(Ed25519Verifier::<SystemClock>::default())
    }
}

impl CertificateStore {
    pub fn new(verifier: impl SignatureVerifier + 'static) -> Self {
        let (verified_tx, _) = broadcast::channel(256);
        Self {
            records: Vec::new(),
            waiting_list: WaitingList::new(),
            verifier: Box::new(verifier),
            verified_tx,
        }
    }

    /// Subscribe to names of certificates as they become verified.
    pub fn subscribe_verified(&self) -> broadcast::Receiver<Name> {
        self.verified_tx.subscribe()
    }

    /// Find the record whose name `lookup` resolves to (first in store order).
    pub fn match_by_name(&self, lookup: &Name) -> Option<&CertificateRecord> {
        self.records.iter().find(|r| lookup.resolves_to(r.name()))
    }

    fn position(&self, lookup: &Name) -> Option<usize> {
        self.records.iter().position(|r| lookup.resolves_to(r.name()))
    }

    /// Insert or refresh a certificate.
    ///
    /// Returns false when a record for the same identity already exists with
    /// an equal or higher sequence number; the store is left untouched.
    pub fn add_certificate(
        &mut self,
        certificate: IdentityCertificate,
        seq_no: u64,
        pre_trusted: bool,
    ) -> bool {
        let name = certificate.name().clone();

        // A name can overlap one shorter and one longer record at once
        if let Some(fresher) = self
            .records
            .iter()
            .filter(|r| r.name().overlaps(&name))
            .find(|r| r.seq_no >= seq_no)
        {
            debug!(name = %name, seq_no, stored = fresher.seq_no, "stale certificate dropped");
            return false;
        }
        self.records.retain(|r| {
            let replaced = r.name().overlaps(&name);
            if replaced {
                debug!(name = %name, seq_no, stored = r.seq_no, old = %r.name(), "replacing certificate");
            }
            !replaced
        });

        self.records.push(CertificateRecord {
            certificate,
            seq_no,
            verified: false,
        });

        if pre_trusted {
            self.mark_verified(&name);
            self.cascade(name);
        } else if self.attempt(&name) == Attempt::Verified {
            self.cascade(name);
        }
        true
    }

    /// Try to verify the stored certificate `name` against its signer.
    fn attempt(&mut self, name: &Name) -> Attempt {
        let Some(idx) = self.position(name) else {
            return Attempt::Missing;
        };
        if self.records[idx].verified {
            return Attempt::AlreadyVerified;
        }

        let signer_name = self.records[idx].signer_name().clone();
        let signer_key = match self.match_by_name(&signer_name) {
            Some(signer) if signer.verified => *signer.certificate.public_key(),
            _ => {
                let subject = self.records[idx].name().clone();
                if self.waiting_list.add(signer_name.clone(), subject.clone()) {
                    debug!(name = %subject, signer = %signer_name, "waiting for signer");
                }
                return Attempt::Deferred;
            }
        };

        if self.verifier.verify(&self.records[idx].certificate, &signer_key) {
            self.mark_verified(name);
            Attempt::Verified
        } else {
            warn!(name = %name, signer = %signer_name, "certificate signature check failed");
            Attempt::Failed
        }
    }

    fn mark_verified(&mut self, name: &Name) {
        if let Some(idx) = self.position(name) {
            self.records[idx].verified = true;
            debug!(name = %self.records[idx].name(), "certificate verified");
        }
    }

    /// Propagate verified status from `root` to everything waiting on it.
    ///
    /// Each name enters the queue only on its unverified -> verified
    /// transition, so the loop runs at most once per stored record.
    fn cascade(&mut self, root: Name) {
        let mut work_queue = VecDeque::from([root]);

        while let Some(verified) = work_queue.pop_front() {
            let _ = self.verified_tx.send(verified.clone());

            let signers: Vec<Name> = self
                .waiting_list
                .signers()
                .filter(|signer| signer.resolves_to(&verified))
                .cloned()
                .collect();

            for signer in signers {
                let waitees = self
                    .waiting_list
                    .get(&signer)
                    .map(|entry| entry.waitees().to_vec())
                    .unwrap_or_default();

                for waitee in waitees {
                    match self.attempt(&waitee) {
                        Attempt::Verified => work_queue.push_back(waitee),
                        Attempt::Missing => {
                            debug!(name = %waitee, "waitee no longer in store");
                        }
                        _ => {}
                    }
                }
                self.waiting_list.remove(&signer);
            }
        }
    }

    /// Certificate stored under `name`.
    pub fn get_certificate(&self, name: &Name) -> Option<&IdentityCertificate> {
        self.match_by_name(name).map(|r| &r.certificate)
    }

    /// Certificate stored under `name`, only if its sequence number is `seq_no`.
    pub fn get_certificate_with_seq(&self, name: &Name, seq_no: u64) -> Option<&IdentityCertificate> {
        self.match_by_name(name)
            .filter(|r| r.seq_no == seq_no)
            .map(|r| &r.certificate)
    }

    pub fn get_certificate_seq(&self, name: &Name) -> Option<u64> {
        self.match_by_name(name).map(|r| r.seq_no)
    }

    /// True if nothing is stored under `name` or the stored copy is older than `seq_no`.
    pub fn is_newer_than_store(&self, name: &Name, seq_no: u64) -> bool {
        self.match_by_name(name).map_or(true, |r| r.seq_no < seq_no)
    }

    pub fn is_verified(&self, name: &Name) -> bool {
        self.match_by_name(name).is_some_and(|r| r.verified)
    }

    /// Set the verification flag of the record under `name`.
    ///
    /// Verification is monotonic: clearing the flag of a verified record is
    /// ignored. Setting it triggers the same cascade as a signature check.
    /// Returns false if no record matches.
    pub fn set_verified(&mut self, name: &Name, verified: bool) -> bool {
        let Some(idx) = self.position(name) else {
            return false;
        };
        let record_name = self.records[idx].name().clone();
        if !verified {
            if self.records[idx].verified {
                debug!(name = %record_name, "ignoring attempt to clear verified flag");
            }
            return true;
        }
        if !self.records[idx].verified {
            self.mark_verified(&record_name);
            self.cascade(record_name);
        }
        true
    }

    /// Remove the record under `name`. Its waiting list registrations stay.
    pub fn remove_certificate(&mut self, name: &Name) -> bool {
        match self.position(name) {
            Some(idx) => {
                let removed = self.records.remove(idx);
                debug!(name = %removed.name(), "certificate removed");
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &CertificateRecord> {
        self.records.iter()
    }

    pub fn waiting_list(&self) -> &WaitingList {
        &self.waiting_list
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl fmt::Display for CertificateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Certificate store ({} records)", self.records.len())?;
        for r in &self.records {
            writeln!(
                f,
                "  {} seq={} verified={} signer={}",
                r.name(),
                r.seq_no,
                r.verified,
                r.signer_name()
            )?;
        }
        write!(f, "{}", self.waiting_list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nlsr_model::{MockClock, SigningIdentity};

    fn name(uri: &str) -> Name {
        uri.parse().unwrap()
    }

    /// Accepts every signature. Lets tests focus on bookkeeping.
    struct AcceptAll;

    impl SignatureVerifier for AcceptAll {
        fn verify(&self, _: &IdentityCertificate, _: &PubKey) -> bool {
            true
        }
    }

    /// Rejects every signature.
    struct RejectAll;

    impl SignatureVerifier for RejectAll {
        fn verify(&self, _: &IdentityCertificate, _: &PubKey) -> bool {
            false
        }
    }

    fn cert(cert_name: &str, signer: &str) -> IdentityCertificate {
        let key = SigningIdentity::generate();
        IdentityCertificate::builder(name(cert_name), key.public_key()).sign(&key, name(signer))
    }

    #[test]
    fn test_match_by_name_is_tolerant() {
        let mut store = CertificateStore::new(AcceptAll);
        store.add_certificate(cert("/ndn/KEY/root", "/ndn/KEY/root"), 1, true);

        assert!(store.match_by_name(&name("/ndn/KEY/root")).is_some());
        assert!(store.match_by_name(&name("/ndn/KEY/root/v=1")).is_some());
        assert!(store.match_by_name(&name("/ndn/KEY/root/v=1/x")).is_none());
        assert!(store.match_by_name(&name("/ndn/KEY")).is_none());
    }

    #[test]
    fn test_freshness() {
        let mut store = CertificateStore::new(AcceptAll);
        let n = name("/ndn/edu/KEY/site");

        assert!(store.add_certificate(cert("/ndn/edu/KEY/site", "/ndn/KEY/root"), 5, false));
        assert!(!store.add_certificate(cert("/ndn/edu/KEY/site", "/ndn/KEY/root"), 5, false));
        assert!(!store.add_certificate(cert("/ndn/edu/KEY/site", "/ndn/KEY/root"), 4, false));
        assert_eq!(store.get_certificate_seq(&n), Some(5));

        assert!(store.add_certificate(cert("/ndn/edu/KEY/site", "/ndn/KEY/root"), 6, false));
        assert_eq!(store.get_certificate_seq(&n), Some(6));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_overlapping_name_counts_as_same_identity() {
        let mut store = CertificateStore::new(AcceptAll);
        assert!(store.add_certificate(cert("/ndn/edu/KEY/site", "/ndn/KEY/root"), 5, false));
        // One component longer: same logical identity, stale
        assert!(!store.add_certificate(cert("/ndn/edu/KEY/site/v=2", "/ndn/KEY/root"), 3, false));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_insert_between_two_records_replaces_both() {
        let mut store = CertificateStore::new(AcceptAll);
        store.add_certificate(cert("/a/KEY/k", "/root/KEY/r"), 1, false);
        store.add_certificate(cert("/a/KEY/k/v/w", "/root/KEY/r"), 1, false);
        assert_eq!(store.len(), 2);

        // Overlaps the shorter record from below and the longer one from above
        assert!(store.add_certificate(cert("/a/KEY/k/v", "/root/KEY/r"), 2, false));

        let names: Vec<&Name> = store.iter().map(|r| r.name()).collect();
        assert_eq!(names, vec![&name("/a/KEY/k/v")]);
        let overlapping = store
            .iter()
            .filter(|r| r.name().overlaps(&name("/a/KEY/k/v")))
            .count();
        assert_eq!(overlapping, 1);
    }

    #[test]
    fn test_insert_rejected_if_any_overlapping_record_is_fresher() {
        let mut store = CertificateStore::new(AcceptAll);
        store.add_certificate(cert("/a/KEY/k", "/root/KEY/r"), 1, false);
        store.add_certificate(cert("/a/KEY/k/v/w", "/root/KEY/r"), 5, false);

        assert!(!store.add_certificate(cert("/a/KEY/k/v", "/root/KEY/r"), 2, false));
        assert_eq!(store.len(), 2);
        assert_eq!(store.get_certificate_seq(&name("/a/KEY/k")), Some(1));
        assert_eq!(store.get_certificate_seq(&name("/a/KEY/k/v/w")), Some(5));
    }

    #[test]
    fn test_stale_insert_leaves_store_unchanged() {
        let mut store = CertificateStore::new(AcceptAll);
        let original = cert("/ndn/edu/KEY/site", "/ndn/KEY/root");
        store.add_certificate(original.clone(), 7, false);

        store.add_certificate(cert("/ndn/edu/KEY/site", "/ndn/KEY/other"), 7, false);
        assert_eq!(store.get_certificate(&name("/ndn/edu/KEY/site")), Some(&original));
    }

    #[test]
    fn test_unknown_signer_defers() {
        let mut store = CertificateStore::new(AcceptAll);
        store.add_certificate(cert("/ndn/edu/KEY/site", "/ndn/KEY/root"), 1, false);

        assert!(!store.is_verified(&name("/ndn/edu/KEY/site")));
        let entry = store.waiting_list().get(&name("/ndn/KEY/root")).unwrap();
        assert_eq!(entry.waitees(), &[name("/ndn/edu/KEY/site")]);
    }

    #[test]
    fn test_unverified_signer_defers() {
        let mut store = CertificateStore::new(AcceptAll);
        store.add_certificate(cert("/ndn/edu/KEY/site", "/ndn/KEY/root"), 1, false);
        store.add_certificate(cert("/ndn/edu/O.Start/op/KEY/o", "/ndn/edu/KEY/site"), 1, false);

        assert!(!store.is_verified(&name("/ndn/edu/O.Start/op/KEY/o")));
        assert!(store.waiting_list().get(&name("/ndn/edu/KEY/site")).is_some());
    }

    #[test]
    fn test_verified_signer_verifies_immediately() {
        let mut store = CertificateStore::new(AcceptAll);
        store.add_certificate(cert("/ndn/KEY/root", "/ndn/KEY/root"), 1, true);
        store.add_certificate(cert("/ndn/edu/KEY/site", "/ndn/KEY/root"), 1, false);

        assert!(store.is_verified(&name("/ndn/edu/KEY/site")));
        assert!(store.waiting_list().is_empty());
    }

    #[test]
    fn test_failed_check_is_not_retried() {
        let mut store = CertificateStore::new(RejectAll);
        store.add_certificate(cert("/ndn/KEY/root", "/ndn/KEY/root"), 1, true);
        store.add_certificate(cert("/ndn/edu/KEY/site", "/ndn/KEY/root"), 1, false);

        assert!(!store.is_verified(&name("/ndn/edu/KEY/site")));
        assert!(store.waiting_list().is_empty());
    }

    #[test]
    fn test_cascade_through_versioned_locator() {
        let mut store = CertificateStore::new(AcceptAll);
        store.add_certificate(cert("/ndn/edu/KEY/site", "/ndn/KEY/root/v=3"), 1, false);
        assert!(store.waiting_list().get(&name("/ndn/KEY/root/v=3")).is_some());

        store.add_certificate(cert("/ndn/KEY/root", "/ndn/KEY/root"), 1, true);
        assert!(store.is_verified(&name("/ndn/edu/KEY/site")));
        assert!(store.waiting_list().is_empty());
    }

    #[test]
    fn test_cascade_completeness() {
        let mut store = CertificateStore::new(AcceptAll);
        store.add_certificate(cert("/c1/KEY/1", "/c2/KEY/2"), 1, false);
        store.add_certificate(cert("/c2/KEY/2", "/c3/KEY/3"), 1, false);
        assert_eq!(store.waiting_list().len(), 2);

        store.add_certificate(cert("/c3/KEY/3", "/c3/KEY/3"), 1, true);

        assert!(store.is_verified(&name("/c1/KEY/1")));
        assert!(store.is_verified(&name("/c2/KEY/2")));
        assert!(store.is_verified(&name("/c3/KEY/3")));
        assert!(store.waiting_list().get(&name("/c2/KEY/2")).is_none());
        assert!(store.waiting_list().get(&name("/c3/KEY/3")).is_none());
    }

    #[test]
    fn test_verified_events_are_broadcast() {
        let mut store = CertificateStore::new(AcceptAll);
        let mut rx = store.subscribe_verified();

        store.add_certificate(cert("/c1/KEY/1", "/c2/KEY/2"), 1, false);
        store.add_certificate(cert("/c2/KEY/2", "/c2/KEY/2"), 1, true);

        assert_eq!(rx.try_recv().unwrap(), name("/c2/KEY/2"));
        assert_eq!(rx.try_recv().unwrap(), name("/c1/KEY/1"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_set_verified_is_monotonic_and_cascades() {
        let mut store = CertificateStore::new(AcceptAll);
        store.add_certificate(cert("/c1/KEY/1", "/c2/KEY/2"), 1, false);
        store.add_certificate(cert("/c2/KEY/2", "/c3/KEY/3"), 1, false);

        assert!(store.set_verified(&name("/c2/KEY/2"), true));
        assert!(store.is_verified(&name("/c1/KEY/1")));

        assert!(store.set_verified(&name("/c2/KEY/2"), false));
        assert!(store.is_verified(&name("/c2/KEY/2")));

        assert!(!store.set_verified(&name("/missing/KEY/1"), true));
    }

    #[test]
    fn test_get_with_seq_and_newer() {
        let mut store = CertificateStore::new(AcceptAll);
        let n = name("/ndn/edu/KEY/site");
        store.add_certificate(cert("/ndn/edu/KEY/site", "/ndn/KEY/root"), 4, false);

        assert!(store.get_certificate_with_seq(&n, 4).is_some());
        assert!(store.get_certificate_with_seq(&n, 3).is_none());
        assert!(store.is_newer_than_store(&n, 5));
        assert!(!store.is_newer_than_store(&n, 4));
        assert!(store.is_newer_than_store(&name("/unknown/KEY/1"), 0));
    }

    #[test]
    fn test_remove_certificate() {
        let mut store = CertificateStore::new(AcceptAll);
        store.add_certificate(cert("/ndn/KEY/root", "/ndn/KEY/root"), 1, true);

        assert!(store.remove_certificate(&name("/ndn/KEY/root/v=1")));
        assert!(!store.remove_certificate(&name("/ndn/KEY/root")));
        assert!(store.is_empty());
    }

    #[test]
    fn test_ed25519_verifier_checks_signature_and_window() {
        let root = SigningIdentity::generate();
        let site = SigningIdentity::generate();
        let root_cert = IdentityCertificate::builder(name("/ndn/KEY/root"), root.public_key())
            .validity(0, 10_000)
            .self_sign(&root);
        let good = IdentityCertificate::builder(name("/ndn/edu/KEY/site"), site.public_key())
            .validity(0, 10_000)
            .sign(&root, name("/ndn/KEY/root"));
        let forged = IdentityCertificate::builder(name("/ndn/org/KEY/site"), site.public_key())
            .validity(0, 10_000)
            .sign(&site, name("/ndn/KEY/root"));

        let mut store = CertificateStore::new(Ed25519Verifier::with_clock(MockClock::new(5_000)));
        store.add_certificate(root_cert, 1, true);
        store.add_certificate(good, 1, false);
        store.add_certificate(forged, 1, false);

        assert!(store.is_verified(&name("/ndn/edu/KEY/site")));
        assert!(!store.is_verified(&name("/ndn/org/KEY/site")));

        let expired = IdentityCertificate::builder(name("/ndn/net/KEY/site"), site.public_key())
            .validity(0, 1_000)
            .sign(&root, name("/ndn/KEY/root"));
        store.add_certificate(expired, 1, false);
        assert!(!store.is_verified(&name("/ndn/net/KEY/site")));
    }

    #[test]
    fn test_ed25519_verifier_follows_clock() {
        let root = SigningIdentity::generate();
        let site = SigningIdentity::generate();
        let clock = MockClock::new(0);
        let issue = |uri: &str| {
            IdentityCertificate::builder(name(uri), site.public_key())
                .valid_for(&clock, 1_000)
                .sign(&root, name("/ndn/KEY/root"))
        };
        let early = issue("/ndn/edu/KEY/site");
        let late = issue("/ndn/org/KEY/site");

        let mut store = CertificateStore::new(Ed25519Verifier::with_clock(clock.clone()));
        let root_cert = IdentityCertificate::builder(name("/ndn/KEY/root"), root.public_key())
            .self_sign(&root);
        store.add_certificate(root_cert, 1, true);

        clock.advance(500);
        store.add_certificate(early, 1, false);
        assert!(store.is_verified(&name("/ndn/edu/KEY/site")));

        clock.advance(501);
        store.add_certificate(late, 1, false);
        assert!(!store.is_verified(&name("/ndn/org/KEY/site")));
    }
}
