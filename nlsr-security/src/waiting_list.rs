//! WaitingList - certificates blocked on an unverified signer
//!
//! Maps a signer name (as it appears in the subjects' key locator) to the set
//! of subject certificate names waiting for that signer to become verified.
//!
//! Invariant: no entry ever holds an empty waitee set. Entries are created by
//! the first `add` and disappear as a whole through `remove`.

use nlsr_model::Name;
use std::fmt;

/// One signer and the certificates blocked on it, in arrival order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WaitingListEntry {
    signer: Name,
    waitees: Vec<Name>,
}

impl WaitingListEntry {
    fn new(signer: Name, first_waitee: Name) -> Self {
        Self {
            signer,
            waitees: vec![first_waitee],
        }
    }

    pub fn signer(&self) -> &Name {
        &self.signer
    }

    pub fn waitees(&self) -> &[Name] {
        &self.waitees
    }

    fn add_waitee(&mut self, waitee: Name) -> bool {
        if self.waitees.contains(&waitee) {
            return false;
        }
        self.waitees.push(waitee);
        true
    }
}

#[derive(Clone, Debug, Default)]
pub struct WaitingList {
    entries: Vec<WaitingListEntry>,
}

impl WaitingList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `waitee` as blocked on `signer`.
    /// Returns false if the pairing already existed.
    pub fn add(&mut self, signer: Name, waitee: Name) -> bool {
        match self.entries.iter_mut().find(|e| e.signer == signer) {
            Some(entry) => entry.add_waitee(waitee),
            None => {
                self.entries.push(WaitingListEntry::new(signer, waitee));
                true
            }
        }
    }

    /// Look up the entry for `signer`. `None` is an ordinary outcome.
    pub fn get(&self, signer: &Name) -> Option<&WaitingListEntry> {
        self.entries.iter().find(|e| &e.signer == signer)
    }

    /// Delete the entry for `signer`. Returns true if one existed.
    pub fn remove(&mut self, signer: &Name) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| &e.signer != signer);
        self.entries.len() != before
    }

    /// Signer names with at least one waitee, in insertion order.
    pub fn signers(&self) -> impl Iterator<Item = &Name> {
        self.entries.iter().map(|e| &e.signer)
    }

    pub fn iter(&self) -> impl Iterator<Item = &WaitingListEntry> {
        self.entries.iter()
    }

    /// Number of signers being waited on.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of blocked (signer, waitee) pairs.
    pub fn waitee_count(&self) -> usize {
        self.entries.iter().map(|e| e.waitees.len()).sum()
    }
}

impl fmt::Display for WaitingList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Waiting list ({} signers)", self.entries.len())?;
        for entry in &self.entries {
            writeln!(f, "  {}", entry.signer)?;
            for waitee in &entry.waitees {
                writeln!(f, "    <- {}", waitee)?;
            }
        }
        Ok(())
    }
}
