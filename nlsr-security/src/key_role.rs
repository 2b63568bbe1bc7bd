//! Key name classification
//!
//! Certificate names encode their place in the trust hierarchy through
//! reserved marker components:
//!
//! ```text
//! <root-prefix>/KEY/<id>                                     root
//! <root-prefix>/<site>/KEY/<id>                              site
//! <root-prefix>/<site>/O.Start/<operator>/KEY/<id>           operator
//! <root-prefix>/<site>/R.Start/<router>/KEY/<id>             router
//! <root-prefix>/<site>/R.Start/<router>/nlsr/KEY/<id>        process
//! ```
//!
//! Advertisement names carry `info` or `LSA` markers instead and only take
//! part in router name extraction.

use nlsr_model::Name;
use std::fmt;

pub const KEY_MARKER: &str = "KEY";
pub const OPERATOR_MARKER: &str = "O.Start";
pub const ROUTER_MARKER: &str = "R.Start";
pub const PROCESS_MARKER: &str = "nlsr";
pub const INFO_MARKER: &str = "info";
pub const LSA_MARKER: &str = "LSA";

/// Trailing components of an LSA name after the router name
/// (type, sequence number, segment).
const LSA_SUFFIX_LEN: usize = 3;

/// Position in the trust hierarchy. Ordered from most to least trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyRole {
    Root,
    Site,
    Operator,
    Router,
    Process,
}

impl fmt::Display for KeyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            KeyRole::Root => "root",
            KeyRole::Site => "site",
            KeyRole::Operator => "operator",
            KeyRole::Router => "router",
            KeyRole::Process => "process",
        };
        f.write_str(label)
    }
}

/// A name plus the positions of its first marker components.
#[derive(Debug, Clone)]
pub struct NameTokens<'a> {
    name: &'a Name,
    pub key: Option<usize>,
    pub operator: Option<usize>,
    pub router: Option<usize>,
    pub process: Option<usize>,
    pub info: Option<usize>,
    pub lsa: Option<usize>,
}

impl<'a> NameTokens<'a> {
    pub fn new(name: &'a Name) -> Self {
        Self {
            name,
            key: name.position(KEY_MARKER),
            operator: name.position(OPERATOR_MARKER),
            router: name.position(ROUTER_MARKER),
            process: name.position(PROCESS_MARKER),
            info: name.position(INFO_MARKER),
            lsa: name.position(LSA_MARKER),
        }
    }

    pub fn name(&self) -> &Name {
        self.name
    }

    /// Components `[start, end)`. Empty for an inverted or out of range span.
    pub fn slice(&self, start: usize, end: usize) -> Name {
        if start >= end || end > self.name.len() {
            return Name::new();
        }
        Name::from_components(self.name.components()[start..end].iter().cloned())
    }
}

/// Classifies certificate names and extracts the owning root, site and router.
#[derive(Debug, Clone)]
pub struct KeyNameClassifier {
    root_prefix: Name,
    network: Name,
}

impl KeyNameClassifier {
    pub fn new(root_prefix: Name, network: Name) -> Self {
        Self {
            root_prefix,
            network,
        }
    }

    pub fn root_prefix(&self) -> &Name {
        &self.root_prefix
    }

    pub fn network(&self) -> &Name {
        &self.network
    }

    /// Priority ordered: Root, Operator, Process, Router, then Site for
    /// anything else.
    ///
    /// The Site fallback also catches malformed names. Callers that care
    /// should check the name carries a `KEY` marker first.
    pub fn classify(&self, name: &Name) -> KeyRole {
        let t = NameTokens::new(name);
        match (t.key, t.operator, t.router, t.process) {
            (Some(key), _, _, _) if name.prefix(key) == self.root_prefix => KeyRole::Root,
            (_, Some(_), _, _) => KeyRole::Operator,
            (_, None, Some(_), Some(_)) => KeyRole::Process,
            (_, None, Some(_), None) => KeyRole::Router,
            _ => KeyRole::Site,
        }
    }

    /// The first `len(root_prefix)` components.
    pub fn extract_root_name(&self, name: &Name) -> Name {
        name.prefix(self.root_prefix.len())
    }

    /// Network prefix plus the site components that follow the root prefix.
    pub fn extract_site_name(&self, name: &Name) -> Option<Name> {
        let t = NameTokens::new(name);
        let end = t.router.or(t.operator).or(t.key)?;
        Some(self.network.clone().join(&t.slice(self.root_prefix.len(), end)))
    }

    /// Router the name belongs to.
    ///
    /// Certificate names map to `<network>/<site>/<router>`. Names under an
    /// `info` marker map to everything before it; LSA names map to the
    /// components between `LSA` and the type/sequence/segment suffix.
    pub fn extract_router_name(&self, name: &Name) -> Option<Name> {
        let t = NameTokens::new(name);
        let rkp_len = self.root_prefix.len();

        match (t.router, t.process) {
            (Some(r), Some(p)) => {
                return Some(
                    self.network
                        .clone()
                        .join(&t.slice(rkp_len, r))
                        .join(&t.slice(r + 1, p)),
                );
            }
            (Some(r), None) if t.info.is_none() && t.lsa.is_none() => {
                let key = t.key?;
                return Some(
                    self.network
                        .clone()
                        .join(&t.slice(rkp_len, r))
                        .join(&t.slice(r + 1, key)),
                );
            }
            _ => {}
        }

        if let Some(info) = t.info {
            return Some(t.slice(0, info));
        }
        let lsa = t.lsa?;
        Some(t.slice(lsa + 1, name.len().saturating_sub(LSA_SUFFIX_LEN)))
    }
}
