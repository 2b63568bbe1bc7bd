//! Router configuration

use crate::data_dir::{DataDir, CERT_SEQ_FILE, LSA_SEQ_FILE};
use crate::node::NodeError;
use nlsr_model::Name;
use nlsr_security::BootstrapParams;
use std::path::PathBuf;

pub const DEFAULT_NETWORK: &str = "ndn";

/// Identity and file locations of one router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub network: Name,
    pub site_name: Name,
    pub router_name: Name,
    pub root_key_prefix: Name,
    /// Overrides `DataDir::cert_dir`.
    pub cert_dir: Option<PathBuf>,
    /// Directory holding both sequence files. Overrides the data dir.
    pub seq_file_dir: Option<PathBuf>,
}

impl RouterConfig {
    pub fn builder() -> RouterConfigBuilder {
        RouterConfigBuilder::default()
    }

    pub fn bootstrap_params(&self) -> BootstrapParams {
        BootstrapParams {
            network: self.network.clone(),
            root_key_prefix: self.root_key_prefix.clone(),
            site_name: self.site_name.clone(),
            router_name: self.router_name.clone(),
        }
    }

    pub fn cert_dir_in(&self, data_dir: &DataDir) -> PathBuf {
        self.cert_dir.clone().unwrap_or_else(|| data_dir.cert_dir())
    }

    pub fn lsa_seq_file_in(&self, data_dir: &DataDir) -> PathBuf {
        match &self.seq_file_dir {
            Some(dir) => dir.join(LSA_SEQ_FILE),
            None => data_dir.lsa_seq_file(),
        }
    }

    pub fn cert_seq_file_in(&self, data_dir: &DataDir) -> PathBuf {
        match &self.seq_file_dir {
            Some(dir) => dir.join(CERT_SEQ_FILE),
            None => data_dir.cert_seq_file(),
        }
    }
}

#[derive(Debug, Default)]
pub struct RouterConfigBuilder {
    network: Option<Name>,
    site_name: Option<Name>,
    router_name: Option<Name>,
    root_key_prefix: Option<Name>,
    cert_dir: Option<PathBuf>,
    seq_file_dir: Option<PathBuf>,
}

impl RouterConfigBuilder {
    /// Network prefix prepended to extracted site and router names (default `/ndn`).
    pub fn network(mut self, network: Name) -> Self {
        self.network = Some(network);
        self
    }

    pub fn site_name(mut self, site_name: Name) -> Self {
        self.site_name = Some(site_name);
        self
    }

    pub fn router_name(mut self, router_name: Name) -> Self {
        self.router_name = Some(router_name);
        self
    }

    pub fn root_key_prefix(mut self, root_key_prefix: Name) -> Self {
        self.root_key_prefix = Some(root_key_prefix);
        self
    }

    pub fn cert_dir(mut self, cert_dir: impl Into<PathBuf>) -> Self {
        self.cert_dir = Some(cert_dir.into());
        self
    }

    pub fn seq_file_dir(mut self, seq_file_dir: impl Into<PathBuf>) -> Self {
        self.seq_file_dir = Some(seq_file_dir.into());
        self
    }

    pub fn build(self) -> Result<RouterConfig, NodeError> {
        fn required(value: Option<Name>, field: &str) -> Result<Name, NodeError> {
            match value {
                Some(name) if !name.is_empty() => Ok(name),
                _ => Err(NodeError::Config(format!("{field} must not be empty"))),
            }
        }

        Ok(RouterConfig {
            network: self
                .network
                .unwrap_or_else(|| Name::new().append(DEFAULT_NETWORK)),
            site_name: required(self.site_name, "site name")?,
            router_name: required(self.router_name, "router name")?,
            root_key_prefix: required(self.root_key_prefix, "root key prefix")?,
            cert_dir: self.cert_dir,
            seq_file_dir: self.seq_file_dir,
        })
    }
}
