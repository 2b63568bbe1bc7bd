//! NLSR Node
//!
//! Everything a router process needs around the trust core: where its files
//! live, how it is configured and how its sequence numbers survive restarts.

pub mod config;
pub mod data_dir;
pub mod node;
pub mod sequencing;

pub use config::{RouterConfig, RouterConfigBuilder};
pub use data_dir::DataDir;
pub use node::{LsaType, NodeError, RouterNode};
pub use sequencing::{combine, split, CertificateSequence, SequenceError, SequencingManager};
