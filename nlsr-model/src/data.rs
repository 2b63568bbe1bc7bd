//! Signed advertisement packets
//!
//! LSAs and other routing advertisements travel as `SignedData`, signed by the
//! NLSR process key and naming the process certificate as key locator.

use crate::crypto::{self, content_hash};
use crate::identity::SigningIdentity;
use crate::name::Name;
use crate::types::{Hash, PubKey, Signature};
use prost::Message;

#[derive(Clone, PartialEq, Message)]
struct DataWire {
    #[prost(string, tag = "1")]
    name: String,
    #[prost(string, tag = "2")]
    signer: String,
    #[prost(bytes = "vec", tag = "3")]
    content: Vec<u8>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SignedData {
    name: Name,
    signer: Name,
    content: Vec<u8>,
    signature: Signature,
}

impl SignedData {
    /// Sign `content` under `name` with `identity`.
    pub fn sign(name: Name, content: Vec<u8>, identity: &SigningIdentity, signer: Name) -> Self {
        let mut data = Self {
            name,
            signer,
            content,
            signature: Signature::EMPTY,
        };
        data.signature = identity.sign_hash(&data.signed_hash());
        data
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn signer_name(&self) -> &Name {
        &self.signer
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn signed_hash(&self) -> Hash {
        let wire = DataWire {
            name: self.name.to_string(),
            signer: self.signer.to_string(),
            content: self.content.clone(),
        };
        content_hash(&wire.encode_to_vec())
    }

    pub fn verify_with(&self, signer_key: &PubKey) -> Result<(), crypto::CryptoError> {
        crypto::verify_hash(signer_key, &self.signed_hash(), &self.signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let key = SigningIdentity::generate();
        let name: Name = "/ndn/edu/memphis/LSA/name/7".parse().unwrap();
        let signer: Name = "/ndn/keys/edu/R.Start/r1/nlsr/KEY/ksk-1".parse().unwrap();

        let data = SignedData::sign(name.clone(), b"prefixes".to_vec(), &key, signer.clone());
        assert_eq!(data.name(), &name);
        assert_eq!(data.signer_name(), &signer);
        assert!(data.verify_with(&key.public_key()).is_ok());
        assert!(data.verify_with(&SigningIdentity::generate().public_key()).is_err());
    }
}
