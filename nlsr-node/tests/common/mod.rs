use nlsr_model::{CertEncoding, IdentityCertificate, Name, SigningIdentity};
use nlsr_node::{DataDir, RouterConfig};
use tempfile::TempDir;

pub fn name(uri: &str) -> Name {
    uri.parse().unwrap()
}

/// A data directory holding a router key and the four bootstrap certificates
/// for `/ndn/keys/edu/memphis/R.Start/pollux`.
pub struct TestRouter {
    pub data_dir: DataDir,
    pub config: RouterConfig,
    pub operator: SigningIdentity,
    pub _dir: TempDir,
}

impl TestRouter {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let data_dir = DataDir::new(dir.path().join("nlsr"));

        let root = SigningIdentity::generate();
        let site = SigningIdentity::generate();
        let operator = SigningIdentity::generate();
        let router = SigningIdentity::generate();
        router.save(data_dir.router_key()).unwrap();

        let root_name = name("/ndn/keys/KEY/root");
        let site_name = name("/ndn/keys/edu/memphis/KEY/site");
        let op_name = name("/ndn/keys/edu/memphis/O.Start/alice/KEY/op");
        let router_name = name("/ndn/keys/edu/memphis/R.Start/pollux/KEY/rtr");

        let certs = [
            ("root.cert", IdentityCertificate::builder(root_name.clone(), root.public_key()).self_sign(&root)),
            ("site.cert", IdentityCertificate::builder(site_name.clone(), site.public_key()).sign(&root, root_name)),
            ("operator.cert", IdentityCertificate::builder(op_name.clone(), operator.public_key()).sign(&site, site_name)),
            ("router.cert", IdentityCertificate::builder(router_name, router.public_key()).sign(&operator, op_name)),
        ];
        for (file, cert) in certs {
            cert.save(data_dir.cert_dir().join(file), CertEncoding::Base64).unwrap();
        }

        let config = RouterConfig::builder()
            .site_name(name("/edu/memphis"))
            .router_name(name("/pollux"))
            .root_key_prefix(name("/ndn/keys"))
            .build()
            .unwrap();

        Self {
            data_dir,
            config,
            operator,
            _dir: dir,
        }
    }
}
