//! Certificate-authority resource model
//!
//! A certificate authority is keyed by `(type, domain_name)`. The
//! `cluster_name` is the name the issuing cluster declares for itself inside
//! its signing identity; for an imported authority the `domain_name` is
//! rewritten to the owning trusted cluster while `cluster_name` keeps the
//! remote's self-declared value.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::RoleMapping;

/// The two authority types: hosts sign node identities, users sign
/// end-user identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertAuthType {
    Host,
    User,
}

impl CertAuthType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CertAuthType::Host => "host",
            CertAuthType::User => "user",
        }
    }
}

impl fmt::Display for CertAuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage identity of a certificate authority.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CertAuthId {
    pub auth_type: CertAuthType,
    pub domain_name: String,
}

impl CertAuthId {
    pub fn new(auth_type: CertAuthType, domain_name: impl Into<String>) -> Self {
        Self { auth_type, domain_name: domain_name.into() }
    }
}

impl fmt::Display for CertAuthId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.auth_type, self.domain_name)
    }
}

/// A TLS certificate plus its signing key, both PEM.
///
/// The key half is stripped by the stores unless signing keys are
/// explicitly requested, so it is empty on everything that crosses the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsKeyPair {
    #[serde(with = "crate::encoding::base64_bytes")]
    pub cert: Vec<u8>,
    #[serde(with = "crate::encoding::base64_bytes", default)]
    pub key: Vec<u8>,
}

/// A certificate authority record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertAuthority {
    pub auth_type: CertAuthType,
    /// Storage key; equals the owning trusted cluster's name once imported.
    pub domain_name: String,
    /// Self-declared name of the issuing cluster.
    pub cluster_name: String,
    /// Inactive authorities are retained but not trusted for validation.
    pub active: bool,
    pub roles: Vec<String>,
    pub role_map: Vec<RoleMapping>,
    pub tls_key_pairs: Vec<TlsKeyPair>,
}

impl CertAuthority {
    /// A fresh authority owned by `cluster_name` itself.
    pub fn new(
        auth_type: CertAuthType,
        cluster_name: impl Into<String>,
        tls_key_pairs: Vec<TlsKeyPair>,
    ) -> Self {
        let cluster_name = cluster_name.into();
        Self {
            auth_type,
            domain_name: cluster_name.clone(),
            cluster_name,
            active: true,
            roles: Vec::new(),
            role_map: Vec::new(),
            tls_key_pairs,
        }
    }

    pub fn id(&self) -> CertAuthId {
        CertAuthId::new(self.auth_type, self.domain_name.clone())
    }

    /// Rebind the storage name, leaving the embedded cluster name alone.
    pub fn set_name(&mut self, domain_name: impl Into<String>) {
        self.domain_name = domain_name.into();
    }

    /// Copy without signing keys; the certificate halves stay.
    pub fn without_signing_keys(&self) -> Self {
        let mut ca = self.clone();
        for pair in &mut ca.tls_key_pairs {
            pair.key = Vec::new();
        }
        ca
    }
}
