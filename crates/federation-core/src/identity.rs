//! Cluster identity certificates
//!
//! A cluster's self-declared name is embedded as the subject common name of
//! its authority certificates. `generate_identity` mints a self-signed
//! identity for a fresh cluster; `cluster_name_from_cert` recovers the name
//! from a peer's certificate during the handshake.
//!
//! Parse failures are reported with an `x509:` message prefix so callers can
//! distinguish PKI problems from protocol problems.

use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};
use x509_parser::pem::parse_x509_pem;

use crate::authority::TlsKeyPair;
use crate::error::{Result, TrustError};

/// Mint a self-signed identity certificate carrying `cluster_name` as the
/// subject common name.
pub fn generate_identity(cluster_name: &str) -> Result<TlsKeyPair> {
    if cluster_name.is_empty() {
        return Err(TrustError::BadParameter("missing cluster name".into()));
    }

    let key = KeyPair::generate()
        .map_err(|e| TrustError::Internal(format!("failed to generate signing key: {e}")))?;

    let mut params = CertificateParams::new(Vec::new())
        .map_err(|e| TrustError::Internal(format!("failed to build certificate params: {e}")))?;
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, cluster_name);
    params.distinguished_name = dn;

    let cert = params
        .self_signed(&key)
        .map_err(|e| TrustError::Internal(format!("failed to self-sign certificate: {e}")))?;

    Ok(TlsKeyPair {
        cert: cert.pem().into_bytes(),
        key: key.serialize_pem().into_bytes(),
    })
}

/// Extract the issuing cluster's name from a PEM certificate.
pub fn cluster_name_from_cert(cert_pem: &[u8]) -> Result<String> {
    let (_, pem) = parse_x509_pem(cert_pem)
        .map_err(|e| TrustError::BadParameter(format!("x509: failed to parse certificate PEM: {e}")))?;
    let cert = pem
        .parse_x509()
        .map_err(|e| TrustError::BadParameter(format!("x509: failed to parse certificate: {e}")))?;

    let name = cert
        .subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .ok_or_else(|| {
            TrustError::BadParameter("x509: certificate subject carries no cluster name".into())
        })?;

    Ok(name.to_string())
}
