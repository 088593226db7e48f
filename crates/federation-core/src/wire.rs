//! Validation RPC envelope
//!
//! The handshake exchanges a token plus certificate-authority bundles. Each
//! message has a native form (typed [`CertAuthority`] values) and a raw wire
//! form where every authority is an opaque marshalled blob, base64 inside a
//! JSON array. This module is the only place CA serialization appears.

use serde::{Deserialize, Serialize};

use crate::authority::CertAuthority;
use crate::error::{Result, TrustError};

/// Serialize an authority into its opaque wire bytes.
pub fn marshal_cert_authority(ca: &CertAuthority) -> Result<Vec<u8>> {
    serde_json::to_vec(ca).map_err(|e| {
        TrustError::BadParameter(format!("failed to marshal certificate authority: {e}"))
    })
}

/// Recover an authority from its opaque wire bytes.
pub fn unmarshal_cert_authority(data: &[u8]) -> Result<CertAuthority> {
    serde_json::from_slice(data).map_err(|e| {
        TrustError::BadParameter(format!("failed to unmarshal certificate authority: {e}"))
    })
}

/// Handshake request: the initiator's token and host authorities.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidateRequest {
    pub token: String,
    pub cert_authorities: Vec<CertAuthority>,
}

/// Wire form of [`ValidateRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidateRequestRaw {
    pub token: String,
    #[serde(rename = "certificate_authorities", with = "crate::encoding::base64_list")]
    pub cert_authorities: Vec<Vec<u8>>,
}

impl ValidateRequest {
    pub fn to_raw(&self) -> Result<ValidateRequestRaw> {
        let cert_authorities = self
            .cert_authorities
            .iter()
            .map(marshal_cert_authority)
            .collect::<Result<Vec<_>>>()?;
        Ok(ValidateRequestRaw { token: self.token.clone(), cert_authorities })
    }
}

impl ValidateRequestRaw {
    pub fn to_native(&self) -> Result<ValidateRequest> {
        let cert_authorities = self
            .cert_authorities
            .iter()
            .map(|blob| unmarshal_cert_authority(blob))
            .collect::<Result<Vec<_>>>()?;
        Ok(ValidateRequest { token: self.token.clone(), cert_authorities })
    }
}

/// Handshake response: the responder's host and user authorities.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidateResponse {
    pub cert_authorities: Vec<CertAuthority>,
}

/// Wire form of [`ValidateResponse`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidateResponseRaw {
    #[serde(rename = "certificate_authorities", with = "crate::encoding::base64_list")]
    pub cert_authorities: Vec<Vec<u8>>,
}

impl ValidateResponse {
    pub fn to_raw(&self) -> Result<ValidateResponseRaw> {
        let cert_authorities = self
            .cert_authorities
            .iter()
            .map(marshal_cert_authority)
            .collect::<Result<Vec<_>>>()?;
        Ok(ValidateResponseRaw { cert_authorities })
    }
}

impl ValidateResponseRaw {
    pub fn to_native(&self) -> Result<ValidateResponse> {
        let cert_authorities = self
            .cert_authorities
            .iter()
            .map(|blob| unmarshal_cert_authority(blob))
            .collect::<Result<Vec<_>>>()?;
        Ok(ValidateResponse { cert_authorities })
    }
}
