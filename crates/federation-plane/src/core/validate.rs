//! Trust establishment and validation
//!
//! The initiator side ([`FederationService::establish_trust`]) sends its
//! token and host authorities to the remote entry point; the responder side
//! ([`FederationService::validate_trusted_cluster`]) checks the token,
//! records the inbound identity and answers with its own authorities.

use tracing::{debug, error};

use federation_core::identity::cluster_name_from_cert;
use federation_core::{
    grants_trusted_cluster, CertAuthId, CertAuthType, CertAuthority, RemoteCluster, Result,
    TrustError, TrustedCluster, ValidateRequest, ValidateResponse,
};

use crate::rpc::ValidationClient;
use crate::storage::{CertAuthorities, Presence, TokenValidator};

use super::FederationService;

impl FederationService {
    /// Performs the outbound handshake for a descriptor.
    ///
    /// Returns the remote cluster's self-declared name, taken from the
    /// first returned authority, together with the returned authorities.
    /// The list is verified non-empty and no returned certificate may carry
    /// this cluster's own name.
    pub(crate) async fn establish_trust(
        &self,
        cluster: &TrustedCluster,
    ) -> Result<(String, Vec<CertAuthority>)> {
        let domain_name = &self.config.cluster_name;

        // send every host authority that this cluster owns itself
        let all_host_cas =
            self.authorities.get_cert_authorities(CertAuthType::Host, false).await?;
        let local_cas: Vec<CertAuthority> = all_host_cas
            .into_iter()
            .filter(|ca| &ca.cluster_name == domain_name)
            .collect();

        let request =
            ValidateRequest { token: cluster.token.clone(), cert_authorities: local_cas };

        debug!(
            proxy = %cluster.proxy_address,
            authorities = request.cert_authorities.len(),
            "Sending validate request"
        );

        let response = match self.validation.validate(&cluster.proxy_address, &request).await {
            Ok(response) => response,
            Err(err) => {
                error!(proxy = %cluster.proxy_address, error = %err, "Validate request failed");
                if err.to_string().contains("x509") {
                    return Err(TrustError::AccessDenied(
                        "the trusted cluster uses misconfigured HTTP/TLS certificate.".into(),
                    ));
                }
                return Err(err);
            }
        };

        debug!(authorities = response.cert_authorities.len(), "Received validate response");

        for ca in &response.cert_authorities {
            for key_pair in &ca.tls_key_pairs {
                let remote_cluster_name = cluster_name_from_cert(&key_pair.cert)?;
                if &remote_cluster_name == domain_name {
                    return Err(TrustError::BadParameter(
                        "remote cluster name can not be the same as local cluster name".into(),
                    ));
                }
            }
        }

        let first = response.cert_authorities.first().ok_or_else(|| {
            TrustError::BadParameter(
                "validation response carried no certificate authorities".into(),
            )
        })?;

        Ok((first.cluster_name.clone(), response.cert_authorities))
    }

    /// Responder side of the handshake.
    ///
    /// Validates the token, records the remote cluster, stores the inbound
    /// authorities as presented and answers with this cluster's own active
    /// host and user authorities.
    pub async fn validate_trusted_cluster(
        &self,
        request: &ValidateRequest,
    ) -> Result<ValidateResponse> {
        let domain_name = self.config.cluster_name.clone();

        self.validate_trusted_cluster_token(&request.token).await?;

        debug!(authorities = request.cert_authorities.len(), "Received validate request");

        let mut remote_cluster_name = String::new();
        for ca in &request.cert_authorities {
            // an inbound authority must not claim this cluster's identity
            if ca.cluster_name == domain_name {
                return Err(TrustError::AccessDenied(format!(
                    "remote certificate authority has same name as cluster certificate authority: {domain_name}"
                )));
            }
            remote_cluster_name = ca.cluster_name.clone();
        }

        let remote_cluster = RemoteCluster::new(remote_cluster_name)?;
        match self.presence.create_remote_cluster(remote_cluster).await {
            Ok(()) => {}
            Err(err) if err.is_already_exists() => {}
            Err(err) => return Err(err),
        }

        // the token checked out; store the initiator's identity as-is
        for ca in &request.cert_authorities {
            self.authorities.upsert_cert_authority(ca.clone()).await?;
        }

        let mut response = ValidateResponse { cert_authorities: Vec::new() };
        for auth_type in [CertAuthType::Host, CertAuthType::User] {
            let ca = self
                .authorities
                .get_cert_authority(&CertAuthId::new(auth_type, &domain_name), false)
                .await?;
            response.cert_authorities.push(ca);
        }

        debug!(authorities = response.cert_authorities.len(), "Sending validate response");

        Ok(response)
    }

    /// The two refusals are deliberately close in wording so a caller
    /// cannot distinguish an unknown token from one with the wrong
    /// capabilities.
    async fn validate_trusted_cluster_token(&self, token: &str) -> Result<()> {
        let capabilities = match self.tokens.validate_token(token).await {
            Ok(capabilities) => capabilities,
            Err(_) => {
                return Err(TrustError::AccessDenied(
                    "the remote server denied access: invalid cluster token".into(),
                ));
            }
        };

        if !grants_trusted_cluster(&capabilities) {
            return Err(TrustError::AccessDenied("role does not match".into()));
        }

        Ok(())
    }
}
