//! Validation RPC client
//!
//! Initiator side of the handshake: POSTs the raw wire envelope to the
//! remote entry point and translates the answer back to its native form.
//! The client honors the ambient HTTP proxy environment (reqwest default).

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use federation_core::{
    Result, TrustError, ValidateRequest, ValidateResponse, ValidateResponseRaw,
};

use crate::config::TrustConfig;

/// Sends a validate request to a remote cluster's entry point.
///
/// Injected into the service so tests can wire two in-process planes
/// together without sockets.
#[async_trait]
pub trait ValidationClient: Send + Sync {
    async fn validate(
        &self,
        proxy_address: &str,
        request: &ValidateRequest,
    ) -> Result<ValidateResponse>;
}

/// Error body shape answered by the validation endpoint.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    code: String,
}

/// HTTPS implementation of [`ValidationClient`].
pub struct HttpValidationClient {
    api_version: String,
    insecure_dev_mode: bool,
    cipher_suites: Vec<String>,
    timeout: Duration,
}

impl HttpValidationClient {
    pub fn new(config: &TrustConfig) -> Self {
        Self {
            api_version: config.api_version.clone(),
            insecure_dev_mode: config.insecure_dev_mode,
            cipher_suites: config.cipher_suites.clone(),
            timeout: Duration::from_secs(30),
        }
    }

    fn build_client(&self) -> Result<reqwest::Client> {
        let builder = reqwest::Client::builder().timeout(self.timeout);

        let builder = if self.insecure_dev_mode {
            warn!(
                "Insecure development mode: TLS certificate verification is disabled for the \
                 validate request. Make sure you intend to run in insecure mode!"
            );
            builder.use_rustls_tls().danger_accept_invalid_certs(true)
        } else {
            builder.use_preconfigured_tls(client_tls_config(&self.cipher_suites)?)
        };

        builder
            .build()
            .map_err(|err| TrustError::Internal(format!("failed to build HTTP client: {err}")))
    }
}

#[async_trait]
impl ValidationClient for HttpValidationClient {
    async fn validate(
        &self,
        proxy_address: &str,
        request: &ValidateRequest,
    ) -> Result<ValidateResponse> {
        let url = format!(
            "https://{proxy_address}/{}/webapi/trustedclusters/validate",
            self.api_version
        );

        let client = self.build_client()?;
        let raw = request.to_raw()?;

        let response =
            client.post(&url).json(&raw).send().await.map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body: ErrorBody = response.json().await.unwrap_or_default();
            let message = if body.error.is_empty() {
                format!("validate request failed with status {status}")
            } else {
                body.error
            };
            return Err(match status.as_u16() {
                400 => TrustError::BadParameter(message),
                403 => TrustError::AccessDenied(message),
                404 => TrustError::NotFound(message),
                409 => TrustError::AlreadyExists(message),
                _ => TrustError::Internal(format!("{message} (code {})", body.code)),
            });
        }

        let raw: ValidateResponseRaw = response.json().await.map_err(|err| {
            TrustError::BadParameter(format!("failed to decode validate response: {err}"))
        })?;
        raw.to_native()
    }
}

/// TLS chain failures are tagged with the `x509` marker so the caller can
/// reshape them into the operator-facing PKI hint; everything else keeps
/// the transport message.
fn transport_error(err: reqwest::Error) -> TrustError {
    let chain = format!("{err:?}");
    if chain.contains("certificate") || chain.contains("Certificate") || chain.contains("Tls") {
        TrustError::Internal(format!("x509: {err}"))
    } else {
        TrustError::Internal(format!("validate request failed: {err}"))
    }
}

/// Client TLS configuration: platform roots plus the configured cipher-suite
/// allow list (empty keeps the provider defaults).
fn client_tls_config(cipher_suites: &[String]) -> Result<rustls::ClientConfig> {
    let mut roots = rustls::RootCertStore::empty();
    for cert in rustls_native_certs::load_native_certs().certs {
        // certificates the store cannot represent are skipped
        let _ = roots.add(cert);
    }

    let base = rustls::crypto::ring::default_provider();
    let suites = if cipher_suites.is_empty() {
        base.cipher_suites.clone()
    } else {
        base.cipher_suites
            .iter()
            .copied()
            .filter(|suite| {
                let name = format!("{:?}", suite.suite());
                cipher_suites.iter().any(|wanted| wanted.eq_ignore_ascii_case(&name))
            })
            .collect()
    };
    if suites.is_empty() {
        return Err(TrustError::BadParameter(
            "cipher suite configuration matches no supported suites".into(),
        ));
    }

    let provider = rustls::crypto::CryptoProvider { cipher_suites: suites, ..base };
    let config = rustls::ClientConfig::builder_with_provider(provider.into())
        .with_safe_default_protocol_versions()
        .map_err(|err| TrustError::Internal(format!("failed to build TLS configuration: {err}")))?
        .with_root_certificates(roots)
        .with_no_client_auth();

    Ok(config)
}
