//! Shared fixtures for the integration tests
//!
//! A [`Plane`] is a full in-process control plane over the memory backend.
//! Tests wire a root and a leaf together with [`Loopback`], which carries
//! the handshake through the raw wire envelope exactly like the HTTP path,
//! minus the sockets.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use federation_core::{
    identity, CertAuthType, CertAuthority, Result, RoleMapping, TrustError, TrustedCluster,
    ValidateRequest, ValidateResponse,
};
use federation_plane::storage::CertAuthorities;
use federation_plane::{
    FederationDeps, FederationService, ManualClock, MemoryBackend, RecordingAudit, TrustConfig,
    ValidationClient,
};

/// A control plane plus handles onto its collaborators.
pub struct Plane {
    pub service: Arc<FederationService>,
    pub backend: Arc<MemoryBackend>,
    pub audit: Arc<RecordingAudit>,
    pub clock: Arc<ManualClock>,
}

/// Build a plane named `cluster_name` with seeded local authorities, an
/// `admin` role and the given outbound validation client.
pub async fn plane(cluster_name: &str, validation: Arc<dyn ValidationClient>) -> Plane {
    let backend = Arc::new(MemoryBackend::new());
    let audit = Arc::new(RecordingAudit::new());
    let clock = Arc::new(ManualClock::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap()));

    for auth_type in [CertAuthType::Host, CertAuthType::User] {
        let key_pair = identity::generate_identity(cluster_name).unwrap();
        let ca = CertAuthority::new(auth_type, cluster_name, vec![key_pair]);
        backend.create_cert_authority(ca).await.unwrap();
    }
    backend.add_role("admin");

    let config = TrustConfig { cluster_name: cluster_name.into(), ..TrustConfig::default() };
    let service = Arc::new(FederationService::new(
        config,
        FederationDeps {
            presence: backend.clone(),
            authorities: backend.clone(),
            tunnels: backend.clone(),
            roles: backend.clone(),
            tokens: backend.clone(),
            audit: audit.clone(),
            clock: clock.clone(),
            validation,
        },
    ));

    Plane { service, backend, audit, clock }
}

/// Outbound client wired straight to a peer plane, round-tripping both
/// messages through their raw wire forms.
pub struct Loopback {
    pub peer: Arc<FederationService>,
    pub calls: AtomicUsize,
}

impl Loopback {
    pub fn new(peer: Arc<FederationService>) -> Self {
        Self { peer, calls: AtomicUsize::new(0) }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ValidationClient for Loopback {
    async fn validate(
        &self,
        _proxy_address: &str,
        request: &ValidateRequest,
    ) -> Result<ValidateResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let request = request.to_raw()?.to_native()?;
        let response = self.peer.validate_trusted_cluster(&request).await?;
        response.to_raw()?.to_native()
    }
}

/// Outbound client for planes that never initiate a handshake.
pub struct NoOutbound;

#[async_trait]
impl ValidationClient for NoOutbound {
    async fn validate(
        &self,
        _proxy_address: &str,
        _request: &ValidateRequest,
    ) -> Result<ValidateResponse> {
        Err(TrustError::Internal("no outbound validation client configured".into()))
    }
}

/// A descriptor targeting the standard test leaf.
pub fn descriptor(name: &str, token: &str, enabled: bool) -> TrustedCluster {
    TrustedCluster {
        name: name.into(),
        enabled,
        token: token.into(),
        proxy_address: "leaf.example.com:443".into(),
        reverse_tunnel_address: "leaf.example.com:3024".into(),
        roles: vec!["admin".into()],
        role_map: vec![RoleMapping::new("remote-admin", vec!["admin".into()])],
    }
}
