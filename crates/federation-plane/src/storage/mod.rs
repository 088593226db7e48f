//! Storage facades consumed by the control plane
//!
//! The control plane never talks to a backend directly; it goes through the
//! traits below, which the surrounding system implements against its real
//! stores. The in-memory backend in [`memory`] implements all of them and
//! doubles as the development backend and test fixture.
//!
//! Every method returns the shared error taxonomy so callers can inspect
//! kinds (`not-found` tolerance is part of several contracts here).

pub mod memory;

pub use memory::MemoryBackend;

use async_trait::async_trait;

use federation_core::{
    CertAuthId, CertAuthType, CertAuthority, RemoteCluster, Result, ReverseTunnel, TokenCapability,
    TrustedCluster, TunnelConnection,
};

/// Persistence for trusted-cluster and remote-cluster descriptors.
#[async_trait]
pub trait Presence: Send + Sync {
    async fn get_trusted_cluster(&self, name: &str) -> Result<TrustedCluster>;
    async fn get_trusted_clusters(&self) -> Result<Vec<TrustedCluster>>;
    /// Returns the stored descriptor.
    async fn upsert_trusted_cluster(&self, cluster: TrustedCluster) -> Result<TrustedCluster>;
    async fn delete_trusted_cluster(&self, name: &str) -> Result<()>;

    async fn get_remote_cluster(&self, name: &str) -> Result<RemoteCluster>;
    async fn get_remote_clusters(&self) -> Result<Vec<RemoteCluster>>;
    /// Create-only; an existing record of the same name is `already-exists`.
    async fn create_remote_cluster(&self, cluster: RemoteCluster) -> Result<()>;
    async fn delete_remote_cluster(&self, name: &str) -> Result<()>;
}

/// Certificate-authority records keyed by `(type, domain_name)`.
#[async_trait]
pub trait CertAuthorities: Send + Sync {
    /// Create-only; a collision of any state is `already-exists`. This is
    /// the sole protection against a remote that reports our own name.
    async fn create_cert_authority(&self, ca: CertAuthority) -> Result<()>;
    async fn upsert_cert_authority(&self, ca: CertAuthority) -> Result<()>;
    /// `load_signing_keys` controls whether private key material is
    /// returned; everything else strips it.
    async fn get_cert_authority(&self, id: &CertAuthId, load_signing_keys: bool)
        -> Result<CertAuthority>;
    async fn get_cert_authorities(
        &self,
        auth_type: CertAuthType,
        load_signing_keys: bool,
    ) -> Result<Vec<CertAuthority>>;
    /// No-op when already active; `not-found` only when the record is
    /// absent entirely.
    async fn activate_cert_authority(&self, id: &CertAuthId) -> Result<()>;
    /// Mirror of activate.
    async fn deactivate_cert_authority(&self, id: &CertAuthId) -> Result<()>;
    async fn delete_cert_authority(&self, id: &CertAuthId) -> Result<()>;
}

/// Reverse-tunnel records plus the live connections the data plane reports.
#[async_trait]
pub trait TunnelRegistry: Send + Sync {
    async fn upsert_reverse_tunnel(&self, tunnel: ReverseTunnel) -> Result<()>;
    async fn get_reverse_tunnel(&self, name: &str) -> Result<ReverseTunnel>;
    async fn delete_reverse_tunnel(&self, name: &str) -> Result<()>;

    async fn get_tunnel_connections(&self, cluster_name: &str) -> Result<Vec<TunnelConnection>>;
    async fn upsert_tunnel_connection(&self, connection: TunnelConnection) -> Result<()>;
}

/// A locally defined role; only existence matters to the control plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub name: String,
}

/// Cluster-local role definitions, consulted when validating role maps.
#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn get_role(&self, name: &str) -> Result<Role>;
}

/// Provisioning-token records.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    /// Resolves a bearer token to the capabilities its record carries.
    async fn validate_token(&self, token: &str) -> Result<Vec<TokenCapability>>;
}
