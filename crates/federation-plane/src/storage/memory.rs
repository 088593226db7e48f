//! In-memory storage backend
//!
//! Default backend for development and single-instance deployments, and the
//! fixture the integration tests run against. Data is lost on restart.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::info;

use federation_core::{
    CertAuthId, CertAuthType, CertAuthority, RemoteCluster, Result, ReverseTunnel, TokenCapability,
    TrustError, TrustedCluster, TunnelConnection,
};

use super::{CertAuthorities, Presence, Role, RoleStore, TokenValidator, TunnelRegistry};

/// In-memory implementation of every storage facade.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    trusted_clusters: RwLock<HashMap<String, TrustedCluster>>,
    remote_clusters: RwLock<HashMap<String, RemoteCluster>>,
    authorities: RwLock<HashMap<CertAuthId, CertAuthority>>,
    tunnels: RwLock<HashMap<String, ReverseTunnel>>,
    tunnel_connections: RwLock<HashMap<String, Vec<TunnelConnection>>>,
    roles: RwLock<HashMap<String, Role>>,
    tokens: RwLock<HashMap<String, Vec<TokenCapability>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a local role definition.
    pub fn add_role(&self, name: impl Into<String>) {
        let name = name.into();
        self.roles.write().unwrap().insert(name.clone(), Role { name });
    }

    /// Seed a provisioning token with its capabilities.
    pub fn add_token(&self, token: impl Into<String>, capabilities: Vec<TokenCapability>) {
        self.tokens.write().unwrap().insert(token.into(), capabilities);
    }
}

#[async_trait]
impl Presence for MemoryBackend {
    async fn get_trusted_cluster(&self, name: &str) -> Result<TrustedCluster> {
        self.trusted_clusters
            .read()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| TrustError::NotFound(format!("trusted cluster {name:?} not found")))
    }

    async fn get_trusted_clusters(&self) -> Result<Vec<TrustedCluster>> {
        Ok(self.trusted_clusters.read().unwrap().values().cloned().collect())
    }

    async fn upsert_trusted_cluster(&self, cluster: TrustedCluster) -> Result<TrustedCluster> {
        let mut clusters = self.trusted_clusters.write().unwrap();
        info!(cluster = %cluster.name, enabled = cluster.enabled, "Upserting trusted cluster");
        clusters.insert(cluster.name.clone(), cluster.clone());
        Ok(cluster)
    }

    async fn delete_trusted_cluster(&self, name: &str) -> Result<()> {
        let mut clusters = self.trusted_clusters.write().unwrap();
        if clusters.remove(name).is_none() {
            return Err(TrustError::NotFound(format!("trusted cluster {name:?} not found")));
        }
        info!(cluster = %name, "Deleted trusted cluster");
        Ok(())
    }

    async fn get_remote_cluster(&self, name: &str) -> Result<RemoteCluster> {
        self.remote_clusters
            .read()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| TrustError::NotFound(format!("remote cluster {name:?} not found")))
    }

    async fn get_remote_clusters(&self) -> Result<Vec<RemoteCluster>> {
        Ok(self.remote_clusters.read().unwrap().values().cloned().collect())
    }

    async fn create_remote_cluster(&self, cluster: RemoteCluster) -> Result<()> {
        let mut clusters = self.remote_clusters.write().unwrap();
        if clusters.contains_key(&cluster.name) {
            return Err(TrustError::AlreadyExists(format!(
                "remote cluster {:?} already exists",
                cluster.name
            )));
        }
        info!(cluster = %cluster.name, "Created remote cluster");
        clusters.insert(cluster.name.clone(), cluster);
        Ok(())
    }

    async fn delete_remote_cluster(&self, name: &str) -> Result<()> {
        let mut clusters = self.remote_clusters.write().unwrap();
        if clusters.remove(name).is_none() {
            return Err(TrustError::NotFound(format!("remote cluster {name:?} not found")));
        }
        info!(cluster = %name, "Deleted remote cluster");
        Ok(())
    }
}

#[async_trait]
impl CertAuthorities for MemoryBackend {
    async fn create_cert_authority(&self, ca: CertAuthority) -> Result<()> {
        let mut authorities = self.authorities.write().unwrap();
        let id = ca.id();
        if authorities.contains_key(&id) {
            return Err(TrustError::AlreadyExists(format!(
                "certificate authority {id} already exists"
            )));
        }
        info!(id = %id, cluster = %ca.cluster_name, "Created certificate authority");
        authorities.insert(id, ca);
        Ok(())
    }

    async fn upsert_cert_authority(&self, ca: CertAuthority) -> Result<()> {
        let mut authorities = self.authorities.write().unwrap();
        authorities.insert(ca.id(), ca);
        Ok(())
    }

    async fn get_cert_authority(
        &self,
        id: &CertAuthId,
        load_signing_keys: bool,
    ) -> Result<CertAuthority> {
        let authorities = self.authorities.read().unwrap();
        let ca = authorities
            .get(id)
            .ok_or_else(|| TrustError::NotFound(format!("certificate authority {id} not found")))?;
        Ok(if load_signing_keys { ca.clone() } else { ca.without_signing_keys() })
    }

    async fn get_cert_authorities(
        &self,
        auth_type: CertAuthType,
        load_signing_keys: bool,
    ) -> Result<Vec<CertAuthority>> {
        let authorities = self.authorities.read().unwrap();
        Ok(authorities
            .values()
            .filter(|ca| ca.auth_type == auth_type)
            .map(|ca| if load_signing_keys { ca.clone() } else { ca.without_signing_keys() })
            .collect())
    }

    async fn activate_cert_authority(&self, id: &CertAuthId) -> Result<()> {
        let mut authorities = self.authorities.write().unwrap();
        let ca = authorities
            .get_mut(id)
            .ok_or_else(|| TrustError::NotFound(format!("certificate authority {id} not found")))?;
        ca.active = true;
        Ok(())
    }

    async fn deactivate_cert_authority(&self, id: &CertAuthId) -> Result<()> {
        let mut authorities = self.authorities.write().unwrap();
        let ca = authorities
            .get_mut(id)
            .ok_or_else(|| TrustError::NotFound(format!("certificate authority {id} not found")))?;
        ca.active = false;
        Ok(())
    }

    async fn delete_cert_authority(&self, id: &CertAuthId) -> Result<()> {
        let mut authorities = self.authorities.write().unwrap();
        if authorities.remove(id).is_none() {
            return Err(TrustError::NotFound(format!("certificate authority {id} not found")));
        }
        info!(id = %id, "Deleted certificate authority");
        Ok(())
    }
}

#[async_trait]
impl TunnelRegistry for MemoryBackend {
    async fn upsert_reverse_tunnel(&self, tunnel: ReverseTunnel) -> Result<()> {
        let mut tunnels = self.tunnels.write().unwrap();
        info!(tunnel = %tunnel.name, "Upserting reverse tunnel");
        tunnels.insert(tunnel.name.clone(), tunnel);
        Ok(())
    }

    async fn get_reverse_tunnel(&self, name: &str) -> Result<ReverseTunnel> {
        self.tunnels
            .read()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| TrustError::NotFound(format!("reverse tunnel {name:?} not found")))
    }

    async fn delete_reverse_tunnel(&self, name: &str) -> Result<()> {
        let mut tunnels = self.tunnels.write().unwrap();
        if tunnels.remove(name).is_none() {
            return Err(TrustError::NotFound(format!("reverse tunnel {name:?} not found")));
        }
        info!(tunnel = %name, "Deleted reverse tunnel");
        Ok(())
    }

    async fn get_tunnel_connections(&self, cluster_name: &str) -> Result<Vec<TunnelConnection>> {
        let connections = self.tunnel_connections.read().unwrap();
        Ok(connections.get(cluster_name).cloned().unwrap_or_default())
    }

    async fn upsert_tunnel_connection(&self, connection: TunnelConnection) -> Result<()> {
        let mut connections = self.tunnel_connections.write().unwrap();
        let entry = connections.entry(connection.cluster_name.clone()).or_default();
        match entry.iter_mut().find(|c| c.proxy_name == connection.proxy_name) {
            Some(existing) => *existing = connection,
            None => entry.push(connection),
        }
        Ok(())
    }
}

#[async_trait]
impl RoleStore for MemoryBackend {
    async fn get_role(&self, name: &str) -> Result<Role> {
        self.roles
            .read()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| TrustError::NotFound(format!("role {name:?} not found")))
    }
}

#[async_trait]
impl TokenValidator for MemoryBackend {
    async fn validate_token(&self, token: &str) -> Result<Vec<TokenCapability>> {
        self.tokens
            .read()
            .unwrap()
            .get(token)
            .cloned()
            .ok_or_else(|| TrustError::AccessDenied("token not recognized".into()))
    }
}
