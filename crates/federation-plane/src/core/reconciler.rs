//! Trust reconciler
//!
//! Applies an administrator's desired [`TrustedCluster`] descriptor to the
//! coupled resources (certificate authorities, reverse tunnel, presence
//! record). The operation is a state machine over `(exists, enabled)`; every
//! arm either fully succeeds or the call fails and the periodic ensure pass
//! converges whatever partial progress was made.

use tracing::debug;

use federation_core::{
    contains_expansion, CertAuthId, CertAuthType, CertAuthority, Result, ReverseTunnel,
    RoleMapping, TrustError, TrustedCluster,
};

use crate::audit::AuditEventKind;
use crate::storage::{CertAuthorities, Presence, RoleStore, TunnelRegistry};

use super::FederationService;

/// Operator-facing message for descriptors whose authority records predate
/// the activation scheme.
pub(crate) const VERSION_GAP: &str =
    "enable only supported for Trusted Clusters created with version 2.3 and above";

fn map_version_gap(err: TrustError) -> TrustError {
    if err.is_not_found() {
        TrustError::BadParameter(VERSION_GAP.into())
    } else {
        err
    }
}

impl FederationService {
    /// Creates or toggles a trusted-cluster relationship.
    ///
    /// Returns the stored descriptor, whose name may differ from the
    /// submitted one: the first successful handshake pins it to the remote
    /// cluster's self-declared name.
    pub async fn upsert_trusted_cluster(
        &self,
        user: &str,
        mut cluster: TrustedCluster,
    ) -> Result<TrustedCluster> {
        // The submitted name is advisory until the handshake pins it, so
        // it is commonly omitted; only probe for an existing record when
        // one was given.
        let mut existing = None;
        if !cluster.name.is_empty() {
            match self.presence.get_trusted_cluster(&cluster.name).await {
                Ok(found) => existing = Some(found),
                Err(err) if err.is_not_found() => {}
                Err(err) => return Err(err),
            }
        }

        let enable = cluster.enabled;

        if let Some(existing) = &existing {
            existing.can_change_state_to(&cluster)?;
        }

        match (existing.is_some(), enable) {
            (true, true) => {
                debug!(cluster = %cluster.name, "Enabling existing trusted cluster relationship");
                self.activate_cert_authorities(&cluster).await.map_err(map_version_gap)?;
                self.create_reverse_tunnel(&cluster).await?;
            }
            (true, false) => {
                debug!(cluster = %cluster.name, "Disabling existing trusted cluster relationship");
                self.deactivate_cert_authorities(&cluster).await.map_err(map_version_gap)?;
                match self.tunnels.delete_reverse_tunnel(&cluster.name).await {
                    Err(err) if !err.is_not_found() => return Err(err),
                    _ => {}
                }
            }
            (false, true) => {
                debug!(cluster = %cluster.name, "Creating enabled trusted cluster relationship");
                self.check_local_roles(&cluster.role_map).await?;
                let (remote_name, remote_cas) = self.establish_trust(&cluster).await?;
                // Pin the descriptor to the remote cluster's self-declared
                // name before anything is written under it.
                cluster.name = remote_name;
                self.add_cert_authorities(&cluster, remote_cas).await?;
                self.create_reverse_tunnel(&cluster).await?;
            }
            (false, false) => {
                debug!(cluster = %cluster.name, "Creating disabled trusted cluster relationship");
                self.check_local_roles(&cluster.role_map).await?;
                let (remote_name, remote_cas) = self.establish_trust(&cluster).await?;
                cluster.name = remote_name;
                self.add_cert_authorities(&cluster, remote_cas).await?;
                self.deactivate_cert_authorities(&cluster).await?;
            }
        }

        let stored = self.presence.upsert_trusted_cluster(cluster).await?;
        self.emit_audit(AuditEventKind::TrustedClusterCreate, user).await;
        Ok(stored)
    }

    /// Removes the authorities, the reverse tunnel and the descriptor of a
    /// trusted cluster.
    pub async fn delete_trusted_cluster(&self, user: &str, name: &str) -> Result<()> {
        // Refuse deleting the record that would name this cluster itself.
        if self.config.cluster_name == name {
            return Err(TrustError::BadParameter(format!(
                "trusted cluster {name:?} is the name of this root cluster and cannot be removed"
            )));
        }

        for auth_type in [CertAuthType::Host, CertAuthType::User] {
            match self
                .authorities
                .delete_cert_authority(&CertAuthId::new(auth_type, name))
                .await
            {
                Err(err) if !err.is_not_found() => return Err(err),
                _ => {}
            }
        }

        match self.tunnels.delete_reverse_tunnel(name).await {
            Err(err) if !err.is_not_found() => return Err(err),
            _ => {}
        }

        self.presence.delete_trusted_cluster(name).await?;
        self.emit_audit(AuditEventKind::TrustedClusterDelete, user).await;
        Ok(())
    }

    /// Removes a remote-cluster record and the authorities associated with
    /// it.
    pub async fn delete_remote_cluster(&self, name: &str) -> Result<()> {
        // Reading the record first guards against arbitrary names, e.g. a
        // request that targets the local cluster.
        self.presence.get_remote_cluster(name).await?;

        for auth_type in [CertAuthType::Host, CertAuthType::User] {
            match self
                .authorities
                .delete_cert_authority(&CertAuthId::new(auth_type, name))
                .await
            {
                Err(err) if !err.is_not_found() => return Err(err),
                _ => {}
            }
        }

        self.presence.delete_remote_cluster(name).await
    }

    /// Asserts that every literal local role referenced by the map exists.
    pub(crate) async fn check_local_roles(&self, role_map: &[RoleMapping]) -> Result<()> {
        for mapping in role_map {
            for local_role in &mapping.local {
                if contains_expansion(local_role) {
                    // dynamic mapping; the local role is resolved at login
                    continue;
                }
                match self.roles.get_role(local_role).await {
                    Ok(_) => {}
                    Err(err) if err.is_not_found() => {
                        return Err(TrustError::NotFound(format!(
                            "a role {local_role:?} referenced in a mapping {}:{:?} is not defined",
                            mapping.remote, mapping.local
                        )));
                    }
                    Err(err) => return Err(err),
                }
            }
        }
        Ok(())
    }

    /// Imports the authorities returned by the handshake under the pinned
    /// descriptor name.
    ///
    /// Insertion is create-only: a collision (typically this cluster's own
    /// authority, when a hostile remote reports our name) aborts the
    /// enrollment with `already-exists`.
    pub(crate) async fn add_cert_authorities(
        &self,
        cluster: &TrustedCluster,
        remote_cas: Vec<CertAuthority>,
    ) -> Result<()> {
        for mut ca in remote_cas {
            ca.set_name(&cluster.name);
            // role fields asserted by the remote are discarded; the user
            // authority gets the descriptor's grants instead
            ca.roles = Vec::new();
            ca.role_map = Vec::new();
            if ca.auth_type == CertAuthType::User {
                ca.roles = cluster.roles.clone();
                ca.role_map = cluster.role_map.clone();
            }
            self.authorities.create_cert_authority(ca).await?;
        }
        Ok(())
    }

    /// Activates both authorities of a trusted cluster.
    ///
    /// The two updates are not atomic; a crash between them leaves the pair
    /// split. The store-level activate is a no-op when already active, so
    /// the next ensure pass converges the pair safely.
    pub(crate) async fn activate_cert_authorities(&self, cluster: &TrustedCluster) -> Result<()> {
        self.authorities
            .activate_cert_authority(&CertAuthId::new(CertAuthType::User, &cluster.name))
            .await?;
        self.authorities
            .activate_cert_authority(&CertAuthId::new(CertAuthType::Host, &cluster.name))
            .await
    }

    /// Mirror of [`Self::activate_cert_authorities`].
    pub(crate) async fn deactivate_cert_authorities(&self, cluster: &TrustedCluster) -> Result<()> {
        self.authorities
            .deactivate_cert_authority(&CertAuthId::new(CertAuthType::User, &cluster.name))
            .await?;
        self.authorities
            .deactivate_cert_authority(&CertAuthId::new(CertAuthType::Host, &cluster.name))
            .await
    }

    /// Loads the user and host authorities associated with a trusted
    /// cluster, whatever their activation state.
    pub(crate) async fn get_cert_authorities_for(
        &self,
        cluster: &TrustedCluster,
    ) -> Result<Vec<CertAuthority>> {
        let user = self
            .authorities
            .get_cert_authority(&CertAuthId::new(CertAuthType::User, &cluster.name), false)
            .await?;
        let host = self
            .authorities
            .get_cert_authority(&CertAuthId::new(CertAuthType::Host, &cluster.name), false)
            .await?;
        Ok(vec![user, host])
    }

    pub(crate) async fn create_reverse_tunnel(&self, cluster: &TrustedCluster) -> Result<()> {
        let tunnel =
            ReverseTunnel::new(&cluster.name, vec![cluster.reverse_tunnel_address.clone()]);
        self.tunnels.upsert_reverse_tunnel(tunnel).await
    }
}
