//! Ensure loop
//!
//! Re-applies every known trusted-cluster descriptor: enabled descriptors
//! get their authorities activated (establishing trust if it never was),
//! disabled ones get them deactivated. One descriptor's failure never stops
//! the others; everything is collected into a single aggregate.

use federation_core::{Result, TrustError, TrustedCluster};

use crate::storage::{Presence, TunnelRegistry};

use super::FederationService;

impl FederationService {
    /// Ensures every supplied descriptor matches its desired state.
    ///
    /// With an empty slice the full set is loaded from presence. Callers
    /// passing a subset must pass descriptors freshly loaded from the
    /// backend; this is also where a rename discovered by a first handshake
    /// is committed (new record written, old record deleted).
    pub async fn ensure_trusted_clusters(&self, clusters: &[TrustedCluster]) -> Result<()> {
        let clusters = if clusters.is_empty() {
            self.presence.get_trusted_clusters().await?
        } else {
            clusters.to_vec()
        };

        let mut errors = Vec::new();
        for cluster in clusters {
            let old_name = cluster.name.clone();
            let mut cluster = cluster;
            let mut renamed = false;

            let result = if cluster.enabled {
                self.ensure_enabled(&mut cluster, &mut renamed).await
            } else {
                self.ensure_disabled(&cluster).await
            };
            if let Err(err) = result {
                errors.push(err);
            }
            if !renamed {
                continue;
            }
            // Commit the rename: store the descriptor under its new name
            // first, then delete the record under the old one.
            if let Err(err) = self.presence.upsert_trusted_cluster(cluster.clone()).await {
                errors.push(err);
                continue;
            }
            if let Err(err) = self.presence.delete_trusted_cluster(&old_name).await {
                errors.push(err);
                continue;
            }
        }

        TrustError::from_errors(errors)
    }

    /// Brings an enabled descriptor's state up: activates the authorities,
    /// establishing trust first if it never was. Sets `renamed` when the
    /// handshake reveals a different remote name than the descriptor
    /// carries.
    ///
    /// The ordering (activate, on not-found read, on not-found establish)
    /// is deliberate: a plain read after a failed activate distinguishes
    /// "authorities exist but nothing needed activation" from "trust was
    /// never established".
    async fn ensure_enabled(
        &self,
        cluster: &mut TrustedCluster,
        renamed: &mut bool,
    ) -> Result<()> {
        match self.activate_cert_authorities(cluster).await {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {
                match self.get_cert_authorities_for(cluster).await {
                    Ok(_) => {
                        // authorities are present after all; nothing to do
                    }
                    Err(err) if err.is_not_found() => {
                        // no authorities in any state: establish trust now
                        let (remote_name, remote_cas) = self.establish_trust(cluster).await?;
                        if remote_name != cluster.name {
                            cluster.name = remote_name;
                            *renamed = true;
                        }
                        self.add_cert_authorities(cluster, remote_cas).await?;
                    }
                    Err(err) => return Err(err),
                }
            }
            Err(err) => return Err(err),
        }

        self.create_reverse_tunnel(cluster).await
    }

    /// Brings a disabled descriptor's state down. Does not distinguish
    /// state that is already disabled from state that does not exist.
    async fn ensure_disabled(&self, cluster: &TrustedCluster) -> Result<()> {
        match self.deactivate_cert_authorities(cluster).await {
            Err(err) if !err.is_not_found() => return Err(err),
            _ => {}
        }
        match self.tunnels.delete_reverse_tunnel(&cluster.name).await {
            Err(err) if !err.is_not_found() => return Err(err),
            _ => {}
        }
        Ok(())
    }
}
