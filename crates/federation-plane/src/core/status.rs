//! Remote-cluster status prober
//!
//! `connection_status` and `last_heartbeat` are derived from the live
//! reverse-tunnel connections on every read; nothing is persisted. A remote
//! is offline when its freshest heartbeat is older than
//! `keep_alive_count_max x keep_alive_interval`.

use chrono::{DateTime, Duration, Utc};

use federation_core::{
    latest_tunnel_connection, ConnectionStatus, RemoteCluster, Result, TunnelConnection,
};

use crate::clock::Clock;
use crate::storage::{Presence, TunnelRegistry};

use super::FederationService;

impl FederationService {
    /// A remote cluster with freshly derived status.
    pub async fn get_remote_cluster(&self, name: &str) -> Result<RemoteCluster> {
        let mut cluster = self.presence.get_remote_cluster(name).await?;
        self.update_remote_cluster_status(&mut cluster).await?;
        Ok(cluster)
    }

    /// All remote clusters, each with freshly derived status.
    pub async fn get_remote_clusters(&self) -> Result<Vec<RemoteCluster>> {
        let mut clusters = self.presence.get_remote_clusters().await?;
        for cluster in &mut clusters {
            self.update_remote_cluster_status(cluster).await?;
        }
        Ok(clusters)
    }

    async fn update_remote_cluster_status(&self, cluster: &mut RemoteCluster) -> Result<()> {
        let offline_threshold =
            Duration::from_std(self.config.offline_threshold()).unwrap_or(Duration::MAX);

        let connections = self.tunnels.get_tunnel_connections(&cluster.name).await?;

        cluster.connection_status = ConnectionStatus::Offline;
        if let Some(latest) = latest_tunnel_connection(&connections) {
            cluster.connection_status =
                tunnel_connection_status(self.clock.now(), latest, offline_threshold);
            cluster.last_heartbeat = Some(latest.last_heartbeat);
        }

        Ok(())
    }
}

/// Status of a single connection against the offline threshold.
pub fn tunnel_connection_status(
    now: DateTime<Utc>,
    connection: &TunnelConnection,
    offline_threshold: Duration,
) -> ConnectionStatus {
    if now.signed_duration_since(connection.last_heartbeat) < offline_threshold {
        ConnectionStatus::Online
    } else {
        ConnectionStatus::Offline
    }
}
