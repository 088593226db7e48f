//! Trusted-cluster and remote-cluster descriptors
//!
//! `TrustedCluster` is the administrator-owned record of an outbound trust
//! relationship. `RemoteCluster` is its counterpart on the responder side,
//! created when a peer first authenticates. `ReverseTunnel` records where the
//! remote dials back; the data plane lives elsewhere.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrustError};
use crate::types::{ConnectionStatus, RoleMapping};

/// Administrator-owned descriptor of an outbound trust relationship.
///
/// The name is mutable until the first handshake, after which it is pinned
/// to the remote cluster's self-declared name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustedCluster {
    pub name: String,
    pub enabled: bool,
    /// Secret presented once to the remote side during the handshake.
    pub token: String,
    /// HTTPS host:port of the remote cluster's entry point.
    pub proxy_address: String,
    /// host:port the remote cluster dials back to.
    pub reverse_tunnel_address: String,
    /// Local roles granted to the remote host authority.
    pub roles: Vec<String>,
    /// Ordered mapping applied to the remote user authority.
    pub role_map: Vec<RoleMapping>,
}

impl TrustedCluster {
    /// Checks that `other` is a permitted update of this descriptor.
    ///
    /// Only the enabled flag may change once trust is established; the
    /// fields that identify the relationship are immutable.
    pub fn can_change_state_to(&self, other: &TrustedCluster) -> Result<()> {
        let immutable = |field: &str| {
            Err(TrustError::InvalidTransition(format!(
                "can not update {field} for existing trusted cluster"
            )))
        };
        if self.token != other.token {
            return immutable("token");
        }
        if self.proxy_address != other.proxy_address {
            return immutable("proxy_address");
        }
        if self.reverse_tunnel_address != other.reverse_tunnel_address {
            return immutable("reverse_tunnel_address");
        }
        if self.roles != other.roles {
            return immutable("roles");
        }
        if self.role_map != other.role_map {
            return immutable("role_map");
        }
        Ok(())
    }
}

/// Responder-side record of an inbound relationship.
///
/// `connection_status` and `last_heartbeat` are recomputed from tunnel
/// connections on every read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteCluster {
    pub name: String,
    pub connection_status: ConnectionStatus,
    pub last_heartbeat: Option<DateTime<Utc>>,
}

impl RemoteCluster {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(TrustError::BadParameter("missing remote cluster name".into()));
        }
        Ok(Self { name, connection_status: ConnectionStatus::Offline, last_heartbeat: None })
    }
}

/// Control-plane record describing where a remote cluster dials back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReverseTunnel {
    pub name: String,
    pub dial_addrs: Vec<String>,
}

impl ReverseTunnel {
    pub fn new(name: impl Into<String>, dial_addrs: Vec<String>) -> Self {
        Self { name: name.into(), dial_addrs }
    }
}

/// A live reverse-tunnel connection reported by the tunnel data plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TunnelConnection {
    pub cluster_name: String,
    pub proxy_name: String,
    pub last_heartbeat: DateTime<Utc>,
}

/// The connection with the most recent heartbeat, if any.
pub fn latest_tunnel_connection(connections: &[TunnelConnection]) -> Option<&TunnelConnection> {
    connections.iter().max_by_key(|c| c.last_heartbeat)
}
