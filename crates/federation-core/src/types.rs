//! Shared resource vocabulary
//!
//! Small types used by both the certificate-authority model and the
//! trusted-cluster descriptors.

use serde::{Deserialize, Serialize};

/// One entry of an ordered role map: a role name asserted by the remote
/// cluster and the local roles it maps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMapping {
    pub remote: String,
    pub local: Vec<String>,
}

impl RoleMapping {
    pub fn new(remote: impl Into<String>, local: Vec<String>) -> Self {
        Self { remote: remote.into(), local }
    }
}

/// Returns true when a role name is a template expansion (e.g.
/// `{{external.groups}}`) rather than a literal local role. Expansions are
/// resolved at login time, so they are exempt from existence checks.
pub fn contains_expansion(role: &str) -> bool {
    role.contains("{{") && role.contains("}}")
}

/// Capabilities carried by a provisioning token record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenCapability {
    TrustedCluster,
    /// Pre-rename spelling still present in older token records.
    #[serde(rename = "trustedcluster")]
    LegacyTrustedCluster,
    Node,
    Proxy,
}

/// Whether a trusted-cluster token grants the federation handshake.
pub fn grants_trusted_cluster(capabilities: &[TokenCapability]) -> bool {
    capabilities.contains(&TokenCapability::TrustedCluster)
        || capabilities.contains(&TokenCapability::LegacyTrustedCluster)
}

/// Health of an inbound cluster relationship, derived from reverse-tunnel
/// heartbeats. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Online,
    #[default]
    Offline,
}
