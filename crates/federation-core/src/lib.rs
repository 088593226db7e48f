//! Resource model for the cluster trust federation plane
//!
//! This crate holds everything the control plane shares with its peers and
//! its tests:
//!
//! - the coupled resources of a trust relationship: [`TrustedCluster`],
//!   [`CertAuthority`], [`RemoteCluster`] and [`ReverseTunnel`]
//! - the transport-independent error taxonomy ([`TrustError`])
//! - the validation RPC envelope and its raw/native translation ([`wire`])
//! - cluster identity certificates ([`identity`])

pub mod authority;
pub mod cluster;
pub mod encoding;
pub mod error;
pub mod identity;
pub mod types;
pub mod wire;

pub use authority::{CertAuthId, CertAuthType, CertAuthority, TlsKeyPair};
pub use cluster::{
    latest_tunnel_connection, RemoteCluster, ReverseTunnel, TrustedCluster, TunnelConnection,
};
pub use error::{Result, TrustError};
pub use types::{
    contains_expansion, grants_trusted_cluster, ConnectionStatus, RoleMapping, TokenCapability,
};
pub use wire::{ValidateRequest, ValidateRequestRaw, ValidateResponse, ValidateResponseRaw};
