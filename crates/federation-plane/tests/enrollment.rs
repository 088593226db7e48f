//! Enrollment integration tests
//!
//! Drives a root and a leaf plane through the trusted-cluster lifecycle:
//! first handshake with rename pinning, enable/disable toggling, token
//! refusals, identity-collision defenses and deletion.

mod common;

use std::sync::Arc;

use async_trait::async_trait;

use common::{descriptor, plane, Loopback, NoOutbound};
use federation_core::{
    identity, CertAuthId, CertAuthType, CertAuthority, Result, TokenCapability, TrustError,
    ValidateRequest, ValidateResponse,
};
use federation_plane::storage::{CertAuthorities, Presence, TunnelRegistry};
use federation_plane::{AuditEventKind, ValidationClient};

const HOST: CertAuthType = CertAuthType::Host;
const USER: CertAuthType = CertAuthType::User;

// =============================================================================
// First Enrollment
// =============================================================================

#[tokio::test]
async fn test_first_enrollment_pins_remote_name() {
    let leaf = plane("leaf-east", Arc::new(NoOutbound)).await;
    leaf.backend.add_token("tok", vec![TokenCapability::TrustedCluster]);
    let root = plane("root", Arc::new(Loopback::new(leaf.service.clone()))).await;

    let stored = root
        .service
        .upsert_trusted_cluster("admin@root", descriptor("temp", "tok", true))
        .await
        .unwrap();

    // descriptor is pinned to the leaf's self-declared name
    assert_eq!(stored.name, "leaf-east");
    assert!(root.backend.get_trusted_cluster("leaf-east").await.is_ok());
    assert!(root.backend.get_trusted_cluster("temp").await.unwrap_err().is_not_found());

    // both authorities imported active under the pinned name
    for auth_type in [HOST, USER] {
        let ca = root
            .backend
            .get_cert_authority(&CertAuthId::new(auth_type, "leaf-east"), false)
            .await
            .unwrap();
        assert!(ca.active);
        assert_eq!(ca.cluster_name, "leaf-east");
        assert_ne!(ca.cluster_name, "root");
    }

    // remote role assertions were discarded; the user authority carries the
    // descriptor's grants
    let user_ca = root
        .backend
        .get_cert_authority(&CertAuthId::new(USER, "leaf-east"), false)
        .await
        .unwrap();
    assert_eq!(user_ca.roles, vec!["admin".to_string()]);
    assert_eq!(user_ca.role_map, stored.role_map);
    let host_ca = root
        .backend
        .get_cert_authority(&CertAuthId::new(HOST, "leaf-east"), false)
        .await
        .unwrap();
    assert!(host_ca.roles.is_empty());
    assert!(host_ca.role_map.is_empty());

    // reverse tunnel points at the descriptor's dial-back address
    let tunnel = root.backend.get_reverse_tunnel("leaf-east").await.unwrap();
    assert_eq!(tunnel.dial_addrs, vec!["leaf.example.com:3024".to_string()]);

    assert_eq!(root.audit.count(AuditEventKind::TrustedClusterCreate), 1);

    // the leaf recorded the inbound relationship and the root's identity
    assert!(leaf.backend.get_remote_cluster("root").await.is_ok());
    let inbound = leaf
        .backend
        .get_cert_authority(&CertAuthId::new(HOST, "root"), false)
        .await
        .unwrap();
    assert_eq!(inbound.cluster_name, "root");
}

#[tokio::test]
async fn test_disabled_enrollment_imports_inactive() {
    let leaf = plane("leaf-east", Arc::new(NoOutbound)).await;
    leaf.backend.add_token("tok", vec![TokenCapability::TrustedCluster]);
    let root = plane("root", Arc::new(Loopback::new(leaf.service.clone()))).await;

    root.service
        .upsert_trusted_cluster("admin@root", descriptor("", "tok", false))
        .await
        .unwrap();

    for auth_type in [HOST, USER] {
        let ca = root
            .backend
            .get_cert_authority(&CertAuthId::new(auth_type, "leaf-east"), false)
            .await
            .unwrap();
        assert!(!ca.active);
    }
    assert!(root.backend.get_reverse_tunnel("leaf-east").await.unwrap_err().is_not_found());
}

// =============================================================================
// Toggling
// =============================================================================

#[tokio::test]
async fn test_toggle_disable_then_enable_without_rehandshake() {
    let leaf = plane("leaf-east", Arc::new(NoOutbound)).await;
    leaf.backend.add_token("tok", vec![TokenCapability::TrustedCluster]);
    let loopback = Arc::new(Loopback::new(leaf.service.clone()));
    let root = plane("root", loopback.clone()).await;

    root.service
        .upsert_trusted_cluster("admin@root", descriptor("temp", "tok", true))
        .await
        .unwrap();
    assert_eq!(loopback.call_count(), 1);

    // disable: both authorities inactive, tunnel removed
    root.service
        .upsert_trusted_cluster("admin@root", descriptor("leaf-east", "tok", false))
        .await
        .unwrap();
    for auth_type in [HOST, USER] {
        let ca = root
            .backend
            .get_cert_authority(&CertAuthId::new(auth_type, "leaf-east"), false)
            .await
            .unwrap();
        assert!(!ca.active);
    }
    assert!(root.backend.get_reverse_tunnel("leaf-east").await.unwrap_err().is_not_found());

    // enable: both active again, tunnel present
    root.service
        .upsert_trusted_cluster("admin@root", descriptor("leaf-east", "tok", true))
        .await
        .unwrap();
    for auth_type in [HOST, USER] {
        let ca = root
            .backend
            .get_cert_authority(&CertAuthId::new(auth_type, "leaf-east"), false)
            .await
            .unwrap();
        assert!(ca.active);
    }
    assert!(root.backend.get_reverse_tunnel("leaf-east").await.is_ok());

    // no second handshake happened
    assert_eq!(loopback.call_count(), 1);
}

#[tokio::test]
async fn test_reapply_is_idempotent() {
    let leaf = plane("leaf-east", Arc::new(NoOutbound)).await;
    leaf.backend.add_token("tok", vec![TokenCapability::TrustedCluster]);
    let root = plane("root", Arc::new(Loopback::new(leaf.service.clone()))).await;

    let first = root
        .service
        .upsert_trusted_cluster("admin@root", descriptor("temp", "tok", true))
        .await
        .unwrap();
    let second = root
        .service
        .upsert_trusted_cluster("admin@root", descriptor("leaf-east", "tok", true))
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(root.backend.get_trusted_clusters().await.unwrap().len(), 1);
    for auth_type in [HOST, USER] {
        let ca = root
            .backend
            .get_cert_authority(&CertAuthId::new(auth_type, "leaf-east"), false)
            .await
            .unwrap();
        assert!(ca.active);
    }
    assert!(root.backend.get_reverse_tunnel("leaf-east").await.is_ok());

    // twice-applied disabled descriptors converge the same way
    root.service
        .upsert_trusted_cluster("admin@root", descriptor("leaf-east", "tok", false))
        .await
        .unwrap();
    root.service
        .upsert_trusted_cluster("admin@root", descriptor("leaf-east", "tok", false))
        .await
        .unwrap();
    assert!(root.backend.get_reverse_tunnel("leaf-east").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_identifying_field_change_is_invalid_transition() {
    let leaf = plane("leaf-east", Arc::new(NoOutbound)).await;
    leaf.backend.add_token("tok", vec![TokenCapability::TrustedCluster]);
    let root = plane("root", Arc::new(Loopback::new(leaf.service.clone()))).await;

    root.service
        .upsert_trusted_cluster("admin@root", descriptor("temp", "tok", true))
        .await
        .unwrap();

    let mut changed = descriptor("leaf-east", "tok", true);
    changed.proxy_address = "elsewhere.example.com:443".into();
    let err =
        root.service.upsert_trusted_cluster("admin@root", changed).await.unwrap_err();
    assert!(matches!(err, TrustError::InvalidTransition(_)));
}

// =============================================================================
// Token Refusals
// =============================================================================

#[tokio::test]
async fn test_unknown_token_is_access_denied_and_mutates_nothing() {
    let leaf = plane("leaf-east", Arc::new(NoOutbound)).await;
    leaf.backend.add_token("tok", vec![TokenCapability::TrustedCluster]);
    let root = plane("root", Arc::new(Loopback::new(leaf.service.clone()))).await;

    let err = root
        .service
        .upsert_trusted_cluster("admin@root", descriptor("temp", "nope", true))
        .await
        .unwrap_err();

    assert!(err.is_access_denied());
    assert!(err.to_string().contains("invalid cluster token"));

    assert!(root.backend.get_trusted_clusters().await.unwrap().is_empty());
    assert!(root
        .backend
        .get_cert_authority(&CertAuthId::new(HOST, "leaf-east"), false)
        .await
        .unwrap_err()
        .is_not_found());
    assert!(root.audit.events().is_empty());
    assert!(leaf.backend.get_remote_cluster("root").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_token_without_capability_is_access_denied() {
    let leaf = plane("leaf-east", Arc::new(NoOutbound)).await;
    leaf.backend.add_token("node-token", vec![TokenCapability::Node]);
    let root = plane("root", Arc::new(Loopback::new(leaf.service.clone()))).await;

    let err = root
        .service
        .upsert_trusted_cluster("admin@root", descriptor("temp", "node-token", true))
        .await
        .unwrap_err();

    assert!(err.is_access_denied());
    assert!(err.to_string().contains("role does not match"));
}

#[tokio::test]
async fn test_legacy_capability_is_accepted() {
    let leaf = plane("leaf-east", Arc::new(NoOutbound)).await;
    leaf.backend.add_token("old-tok", vec![TokenCapability::LegacyTrustedCluster]);
    let root = plane("root", Arc::new(Loopback::new(leaf.service.clone()))).await;

    let stored = root
        .service
        .upsert_trusted_cluster("admin@root", descriptor("temp", "old-tok", true))
        .await
        .unwrap();
    assert_eq!(stored.name, "leaf-east");
}

// =============================================================================
// Identity Collisions
// =============================================================================

/// A remote that answers with authorities claiming the caller's own name.
struct ImpersonatingRemote;

#[async_trait]
impl ValidationClient for ImpersonatingRemote {
    async fn validate(
        &self,
        _proxy_address: &str,
        _request: &ValidateRequest,
    ) -> Result<ValidateResponse> {
        let key_pair = identity::generate_identity("root").unwrap();
        Ok(ValidateResponse {
            cert_authorities: vec![
                CertAuthority::new(CertAuthType::Host, "root", vec![key_pair.clone()]),
                CertAuthority::new(CertAuthType::User, "root", vec![key_pair]),
            ],
        })
    }
}

#[tokio::test]
async fn test_remote_claiming_local_name_is_rejected() {
    let root = plane("root", Arc::new(ImpersonatingRemote)).await;

    let err = root
        .service
        .upsert_trusted_cluster("admin@root", descriptor("temp", "tok", true))
        .await
        .unwrap_err();

    assert!(err.is_bad_parameter());
    assert!(err.to_string().contains("remote cluster name can not be the same"));

    // nothing was imported; the local authority is intact
    let own = root
        .backend
        .get_cert_authority(&CertAuthId::new(HOST, "root"), true)
        .await
        .unwrap();
    assert_eq!(own.cluster_name, "root");
    assert!(!own.tls_key_pairs[0].key.is_empty());
    assert!(root.backend.get_trusted_clusters().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_responder_rejects_inbound_local_name() {
    let leaf = plane("leaf-east", Arc::new(NoOutbound)).await;
    leaf.backend.add_token("tok", vec![TokenCapability::TrustedCluster]);

    // an initiator claiming to be "leaf-east" itself
    let key_pair = identity::generate_identity("leaf-east").unwrap();
    let request = ValidateRequest {
        token: "tok".into(),
        cert_authorities: vec![CertAuthority::new(CertAuthType::Host, "leaf-east", vec![key_pair])],
    };

    let err = leaf.service.validate_trusted_cluster(&request).await.unwrap_err();
    assert!(err.is_access_denied());
    assert!(err.to_string().contains("same name as cluster certificate authority"));
}

#[tokio::test]
async fn test_responder_rejects_empty_authority_bundle() {
    let leaf = plane("leaf-east", Arc::new(NoOutbound)).await;
    leaf.backend.add_token("tok", vec![TokenCapability::TrustedCluster]);

    let request = ValidateRequest { token: "tok".into(), cert_authorities: Vec::new() };
    let err = leaf.service.validate_trusted_cluster(&request).await.unwrap_err();
    assert!(err.is_bad_parameter());
}

/// A remote whose transport fails with a TLS chain problem.
struct BrokenTlsRemote;

#[async_trait]
impl ValidationClient for BrokenTlsRemote {
    async fn validate(
        &self,
        _proxy_address: &str,
        _request: &ValidateRequest,
    ) -> Result<ValidateResponse> {
        Err(TrustError::Internal("x509: unknown authority".into()))
    }
}

#[tokio::test]
async fn test_tls_chain_error_is_reshaped() {
    let root = plane("root", Arc::new(BrokenTlsRemote)).await;

    let err = root
        .service
        .upsert_trusted_cluster("admin@root", descriptor("temp", "tok", true))
        .await
        .unwrap_err();

    assert!(err.is_access_denied());
    assert!(err.to_string().contains("misconfigured HTTP/TLS certificate"));
}

// =============================================================================
// Role Map Validation
// =============================================================================

#[tokio::test]
async fn test_missing_local_role_is_not_found() {
    let leaf = plane("leaf-east", Arc::new(NoOutbound)).await;
    leaf.backend.add_token("tok", vec![TokenCapability::TrustedCluster]);
    let loopback = Arc::new(Loopback::new(leaf.service.clone()));
    let root = plane("root", loopback.clone()).await;

    let mut cluster = descriptor("temp", "tok", true);
    cluster.role_map[0].local = vec!["no-such-role".into()];

    let err = root.service.upsert_trusted_cluster("admin@root", cluster).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("no-such-role"));
    // the role check runs before any handshake
    assert_eq!(loopback.call_count(), 0);
}

#[tokio::test]
async fn test_template_expansion_skips_role_check() {
    let leaf = plane("leaf-east", Arc::new(NoOutbound)).await;
    leaf.backend.add_token("tok", vec![TokenCapability::TrustedCluster]);
    let root = plane("root", Arc::new(Loopback::new(leaf.service.clone()))).await;

    let mut cluster = descriptor("temp", "tok", true);
    cluster.roles = Vec::new();
    cluster.role_map[0].local = vec!["{{external.groups}}".into()];

    let stored = root.service.upsert_trusted_cluster("admin@root", cluster).await.unwrap();
    assert_eq!(stored.name, "leaf-east");
}

// =============================================================================
// Deletion
// =============================================================================

#[tokio::test]
async fn test_delete_trusted_cluster_removes_coupled_state() {
    let leaf = plane("leaf-east", Arc::new(NoOutbound)).await;
    leaf.backend.add_token("tok", vec![TokenCapability::TrustedCluster]);
    let root = plane("root", Arc::new(Loopback::new(leaf.service.clone()))).await;

    root.service
        .upsert_trusted_cluster("admin@root", descriptor("temp", "tok", true))
        .await
        .unwrap();

    root.service.delete_trusted_cluster("admin@root", "leaf-east").await.unwrap();

    for auth_type in [HOST, USER] {
        assert!(root
            .backend
            .get_cert_authority(&CertAuthId::new(auth_type, "leaf-east"), false)
            .await
            .unwrap_err()
            .is_not_found());
    }
    assert!(root.backend.get_reverse_tunnel("leaf-east").await.unwrap_err().is_not_found());
    assert!(root.backend.get_trusted_cluster("leaf-east").await.unwrap_err().is_not_found());
    assert_eq!(root.audit.count(AuditEventKind::TrustedClusterDelete), 1);

    // deleting again reports the missing descriptor
    let err =
        root.service.delete_trusted_cluster("admin@root", "leaf-east").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_delete_trusted_cluster_refuses_own_name() {
    let root = plane("root", Arc::new(NoOutbound)).await;

    let err = root.service.delete_trusted_cluster("admin@root", "root").await.unwrap_err();
    assert!(err.is_bad_parameter());
    assert!(err.to_string().contains("cannot be removed"));
    assert_eq!(root.audit.count(AuditEventKind::TrustedClusterDelete), 0);
}

#[tokio::test]
async fn test_delete_remote_cluster() {
    let leaf = plane("leaf-east", Arc::new(NoOutbound)).await;
    leaf.backend.add_token("tok", vec![TokenCapability::TrustedCluster]);
    let root = plane("root", Arc::new(Loopback::new(leaf.service.clone()))).await;

    root.service
        .upsert_trusted_cluster("admin@root", descriptor("temp", "tok", true))
        .await
        .unwrap();

    // the leaf tears down its side of the relationship
    leaf.service.delete_remote_cluster("root").await.unwrap();
    assert!(leaf.backend.get_remote_cluster("root").await.unwrap_err().is_not_found());
    assert!(leaf
        .backend
        .get_cert_authority(&CertAuthId::new(HOST, "root"), false)
        .await
        .unwrap_err()
        .is_not_found());

    // unknown names are refused before anything is touched
    let err = leaf.service.delete_remote_cluster("leaf-east").await.unwrap_err();
    assert!(err.is_not_found());
    assert!(leaf
        .backend
        .get_cert_authority(&CertAuthId::new(HOST, "leaf-east"), false)
        .await
        .is_ok());
}

// =============================================================================
// Audit Robustness
// =============================================================================

struct FailingAudit;

#[async_trait]
impl federation_plane::Audit for FailingAudit {
    async fn emit_audit_event(
        &self,
        _kind: AuditEventKind,
        _fields: federation_plane::AuditFields,
    ) -> Result<()> {
        Err(TrustError::Internal("audit sink unavailable".into()))
    }
}

#[tokio::test]
async fn test_audit_failure_never_propagates() {
    use federation_plane::{FederationDeps, FederationService, ManualClock, TrustConfig};

    let leaf = plane("leaf-east", Arc::new(NoOutbound)).await;
    leaf.backend.add_token("tok", vec![TokenCapability::TrustedCluster]);

    let helper = plane("root", Arc::new(NoOutbound)).await;
    let root = Arc::new(FederationService::new(
        TrustConfig { cluster_name: "root".into(), ..TrustConfig::default() },
        FederationDeps {
            presence: helper.backend.clone(),
            authorities: helper.backend.clone(),
            tunnels: helper.backend.clone(),
            roles: helper.backend.clone(),
            tokens: helper.backend.clone(),
            audit: Arc::new(FailingAudit),
            clock: Arc::new(ManualClock::new(chrono::Utc::now())),
            validation: Arc::new(Loopback::new(leaf.service.clone())),
        },
    ));

    let stored =
        root.upsert_trusted_cluster("admin@root", descriptor("temp", "tok", true)).await.unwrap();
    assert_eq!(stored.name, "leaf-east");
}
