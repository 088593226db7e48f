//! Control-plane core
//!
//! [`FederationService`] is the single owner of the coupled trust resources:
//! it applies administrator descriptors ([`reconciler`]), drives the
//! handshake ([`validate`]), re-applies every descriptor periodically
//! ([`ensure`]), sweeps orphaned authorities ([`collector`]) and derives
//! remote-cluster health ([`status`]).
//!
//! All collaborators are injected through the constructor; there is no
//! process-global state.

pub mod collector;
pub mod ensure;
pub mod reconciler;
pub mod status;
pub mod validate;

pub use collector::TrustController;

use std::sync::Arc;

use tracing::warn;

use crate::audit::{Audit, AuditEventKind, AuditFields};
use crate::clock::Clock;
use crate::config::TrustConfig;
use crate::rpc::ValidationClient;
use crate::storage::{CertAuthorities, Presence, RoleStore, TokenValidator, TunnelRegistry};

/// Collaborators of the control plane.
pub struct FederationDeps {
    pub presence: Arc<dyn Presence>,
    pub authorities: Arc<dyn CertAuthorities>,
    pub tunnels: Arc<dyn TunnelRegistry>,
    pub roles: Arc<dyn RoleStore>,
    pub tokens: Arc<dyn TokenValidator>,
    pub audit: Arc<dyn Audit>,
    pub clock: Arc<dyn Clock>,
    pub validation: Arc<dyn ValidationClient>,
}

/// The trust-federation control plane.
pub struct FederationService {
    pub(crate) config: TrustConfig,
    pub(crate) presence: Arc<dyn Presence>,
    pub(crate) authorities: Arc<dyn CertAuthorities>,
    pub(crate) tunnels: Arc<dyn TunnelRegistry>,
    pub(crate) roles: Arc<dyn RoleStore>,
    pub(crate) tokens: Arc<dyn TokenValidator>,
    pub(crate) audit: Arc<dyn Audit>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) validation: Arc<dyn ValidationClient>,
}

impl FederationService {
    pub fn new(config: TrustConfig, deps: FederationDeps) -> Self {
        Self {
            config,
            presence: deps.presence,
            authorities: deps.authorities,
            tunnels: deps.tunnels,
            roles: deps.roles,
            tokens: deps.tokens,
            audit: deps.audit,
            clock: deps.clock,
            validation: deps.validation,
        }
    }

    /// This cluster's own domain name.
    pub fn cluster_name(&self) -> &str {
        &self.config.cluster_name
    }

    pub fn config(&self) -> &TrustConfig {
        &self.config
    }

    /// The presence handle this service was wired with.
    pub fn presence(&self) -> &Arc<dyn Presence> {
        &self.presence
    }

    /// Best-effort audit emission; failures are logged and swallowed.
    pub(crate) async fn emit_audit(&self, kind: AuditEventKind, user: &str) {
        let fields = AuditFields { user: user.to_string() };
        if let Err(err) = self.audit.emit_audit_event(kind, fields).await {
            warn!(event = kind.as_str(), error = %err, "Failed to emit audit event");
        }
    }
}
