//! Audit event emission
//!
//! Create/delete operations on trusted clusters record who performed them.
//! Emission is best-effort: a failed emit is logged and swallowed, never
//! surfaced to the caller.

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use federation_core::Result;

/// Audit event kinds emitted by the control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditEventKind {
    TrustedClusterCreate,
    TrustedClusterDelete,
}

impl AuditEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventKind::TrustedClusterCreate => "trusted_cluster.create",
            AuditEventKind::TrustedClusterDelete => "trusted_cluster.delete",
        }
    }
}

/// Fields attached to an audit event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditFields {
    pub user: String,
}

#[async_trait]
pub trait Audit: Send + Sync {
    async fn emit_audit_event(&self, kind: AuditEventKind, fields: AuditFields) -> Result<()>;
}

/// Emits audit events to the structured log.
#[derive(Debug, Default)]
pub struct LogAudit;

#[async_trait]
impl Audit for LogAudit {
    async fn emit_audit_event(&self, kind: AuditEventKind, fields: AuditFields) -> Result<()> {
        info!(event = kind.as_str(), user = %fields.user, "Audit event");
        Ok(())
    }
}

/// Records events in memory; test fixture.
#[derive(Debug, Default)]
pub struct RecordingAudit {
    events: Mutex<Vec<(AuditEventKind, AuditFields)>>,
}

impl RecordingAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(AuditEventKind, AuditFields)> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, kind: AuditEventKind) -> usize {
        self.events.lock().unwrap().iter().filter(|(k, _)| *k == kind).count()
    }
}

#[async_trait]
impl Audit for RecordingAudit {
    async fn emit_audit_event(&self, kind: AuditEventKind, fields: AuditFields) -> Result<()> {
        self.events.lock().unwrap().push((kind, fields));
        Ok(())
    }
}
