//! Error taxonomy for the federation plane
//!
//! Every fallible operation in the control plane reports one of the kinds
//! below. The kinds are transport-independent: the HTTP layer maps them to
//! status codes, and several control-flow decisions (activation fall-through,
//! tunnel-delete tolerance, orphan-collector delete tolerance) inspect them
//! with the `is_*` helpers rather than matching on message text.

use thiserror::Error;

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, TrustError>;

/// Error kinds shared by the stores, the reconciler and the validation RPC.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrustError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("bad parameter: {0}")]
    BadParameter(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("invalid state transition: {0}")]
    InvalidTransition(String),

    #[error("operation cancelled: {0}")]
    Cancelled(String),

    /// Collected per-item failures from a bulk operation that always
    /// attempts every item.
    #[error("{}", format_aggregate(.0))]
    Aggregate(Vec<TrustError>),

    #[error("internal error: {0}")]
    Internal(String),
}

fn format_aggregate(errors: &[TrustError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl TrustError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, TrustError::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, TrustError::AlreadyExists(_))
    }

    pub fn is_access_denied(&self) -> bool {
        matches!(self, TrustError::AccessDenied(_))
    }

    pub fn is_bad_parameter(&self) -> bool {
        matches!(self, TrustError::BadParameter(_))
    }

    /// Collapse a list of per-item failures into a single result.
    ///
    /// An empty list is success; a non-empty list becomes an `Aggregate`
    /// carrying every inner error for later inspection.
    pub fn from_errors(errors: Vec<TrustError>) -> Result<()> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(TrustError::Aggregate(errors))
        }
    }

    /// Inner errors of an aggregate; a single error is its own slice of one.
    pub fn errors(&self) -> &[TrustError] {
        match self {
            TrustError::Aggregate(errors) => errors,
            _ => std::slice::from_ref(self),
        }
    }
}
