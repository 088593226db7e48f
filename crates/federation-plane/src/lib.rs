//! Trust-Federation Control Plane
//!
//! Establishes, maintains and revokes directional trust between this
//! ("root") cluster and remote ("leaf") clusters:
//!
//! - the **reconciler** applies an administrator's trusted-cluster
//!   descriptor to the coupled resources (certificate authorities, reverse
//!   tunnel, presence record)
//! - the **validation RPC** exchanges the join token and authority bundles
//!   between initiator and responder
//! - the **ensure loop** re-applies every descriptor on a cadence and
//!   commits the rename discovered by a first handshake
//! - the **orphan collector** eventually deletes authorities no descriptor
//!   covers, under a grace window that survives flaky reads
//! - the **status prober** derives remote-cluster health from reverse-tunnel
//!   heartbeats on every read
//!
//! ## API endpoints
//!
//! - `GET /health` - liveness check
//! - `GET /ready` - readiness with cluster counts
//! - `POST /{api_version}/webapi/trustedclusters/validate` - enrollment
//!   handshake (responder side)

pub mod api;
pub mod audit;
pub mod clock;
pub mod config;
pub mod core;
pub mod rpc;
pub mod storage;

pub use api::create_router;
pub use api::handlers::AppState;
pub use audit::{Audit, AuditEventKind, AuditFields, LogAudit, RecordingAudit};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::TrustConfig;
pub use crate::core::{FederationDeps, FederationService, TrustController};
pub use rpc::{HttpValidationClient, ValidationClient};
pub use storage::MemoryBackend;
