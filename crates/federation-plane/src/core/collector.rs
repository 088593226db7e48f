//! Orphan-authority collector
//!
//! Periodically sweeps certificate authorities that no trusted-cluster
//! descriptor covers. A candidate is only deleted after it has been
//! continuously suspect for a configured grace window, so a transient store
//! hiccup that hides a descriptor for one cycle can never cost a live
//! authority its record.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use federation_core::{CertAuthType, CertAuthority, Result};

use crate::storage::{CertAuthorities, Presence};

use super::FederationService;

/// An authority that did not appear to belong to this cluster or to any
/// descriptor when last scanned.
struct SuspectAuthority {
    ca: CertAuthority,
    since: DateTime<Utc>,
    seen: bool,
}

/// Periodic controller: runs the ensure pass, then the orphan scan.
///
/// One controller instance runs per process; it owns the suspect list.
pub struct TrustController {
    service: Arc<FederationService>,
    /// Descriptors are loaded through this handle, which MUST be the
    /// authoritative backend and never a read-through cache: a stale cache
    /// miss would make a live authority look orphaned.
    backend: Arc<dyn Presence>,
    orphan_after: Duration,
    suspects: Vec<SuspectAuthority>,
}

impl TrustController {
    pub fn new(
        service: Arc<FederationService>,
        backend: Arc<dyn Presence>,
        orphan_after: StdDuration,
    ) -> Self {
        Self {
            service,
            backend,
            orphan_after: Duration::from_std(orphan_after).unwrap_or(Duration::MAX),
            suspects: Vec::new(),
        }
    }

    /// One pass at wall-clock `now`.
    ///
    /// Only a failure to load the descriptor set or an authority listing
    /// aborts the cycle; every other step is logged and skipped.
    pub async fn cycle(&mut self, now: DateTime<Utc>) -> Result<()> {
        let domain_name = self.service.cluster_name().to_string();

        let clusters = self.backend.get_trusted_clusters().await?;

        // Re-apply configurations first; the scan below is correct whether
        // or not this pass succeeds.
        if let Err(err) = self.service.ensure_trusted_clusters(&clusters).await {
            warn!(error = %err, "Ensure pass failed");
        }

        for suspect in &mut self.suspects {
            suspect.seen = false;
        }

        let mut next_suspects = Vec::new();

        for auth_type in [CertAuthType::User, CertAuthType::Host] {
            let authorities =
                self.service.authorities.get_cert_authorities(auth_type, false).await?;

            'processing: for ca in authorities {
                if ca.cluster_name == domain_name {
                    // belongs to this cluster
                    continue 'processing;
                }
                if clusters.iter().any(|tc| tc.name == ca.cluster_name) {
                    // covered by a descriptor
                    continue 'processing;
                }
                for suspect in &mut self.suspects {
                    if ca == suspect.ca {
                        suspect.seen = true;
                        continue 'processing;
                    }
                }
                // a new suspect; the grace window starts now
                next_suspects.push(SuspectAuthority { ca, since: now, seen: true });
            }
        }

        for suspect in self.suspects.drain(..) {
            if !suspect.seen {
                // deleted externally, or a descriptor now claims it
                continue;
            }
            if now.signed_duration_since(suspect.since) > self.orphan_after {
                let id = suspect.ca.id();
                match self.service.authorities.delete_cert_authority(&id).await {
                    Ok(()) => info!(id = %id, "Removed orphaned certificate authority"),
                    Err(err) if err.is_not_found() => {}
                    Err(err) => {
                        warn!(id = %id, error = %err, "Failed to remove orphaned certificate authority");
                    }
                }
                continue;
            }
            // still suspect, still inside the grace window
            next_suspects.push(suspect);
        }

        self.suspects = next_suspects;
        Ok(())
    }

    /// Number of currently tracked suspects; used by tests and the ready
    /// endpoint.
    pub fn suspect_count(&self) -> usize {
        self.suspects.len()
    }
}
