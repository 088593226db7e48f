//! Trusted-cluster validation handler
//!
//! Responder side of the enrollment handshake. The body arrives in the raw
//! wire form (authorities as base64 blobs); translation failures are client
//! errors, everything else is delegated to the service.

use std::sync::Arc;

use axum::{extract::State, Json};

use federation_core::{ValidateRequestRaw, ValidateResponseRaw};

use crate::api::error::ApiError;
use crate::core::FederationService;

/// Application state shared across handlers.
pub struct AppState {
    pub service: Arc<FederationService>,
}

/// POST /{api_version}/webapi/trustedclusters/validate
pub async fn validate_trusted_cluster(
    State(state): State<Arc<AppState>>,
    Json(raw): Json<ValidateRequestRaw>,
) -> Result<Json<ValidateResponseRaw>, ApiError> {
    let request = raw.to_native()?;
    let response = state.service.validate_trusted_cluster(&request).await?;
    let raw = response.to_raw()?;
    Ok(Json(raw))
}
