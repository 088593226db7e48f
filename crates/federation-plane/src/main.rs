//! Federation plane server binary
//!
//! Runs the trust-federation control plane: the validation endpoint plus
//! the periodic ensure/collect cycle.

use std::env;
use std::sync::Arc;

use tokio::time::MissedTickBehavior;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use federation_core::{identity, CertAuthId, CertAuthType, CertAuthority, TokenCapability};
use federation_plane::storage::CertAuthorities;
use federation_plane::{
    create_router, AppState, FederationDeps, FederationService, HttpValidationClient, LogAudit,
    MemoryBackend, SystemClock, TrustConfig, TrustController,
};

#[tokio::main]
async fn main() {
    // Initialize logging
    let log_level = env::var("FEDERATION_LOG_LEVEL")
        .unwrap_or_else(|_| "info".into())
        .parse()
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    // Configuration
    let port: u16 = env::var("FEDERATION_PORT")
        .unwrap_or_else(|_| "3080".into())
        .parse()
        .expect("FEDERATION_PORT must be a valid port number");

    let cluster_name = env::var("FEDERATION_CLUSTER_NAME")
        .unwrap_or_else(|_| format!("cluster-{}", uuid::Uuid::new_v4()));

    let config = TrustConfig::from_env(cluster_name);

    // Storage
    // TODO: wire a persistent Presence/CA backend when one is configured;
    // the memory backend only suits single-instance deployments.
    let backend = Arc::new(MemoryBackend::new());

    if let Ok(token) = env::var("FEDERATION_JOIN_TOKEN") {
        backend.add_token(token, vec![TokenCapability::TrustedCluster]);
        info!("Registered trusted-cluster join token from environment");
    }

    seed_local_authorities(&backend, &config.cluster_name).await;

    let validation = Arc::new(HttpValidationClient::new(&config));

    let service = Arc::new(FederationService::new(
        config.clone(),
        FederationDeps {
            presence: backend.clone(),
            authorities: backend.clone(),
            tunnels: backend.clone(),
            roles: backend.clone(),
            tokens: backend.clone(),
            audit: Arc::new(LogAudit),
            clock: Arc::new(SystemClock),
            validation,
        },
    ));

    // Periodic ensure/collect cycle. The controller is handed the backend
    // directly: descriptor reads for the orphan scan must not go through a
    // cache.
    let mut controller =
        TrustController::new(service.clone(), backend.clone(), config.orphan_after);
    let cycle_interval = config.ensure_interval;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(cycle_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let now = chrono::Utc::now();
            if let Err(err) = controller.cycle(now).await {
                warn!(error = %err, "Trust controller cycle failed");
            }
        }
    });

    info!(
        cluster = %config.cluster_name,
        port = port,
        api_version = %config.api_version,
        "Starting federation plane server"
    );

    let state = Arc::new(AppState { service });
    let app = create_router(state, &config.api_version);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    info!(addr = %addr, "Federation plane listening");

    axum::serve(listener, app).await.expect("Server error");
}

/// Mint this cluster's own host and user authorities when absent, so a
/// fresh process can answer validation requests.
async fn seed_local_authorities(backend: &MemoryBackend, cluster_name: &str) {
    for auth_type in [CertAuthType::Host, CertAuthType::User] {
        let id = CertAuthId::new(auth_type, cluster_name);
        if backend.get_cert_authority(&id, false).await.is_ok() {
            continue;
        }
        let key_pair = identity::generate_identity(cluster_name)
            .expect("Failed to generate local cluster identity");
        let ca = CertAuthority::new(auth_type, cluster_name, vec![key_pair]);
        match backend.create_cert_authority(ca).await {
            Ok(()) => info!(id = %id, "Created local certificate authority"),
            Err(err) if err.is_already_exists() => {}
            Err(err) => warn!(id = %id, error = %err, "Failed to seed local certificate authority"),
        }
    }
}
