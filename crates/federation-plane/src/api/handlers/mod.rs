//! API handlers

pub mod validate;

pub use validate::{validate_trusted_cluster, AppState};
