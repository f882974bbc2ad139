//! Notecolab: collaborative note-taking backend core.
//!
//! Organizes content into a three-level hierarchy (workspaces contain
//! folders and notes, folders contain notes, notes may nest) where every
//! resource carries its own owner, public flag and collaborator list with
//! graded permissions. The service layer resolves permissions on every
//! read/write/delete path and keeps containment and sharing invariants
//! consistent.
//!
//! This crate is a library boundary: HTTP routing, credential issuance and
//! email transport live in the consuming application. Services take the
//! authenticated [`models::User`] as an explicit parameter.

pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod state;

pub use error::{Error, Result};
pub use state::AppState;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing with an env-filter, defaulting to debug output for
/// this crate. Call once from the consuming application's entry point.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notecolab=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
