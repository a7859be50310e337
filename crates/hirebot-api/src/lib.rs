//! JSON HTTP API for hirebot.
//!
//! Exposes an axum [`Router`] backed by any [`TenantStore`]. Every route is
//! authenticated and scoped to the company its credential resolves to. TLS
//! and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let (changes, _) = tokio::sync::broadcast::channel(256);
//! let app = hirebot_api::api_router(AppState::new(store, changes));
//! ```

pub mod auth;
pub mod error;
pub mod gateway;
pub mod registry;


use std::sync::Arc;

use axum::Router;
use hirebot_core::{change::ChangeEvent, store::TenantStore};
use tokio::sync::broadcast;

pub use error::ApiError;
pub use registry::{Operation, REGISTRY, Registration};

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:   Arc<S>,
  /// Receives a [`ChangeEvent`] after each successful mutation of an
  /// emitting kind. Sends with no subscriber are dropped.
  pub changes: broadcast::Sender<ChangeEvent>,
}

impl<S> AppState<S> {
  pub fn new(store: Arc<S>, changes: broadcast::Sender<ChangeEvent>) -> Self {
    Self { store, changes }
  }
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), changes: self.changes.clone() }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the API router: one nested router per [`REGISTRY`] entry, mounted
/// at the kind's segment.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: TenantStore + 'static,
{
  REGISTRY
    .iter()
    .fold(Router::new(), |router, entry| {
      router.nest(&format!("/{}", entry.kind.segment()), entry.routes::<S>())
    })
    .with_state(state)
}
