//! The `TenantStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `hirebot-store-sqlite`).
//! The HTTP layer depends on this abstraction, not on any concrete backend.
//!
//! Operator operations (companies, keys, staff) take plain ids. Every
//! operation on tenant data takes a [`Tenant`] and is filtered or stamped
//! with its company; there is no unscoped read of resources or events.

use std::future::Future;

use uuid::Uuid;

use crate::{
  company::{Company, NewStaffUser, StaffUser},
  credential::{ApiKey, IssuedKey},
  event::{Event, NewEvent},
  kind::Kind,
  resource::{NewResource, Resource, ResourceUpdate},
  tenant::Tenant,
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Which rows of a kind a listing may return, after tenant scoping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
  /// Every row of the tenant.
  All,
  /// Only rows whose `active` flag is set.
  ActiveOnly,
}

impl Visibility {
  /// The visibility a chatbot-facing listing of `kind` must use. Kinds
  /// without an activity flag are never filtered on it.
  pub fn for_listing(kind: Kind) -> Self {
    if kind.is_publishable() { Self::ActiveOnly } else { Self::All }
  }
}

/// Parameters for [`TenantStore::list_resources`] and
/// [`TenantStore::list_events`].
#[derive(Debug, Clone, Copy)]
pub struct ListQuery {
  pub kind:       Kind,
  pub visibility: Visibility,
  pub limit:      Option<usize>,
  pub offset:     Option<usize>,
}

impl ListQuery {
  /// A listing of `kind` with the visibility chatbot consumers get.
  pub fn listing(kind: Kind) -> Self {
    Self { kind, visibility: Visibility::for_listing(kind), limit: None, offset: None }
  }

  /// Every row of `kind`, drafts included.
  pub fn everything(kind: Kind) -> Self {
    Self { kind, visibility: Visibility::All, limit: None, offset: None }
  }
}

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Backend errors expose the domain error they wrap, if any, so callers can
/// tell expected rejections from faults.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  fn as_core(&self) -> Option<&crate::Error>;
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a hirebot store backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait TenantStore: Send + Sync {
  type Error: StoreError;

  // ── Companies ─────────────────────────────────────────────────────────

  /// Create an active company. Fails with
  /// [`crate::Error::DuplicateCompanyName`] if the name is taken.
  fn add_company<'a>(
    &'a self,
    company_name: &'a str,
  ) -> impl Future<Output = Result<Company, Self::Error>> + Send + 'a;

  fn get_company(
    &self,
    company_id: Uuid,
  ) -> impl Future<Output = Result<Option<Company>, Self::Error>> + Send + '_;

  fn list_companies(&self) -> impl Future<Output = Result<Vec<Company>, Self::Error>> + Send + '_;

  fn set_company_active(
    &self,
    company_id: Uuid,
    is_active: bool,
  ) -> impl Future<Output = Result<Company, Self::Error>> + Send + '_;

  /// Delete a company and, by cascade, everything it owns. Returns `false`
  /// if no such company existed.
  fn delete_company(
    &self,
    company_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Credentials ───────────────────────────────────────────────────────

  /// Generate and store a new key bound to `company_id`. The returned
  /// secret is not recoverable afterwards.
  fn issue_api_key<'a>(
    &'a self,
    company_id: Uuid,
    name: &'a str,
  ) -> impl Future<Output = Result<IssuedKey, Self::Error>> + Send + 'a;

  fn list_api_keys(
    &self,
    company_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ApiKey>, Self::Error>> + Send + '_;

  fn revoke_api_key(
    &self,
    key_id: Uuid,
  ) -> impl Future<Output = Result<ApiKey, Self::Error>> + Send + '_;

  /// Resolve a presented key to its tenant. Unknown keys, revoked keys and
  /// keys of inactive companies all resolve to `None`.
  fn resolve_api_key<'a>(
    &'a self,
    presented: &'a str,
  ) -> impl Future<Output = Result<Option<Tenant>, Self::Error>> + Send + 'a;

  // ── Staff ─────────────────────────────────────────────────────────────

  fn add_staff_user(
    &self,
    input: NewStaffUser,
  ) -> impl Future<Output = Result<StaffUser, Self::Error>> + Send + '_;

  /// Look up a staff user by (normalised) email, active or not.
  fn get_staff_user_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<StaffUser>, Self::Error>> + Send + 'a;

  // ── Resources ─────────────────────────────────────────────────────────

  /// Insert a resource owned by the tenant's company. Referenced ids must
  /// belong to the same company or the write fails validation.
  fn create_resource<'a>(
    &'a self,
    tenant: &'a Tenant,
    input: NewResource,
  ) -> impl Future<Output = Result<Resource, Self::Error>> + Send + 'a;

  fn list_resources<'a>(
    &'a self,
    tenant: &'a Tenant,
    query: ListQuery,
  ) -> impl Future<Output = Result<Vec<Resource>, Self::Error>> + Send + 'a;

  /// A resource of `kind` owned by the tenant. Rows of other tenants are
  /// reported as absent.
  fn get_resource<'a>(
    &'a self,
    tenant: &'a Tenant,
    kind: Kind,
    resource_id: Uuid,
  ) -> impl Future<Output = Result<Option<Resource>, Self::Error>> + Send + 'a;

  /// Replace a resource's payload and optionally its `active` flag.
  /// Returns `None` if the tenant owns no such resource.
  fn update_resource<'a>(
    &'a self,
    tenant: &'a Tenant,
    resource_id: Uuid,
    update: ResourceUpdate,
  ) -> impl Future<Output = Result<Option<Resource>, Self::Error>> + Send + 'a;

  // ── Events — append-only ──────────────────────────────────────────────

  fn record_event<'a>(
    &'a self,
    tenant: &'a Tenant,
    input: NewEvent,
  ) -> impl Future<Output = Result<Event, Self::Error>> + Send + 'a;

  fn list_events<'a>(
    &'a self,
    tenant: &'a Tenant,
    query: ListQuery,
  ) -> impl Future<Output = Result<Vec<Event>, Self::Error>> + Send + 'a;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn listing_visibility_follows_the_activity_flag() {
    assert_eq!(ListQuery::listing(Kind::Job).visibility, Visibility::ActiveOnly);
    assert_eq!(ListQuery::listing(Kind::Benefit).visibility, Visibility::ActiveOnly);
    assert_eq!(ListQuery::listing(Kind::Question).visibility, Visibility::ActiveOnly);
    assert_eq!(ListQuery::listing(Kind::Location).visibility, Visibility::All);
    assert_eq!(ListQuery::listing(Kind::QnsData).visibility, Visibility::All);
  }
}
