//! The scoped access gateway: the handlers behind every registered kind.
//!
//! Each handler authenticates first, then checks the path company against
//! the credential's company (403 for any other company, existing or not),
//! and only then touches tenant data. Reads go through the store filtered
//! by the tenant; writes are stamped with it.
//! Nothing in the request body can choose the company.

use axum::{
  Extension, Json,
  extract::{Path, Query, State, rejection::QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use bytes::Bytes;
use hirebot_core::{
  change::Change,
  kind::Kind,
  resource::{NewResource, Resource, ResourceUpdate},
  store::{ListQuery, TenantStore},
  tenant::Tenant,
  validate::{self, FieldErrors, NON_FIELD},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, auth::Authenticated, error::ApiError};

// ─── Scoping ──────────────────────────────────────────────────────────────────

/// Confirm the path company is the tenant's own, then that it still exists.
///
/// Any company other than the tenant's is refused the same way, whether it
/// exists or not, and so is an id that is not a UUID.
pub(crate) async fn scope<S: TenantStore>(
  store:  &S,
  tenant: &Tenant,
  raw:    &str,
) -> Result<(), ApiError> {
  let mismatch = || {
    tracing::warn!(
      path_company = raw,
      company_id = %tenant.company_id(),
      "credential used against another company"
    );
    ApiError::TenantMismatch
  };

  let company_id = Uuid::parse_str(raw).map_err(|_| mismatch())?;
  tenant.check_path(company_id).map_err(|_| mismatch())?;

  // Only reachable if the company was deleted after the credential resolved.
  if store
    .get_company(company_id)
    .await
    .map_err(ApiError::store)?
    .is_none()
  {
    return Err(ApiError::TenantNotFound);
  }
  Ok(())
}

fn parse_body(body: &Bytes) -> Result<serde_json::Value, ApiError> {
  serde_json::from_slice(body).map_err(|e| {
    ApiError::Validation(FieldErrors::single(NON_FIELD, &format!("JSON parse error - {e}")))
  })
}

fn publish<S>(state: &AppState<S>, resource: &Resource, change: Change) {
  if let Some(event) = resource.change_event(change) {
    tracing::info!(
      kind = %event.kind,
      resource_id = %event.resource_id,
      company_id = %event.company_id,
      ?change,
      "change event"
    );
    // No subscriber is not an error.
    let _ = state.changes.send(event);
  }
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct Page {
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

/// `GET /<kind>/{company_id}[?limit=&offset=]`
///
/// Publishable kinds list only their active rows.
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Extension(kind): Extension<Kind>,
  Authenticated(tenant): Authenticated,
  Path(company_id): Path<String>,
  page: Result<Query<Page>, QueryRejection>,
) -> Result<Response, ApiError>
where
  S: TenantStore + 'static,
{
  scope(state.store.as_ref(), &tenant, &company_id).await?;
  let Query(page) = page.map_err(|e| ApiError::BadRequest(e.body_text()))?;

  let query = ListQuery { limit: page.limit, offset: page.offset, ..ListQuery::listing(kind) };
  tracing::debug!(%kind, company_id = %tenant.company_id(), "list");

  if kind.is_event() {
    let events = state
      .store
      .list_events(&tenant, query)
      .await
      .map_err(ApiError::store)?;
    Ok(Json(events).into_response())
  } else {
    let resources = state
      .store
      .list_resources(&tenant, query)
      .await
      .map_err(ApiError::store)?;
    Ok(Json(resources).into_response())
  }
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /<kind>/{company_id}/post`. Body: the kind's fields, plus
/// `active` for publishable kinds.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Extension(kind): Extension<Kind>,
  Authenticated(tenant): Authenticated,
  Path(company_id): Path<String>,
  body: Bytes,
) -> Result<Response, ApiError>
where
  S: TenantStore + 'static,
{
  scope(state.store.as_ref(), &tenant, &company_id).await?;
  let payload = parse_body(&body)?;

  if kind.is_event() {
    let input = validate::new_event(kind, &payload)?;
    let event = state
      .store
      .record_event(&tenant, input)
      .await
      .map_err(ApiError::store)?;
    tracing::info!(%kind, event_id = %event.event_id, company_id = %event.company_id, "event recorded");
    return Ok((StatusCode::CREATED, Json(event)).into_response());
  }

  let draft = validate::resource_draft(kind, &payload)?;
  let input = NewResource { value: draft.value, active: draft.active.unwrap_or(false) };
  let resource = state
    .store
    .create_resource(&tenant, input)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(
    %kind,
    resource_id = %resource.resource_id,
    company_id = %resource.company_id,
    "resource created"
  );
  publish(&state, &resource, Change::Created);
  Ok((StatusCode::CREATED, Json(resource)).into_response())
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /<kind>/{company_id}/{id}`: 404 if the tenant owns no such row.
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Extension(kind): Extension<Kind>,
  Authenticated(tenant): Authenticated,
  Path((company_id, id)): Path<(String, String)>,
) -> Result<Json<Resource>, ApiError>
where
  S: TenantStore + 'static,
{
  scope(state.store.as_ref(), &tenant, &company_id).await?;
  let id = Uuid::parse_str(&id).map_err(|_| ApiError::NotFound)?;

  let resource = state
    .store
    .get_resource(&tenant, kind, id)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::NotFound)?;
  Ok(Json(resource))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PUT /<kind>/{company_id}/{id}`: full replacement of the payload;
/// `active` toggles publishable kinds and is kept when omitted.
pub async fn update<S>(
  State(state): State<AppState<S>>,
  Extension(kind): Extension<Kind>,
  Authenticated(tenant): Authenticated,
  Path((company_id, id)): Path<(String, String)>,
  body: Bytes,
) -> Result<Json<Resource>, ApiError>
where
  S: TenantStore + 'static,
{
  scope(state.store.as_ref(), &tenant, &company_id).await?;
  let id = Uuid::parse_str(&id).map_err(|_| ApiError::NotFound)?;
  let payload = parse_body(&body)?;

  let draft = validate::resource_draft(kind, &payload)?;
  let resource = state
    .store
    .update_resource(&tenant, id, ResourceUpdate { value: draft.value, active: draft.active })
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::NotFound)?;
  tracing::info!(
    %kind,
    resource_id = %resource.resource_id,
    company_id = %resource.company_id,
    "resource updated"
  );
  publish(&state, &resource, Change::Updated);
  Ok(Json(resource))
}
