//! Credential resolution: the request extractor that turns an
//! `Authorization` header into a [`Tenant`].
//!
//! Two schemes are accepted:
//!
//! - `Api-Key <prefix>.<secret>`, matched by hash against issued keys.
//! - `Basic base64(email:password)`, a staff user verified with argon2.
//!
//! Every failure, whatever its cause, is the same [`ApiError::Forbidden`].

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header, request::Parts};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use hirebot_core::{
  credential::API_KEY_SCHEME,
  store::TenantStore,
  tenant::{Principal, Tenant},
};

use crate::{AppState, error::ApiError};

/// Present in a handler means the request was authenticated; holds the
/// tenant its credential resolved to.
pub struct Authenticated(pub Tenant);

/// Resolve the request's credential to a tenant, or reject it.
pub async fn authenticate<S: TenantStore>(
  headers: &HeaderMap,
  store:   &S,
) -> Result<Tenant, ApiError> {
  let header_val = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Forbidden)?;

  let (scheme, credentials) = header_val
    .trim()
    .split_once(' ')
    .ok_or(ApiError::Forbidden)?;
  let credentials = credentials.trim();

  let tenant = if scheme.eq_ignore_ascii_case(API_KEY_SCHEME) {
    store.resolve_api_key(credentials).await.map_err(ApiError::store)?
  } else if scheme.eq_ignore_ascii_case("Basic") {
    resolve_staff(store, credentials).await?
  } else {
    None
  };

  match tenant {
    Some(tenant) => {
      tracing::debug!(company_id = %tenant.company_id(), "credential resolved");
      Ok(tenant)
    }
    None => {
      tracing::warn!(scheme, "rejected credential");
      Err(ApiError::Forbidden)
    }
  }
}

/// Stands in for the stored hash when no staff user matches, so an unknown
/// email costs the same argon2 work as a wrong password. Uses the default
/// argon2id parameters; no password verifies against it.
const DUMMY_PASSWORD_HASH: &str =
  "$argon2id$v=19$m=19456,t=2,p=1$A3y4YthzoZtr+JzyLZi7hA$mQzGr4sKv2NPBW/AzC6U+dHIsZG+CuDViwbssQ5Ir80";

/// Verify a Basic credential against the staff user it names. Inactive users
/// and users of inactive companies resolve to nothing.
async fn resolve_staff<S: TenantStore>(
  store:   &S,
  encoded: &str,
) -> Result<Option<Tenant>, ApiError> {
  let Ok(decoded) = B64.decode(encoded) else { return Ok(None) };
  let Ok(creds) = String::from_utf8(decoded) else { return Ok(None) };
  let Some((email, password)) = creds.split_once(':') else { return Ok(None) };

  let user = store
    .get_staff_user_by_email(email)
    .await
    .map_err(ApiError::store)?;

  let stored = user.as_ref().map_or(DUMMY_PASSWORD_HASH, |u| u.password_hash.as_str());
  let verified = PasswordHash::new(stored).is_ok_and(|hash| {
    Argon2::default()
      .verify_password(password.as_bytes(), &hash)
      .is_ok()
  });
  let Some(user) = user.filter(|u| verified && u.is_active) else { return Ok(None) };

  let company = store
    .get_company(user.company_id)
    .await
    .map_err(ApiError::store)?
    .filter(|c| c.is_active);
  Ok(company.map(|c| Tenant::new(c, Principal::Staff { user_id: user.user_id })))
}

impl<S> FromRequestParts<AppState<S>> for Authenticated
where
  S: TenantStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    authenticate(&parts.headers, state.store.as_ref()).await.map(Authenticated)
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use argon2::{PasswordHasher, password_hash::SaltString};
  use axum::{body::Body, http::Request};
  use hirebot_core::company::NewStaffUser;
  use hirebot_store_sqlite::SqliteStore;
  use rand_core::OsRng;
  use tokio::sync::broadcast;

  use super::*;

  async fn make_state() -> AppState<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let (changes, _) = broadcast::channel(16);
    AppState::new(Arc::new(store), changes)
  }

  fn hash(password: &str) -> String {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string()
  }

  async fn extract(
    auth:  Option<&str>,
    state: &AppState<SqliteStore>,
  ) -> Result<Authenticated, ApiError> {
    let mut builder = Request::builder();
    if let Some(value) = auth {
      builder = builder.header(header::AUTHORIZATION, value);
    }
    let (mut parts, _) = builder.body(Body::empty()).unwrap().into_parts();
    Authenticated::from_request_parts(&mut parts, state).await
  }

  fn basic(user: &str, pass: &str) -> String {
    format!("Basic {}", B64.encode(format!("{user}:{pass}")))
  }

  #[tokio::test]
  async fn api_key_resolves_to_its_company() {
    let state = make_state().await;
    let company = state.store.add_company("Acme").await.unwrap();
    let issued = state.store.issue_api_key(company.company_id, "bot").await.unwrap();

    let header = format!("Api-Key {}", issued.secret);
    let Authenticated(tenant) = extract(Some(&header), &state).await.unwrap();
    assert_eq!(tenant.company_id(), company.company_id);
  }

  #[tokio::test]
  async fn scheme_is_case_insensitive() {
    let state = make_state().await;
    let company = state.store.add_company("Acme").await.unwrap();
    let issued = state.store.issue_api_key(company.company_id, "bot").await.unwrap();

    let header = format!("api-key {}", issued.secret);
    assert!(extract(Some(&header), &state).await.is_ok());
  }

  #[tokio::test]
  async fn missing_header() {
    let state = make_state().await;
    assert!(matches!(extract(None, &state).await, Err(ApiError::Forbidden)));
  }

  #[tokio::test]
  async fn unknown_key() {
    let state = make_state().await;
    let result = extract(Some("Api-Key 0011.nope"), &state).await;
    assert!(matches!(result, Err(ApiError::Forbidden)));
  }

  #[tokio::test]
  async fn unsupported_scheme() {
    let state = make_state().await;
    let result = extract(Some("Bearer token"), &state).await;
    assert!(matches!(result, Err(ApiError::Forbidden)));
  }

  #[tokio::test]
  async fn staff_credentials_resolve_to_their_company() {
    let state = make_state().await;
    let company = state.store.add_company("Acme").await.unwrap();
    let user = state
      .store
      .add_staff_user(NewStaffUser {
        company_id:    company.company_id,
        email:         "rita@acme.com".into(),
        name:          "Rita".into(),
        password_hash: hash("secret"),
      })
      .await
      .unwrap();

    let header = basic("rita@ACME.com", "secret");
    let Authenticated(tenant) = extract(Some(&header), &state).await.unwrap();
    assert_eq!(tenant.company_id(), company.company_id);
    assert_eq!(tenant.staff_user_id(), Some(user.user_id));
  }

  #[tokio::test]
  async fn wrong_password() {
    let state = make_state().await;
    let company = state.store.add_company("Acme").await.unwrap();
    state
      .store
      .add_staff_user(NewStaffUser {
        company_id:    company.company_id,
        email:         "rita@acme.com".into(),
        name:          "Rita".into(),
        password_hash: hash("secret"),
      })
      .await
      .unwrap();

    let header = basic("rita@acme.com", "wrong");
    assert!(matches!(extract(Some(&header), &state).await, Err(ApiError::Forbidden)));
  }

  #[tokio::test]
  async fn staff_of_inactive_company() {
    let state = make_state().await;
    let company = state.store.add_company("Acme").await.unwrap();
    state
      .store
      .add_staff_user(NewStaffUser {
        company_id:    company.company_id,
        email:         "rita@acme.com".into(),
        name:          "Rita".into(),
        password_hash: hash("secret"),
      })
      .await
      .unwrap();
    state.store.set_company_active(company.company_id, false).await.unwrap();

    let header = basic("rita@acme.com", "secret");
    assert!(matches!(extract(Some(&header), &state).await, Err(ApiError::Forbidden)));
  }

  #[test]
  fn dummy_hash_costs_as_much_as_a_real_one() {
    use argon2::{Params, password_hash};

    let dummy = PasswordHash::new(DUMMY_PASSWORD_HASH).unwrap();
    let params = Params::try_from(&dummy).unwrap();
    assert_eq!(params.m_cost(), Params::DEFAULT_M_COST);
    assert_eq!(params.t_cost(), Params::DEFAULT_T_COST);
    assert_eq!(params.p_cost(), Params::DEFAULT_P_COST);

    // Verification runs to completion and then fails on the password.
    let result = Argon2::default().verify_password(b"secret", &dummy);
    assert!(matches!(result, Err(password_hash::Error::Password)));
  }

  #[tokio::test]
  async fn unknown_staff_email() {
    let state = make_state().await;
    state.store.add_company("Acme").await.unwrap();

    let header = basic("nobody@acme.com", "secret");
    assert!(matches!(extract(Some(&header), &state).await, Err(ApiError::Forbidden)));
  }

  #[tokio::test]
  async fn invalid_base64() {
    let state = make_state().await;
    let result = extract(Some("Basic !!!not-base64!!!"), &state).await;
    assert!(matches!(result, Err(ApiError::Forbidden)));
  }
}
