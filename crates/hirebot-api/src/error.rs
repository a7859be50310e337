//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use hirebot_core::{Error as CoreError, store::StoreError, validate::FieldErrors};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// No credential, or one that resolves to no tenant. Never says which.
  #[error("forbidden")]
  Forbidden,

  /// The path names a company other than the credential's.
  #[error("credential is not bound to the requested company")]
  TenantMismatch,

  /// The path names a company that does not exist.
  #[error("company not found")]
  TenantNotFound,

  #[error("not found")]
  NotFound,

  #[error("validation failed: {0}")]
  Validation(FieldErrors),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Map a backend error, surfacing the domain rejections it carries as
  /// 4xx and everything else as a fault.
  pub fn store<E: StoreError>(e: E) -> Self {
    match e.as_core().and_then(Self::expected) {
      Some(api) => api,
      None => ApiError::Store(Box::new(e)),
    }
  }

  fn expected(e: &CoreError) -> Option<Self> {
    Some(match e {
      CoreError::Validation(errors) => ApiError::Validation(errors.clone()),
      CoreError::TenantMismatch(_) => ApiError::TenantMismatch,
      CoreError::CompanyNotFound(_) => ApiError::TenantNotFound,
      CoreError::ApiKeyNotFound(_) => ApiError::NotFound,
      CoreError::DuplicateCompanyName(_)
      | CoreError::DuplicateEmail(_)
      | CoreError::Unsupported { .. } => ApiError::BadRequest(e.to_string()),
      CoreError::Serialization(_) => return None,
    })
  }
}

impl From<CoreError> for ApiError {
  fn from(e: CoreError) -> Self {
    match Self::expected(&e) {
      Some(api) => api,
      None => ApiError::Store(Box::new(e)),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, detail) = match self {
      ApiError::Validation(errors) => {
        return (StatusCode::BAD_REQUEST, Json(errors)).into_response();
      }
      ApiError::Forbidden => (
        StatusCode::FORBIDDEN,
        "Authentication credentials were not provided or are invalid.".to_owned(),
      ),
      ApiError::TenantMismatch => (
        StatusCode::FORBIDDEN,
        "You do not have permission to perform this action.".to_owned(),
      ),
      ApiError::TenantNotFound | ApiError::NotFound => {
        (StatusCode::NOT_FOUND, "Not found.".to_owned())
      }
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_owned())
      }
    };
    (status, Json(json!({ "detail": detail }))).into_response()
  }
}
