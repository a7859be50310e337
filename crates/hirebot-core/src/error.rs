//! Error types for `hirebot-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::validate::FieldErrors;

#[derive(Debug, Error)]
pub enum Error {
  /// The payload failed field-level checks.
  #[error("validation failed: {0}")]
  Validation(FieldErrors),

  /// The tenant named in the request path is not the authenticated tenant.
  #[error("credential is not bound to company {0}")]
  TenantMismatch(Uuid),

  #[error("company not found: {0}")]
  CompanyNotFound(Uuid),

  #[error("company name already taken: {0:?}")]
  DuplicateCompanyName(String),

  #[error("staff email already registered: {0:?}")]
  DuplicateEmail(String),

  #[error("api key not found: {0}")]
  ApiKeyNotFound(Uuid),

  /// The operation is not defined for this kind (e.g. updating an event).
  #[error("{operation} is not supported for {kind}")]
  Unsupported {
    kind:      crate::kind::Kind,
    operation: &'static str,
  },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
