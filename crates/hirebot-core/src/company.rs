//! Company, the tenant root, and the staff users provisioned against it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The unit of data isolation. Every other row references exactly one
/// company and is deleted with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
  pub company_id:   Uuid,
  /// Globally unique display name.
  pub company_name: String,
  /// Inactive companies cannot authenticate.
  pub is_active:    bool,
  pub created_at:   DateTime<Utc>,
}

/// A member of a company's staff. Authenticates with email and password and
/// acts only within the company it was provisioned against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffUser {
  pub user_id:       Uuid,
  pub company_id:    Uuid,
  /// Domain part stored lowercased; see [`normalize_email`].
  pub email:         String,
  pub name:          String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub is_active:     bool,
  pub created_at:    DateTime<Utc>,
}

/// Input to [`crate::store::TenantStore::add_staff_user`].
#[derive(Debug, Clone)]
pub struct NewStaffUser {
  pub company_id:    Uuid,
  pub email:         String,
  pub name:          String,
  pub password_hash: String,
}

/// Lowercase the domain part of an email address, leaving the local part
/// as typed.
pub fn normalize_email(email: &str) -> String {
  match email.trim().rsplit_once('@') {
    Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
    None => email.trim().to_owned(),
  }
}
