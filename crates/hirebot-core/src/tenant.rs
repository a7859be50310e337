//! The resolved tenant identity threaded through every scoped store call.

use serde::Serialize;
use uuid::Uuid;

use crate::{Error, Result, company::Company};

/// Which credential produced a [`Tenant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "via", rename_all = "snake_case")]
pub enum Principal {
  ApiKey { key_id: Uuid },
  Staff { user_id: Uuid },
}

/// A company identity that a credential has been resolved to.
///
/// Store reads filter on [`Tenant::company_id`] and store writes stamp it;
/// neither ever takes a company id from client input.
#[derive(Debug, Clone, Serialize)]
pub struct Tenant {
  company:   Company,
  principal: Principal,
}

impl Tenant {
  pub fn new(company: Company, principal: Principal) -> Self {
    Self { company, principal }
  }

  pub fn company(&self) -> &Company { &self.company }

  pub fn company_id(&self) -> Uuid { self.company.company_id }

  pub fn principal(&self) -> Principal { self.principal }

  /// The staff user acting, if the credential was a staff login.
  pub fn staff_user_id(&self) -> Option<Uuid> {
    match self.principal {
      Principal::Staff { user_id } => Some(user_id),
      Principal::ApiKey { .. } => None,
    }
  }

  /// Cross-check a company id taken from the request path against the
  /// authenticated company.
  pub fn check_path(&self, path_company_id: Uuid) -> Result<()> {
    if path_company_id == self.company.company_id {
      Ok(())
    } else {
      Err(Error::TenantMismatch(path_company_id))
    }
  }
}
