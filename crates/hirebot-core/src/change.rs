//! Minimal change notifications for external subscribers.
//!
//! Subscribers learn *that* something changed and re-read it through the
//! scoped API.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::kind::Kind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Change {
  Created,
  Updated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
  pub kind:        Kind,
  pub resource_id: Uuid,
  pub company_id:  Uuid,
  pub change:      Change,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn wire_shape() {
    let ev = ChangeEvent {
      kind:        Kind::Benefit,
      resource_id: Uuid::nil(),
      company_id:  Uuid::nil(),
      change:      Change::Created,
    };
    let json = serde_json::to_value(ev).unwrap();
    assert_eq!(json["kind"], "benefit");
    assert_eq!(json["change"], "created");
    assert_eq!(json.as_object().unwrap().len(), 4);
  }
}
