//! The registration table: which kinds are served and which gateway
//! operations each one exposes.
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | `GET`  | `/<kind>/{company_id}` | [`Operation::List`], `?limit=&offset=` |
//! | `POST` | `/<kind>/{company_id}/post` | [`Operation::Create`] |
//! | `GET`  | `/<kind>/{company_id}/{id}` | [`Operation::Get`] |
//! | `PUT`  | `/<kind>/{company_id}/{id}` | [`Operation::Update`] |

use axum::{
  Extension, Router,
  routing::{MethodRouter, get, post, put},
};
use hirebot_core::{kind::Kind, store::TenantStore};

use crate::{AppState, gateway};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
  List,
  Create,
  Get,
  Update,
}

/// One served kind.
#[derive(Debug, Clone, Copy)]
pub struct Registration {
  pub kind:       Kind,
  pub operations: &'static [Operation],
}

const OWNED: &[Operation] = &[Operation::List, Operation::Create, Operation::Get, Operation::Update];

/// Events are append-only: no item routes.
const APPEND_ONLY: &[Operation] = &[Operation::List, Operation::Create];

pub const REGISTRY: &[Registration] = &[
  Registration { kind: Kind::Location, operations: OWNED },
  Registration { kind: Kind::Job, operations: OWNED },
  Registration { kind: Kind::JobMap, operations: OWNED },
  Registration { kind: Kind::Benefit, operations: OWNED },
  Registration { kind: Kind::Question, operations: OWNED },
  Registration { kind: Kind::QuestionTopic, operations: OWNED },
  Registration { kind: Kind::RoleType, operations: OWNED },
  Registration { kind: Kind::CompanyChatbot, operations: OWNED },
  Registration { kind: Kind::JobsData, operations: APPEND_ONLY },
  Registration { kind: Kind::QnsData, operations: APPEND_ONLY },
  Registration { kind: Kind::BrowsingData, operations: APPEND_ONLY },
];

impl Registration {
  pub fn supports(&self, op: Operation) -> bool { self.operations.contains(&op) }

  /// The routes for this kind, relative to its segment. Handlers learn the
  /// kind from the `Extension` layer.
  pub(crate) fn routes<S>(&self) -> Router<AppState<S>>
  where
    S: TenantStore + 'static,
  {
    let mut router = Router::new();

    if self.supports(Operation::List) {
      router = router.route("/{company_id}", get(gateway::list::<S>));
    }
    if self.supports(Operation::Create) {
      router = router.route("/{company_id}/post", post(gateway::create::<S>));
    }

    let mut item: Option<MethodRouter<AppState<S>>> = None;
    if self.supports(Operation::Get) {
      item = Some(get(gateway::get_one::<S>));
    }
    if self.supports(Operation::Update) {
      item = Some(match item {
        Some(m) => m.put(gateway::update::<S>),
        None => put(gateway::update::<S>),
      });
    }
    if let Some(item) = item {
      router = router.route("/{company_id}/{id}", item);
    }

    router.layer(Extension(self.kind))
  }
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator as _;

  use super::*;

  #[test]
  fn every_kind_is_registered_once() {
    for kind in Kind::iter() {
      let count = REGISTRY.iter().filter(|r| r.kind == kind).count();
      assert_eq!(count, 1, "{kind} registered {count} times");
    }
  }

  #[test]
  fn events_have_no_item_routes() {
    for entry in REGISTRY {
      assert!(entry.supports(Operation::List));
      assert!(entry.supports(Operation::Create));
      assert_eq!(entry.supports(Operation::Update), !entry.kind.is_event());
      assert_eq!(entry.supports(Operation::Get), !entry.kind.is_event());
    }
  }
}
