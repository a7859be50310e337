//! Owned resources: the staff-maintained content a company's chatbot serves.
//!
//! Each resource row carries a kind discriminant plus a JSON payload, the
//! mandatory company reference, and for publishable kinds an `active` flag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  change::{Change, ChangeEvent},
  kind::Kind,
};

// ─── Payload types ───────────────────────────────────────────────────────────

/// An office or site where jobs are based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationValue {
  #[serde(default)]
  pub street_address: String,
  pub city:           String,
  pub country:        String,
  #[serde(default)]
  pub post_code:      String,
}

/// A job posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobValue {
  pub title:           String,
  /// A [`Kind::Location`] of the same company.
  #[serde(default)]
  pub location_id:     Option<Uuid>,
  /// A [`Kind::RoleType`] of the same company.
  #[serde(default)]
  pub role_type_id:    Option<Uuid>,
  /// [`Kind::JobMap`] entries of the same company.
  #[serde(default)]
  pub specialism_ids:  Vec<Uuid>,
  #[serde(default)]
  pub description_url: String,
  pub apply_url:       String,
  #[serde(default)]
  pub video_url:       String,
  #[serde(default)]
  pub intro:           String,
}

/// Maps a specialism to the categories the chatbot groups jobs under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMapValue {
  pub specialism:   String,
  pub category_one: String,
  #[serde(default)]
  pub category_two: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenefitValue {
  pub title:            String,
  #[serde(default)]
  pub blurb:            String,
  #[serde(default)]
  pub icon_url:         String,
  #[serde(default)]
  pub benefits_url:     String,
  #[serde(default)]
  pub benefits_message: String,
}

/// A FAQ entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionValue {
  pub question: String,
  pub answer:   String,
  /// A [`Kind::QuestionTopic`] of the same company.
  #[serde(default)]
  pub topic_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionTopicValue {
  pub topic: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleTypeValue {
  pub role_type: String,
}

/// Company-wide settings the chatbot shows to candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyChatbotValue {
  pub career_site_url:    String,
  pub privacy_notice_url: String,
  #[serde(default)]
  pub next_steps:         String,
  #[serde(default)]
  pub company_video_url:  String,
  pub talent_email:       String,
}

// ─── ResourceValue ───────────────────────────────────────────────────────────

/// The typed payload of a resource. The variant name is the [`Kind`] stored
/// in the `kind` column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ResourceValue {
  Location(LocationValue),
  Job(JobValue),
  JobMap(JobMapValue),
  Benefit(BenefitValue),
  Question(QuestionValue),
  QuestionTopic(QuestionTopicValue),
  RoleType(RoleTypeValue),
  CompanyChatbot(CompanyChatbotValue),
}

/// A payload field pointing at another resource of the same tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
  pub field: &'static str,
  pub kind:  Kind,
  pub id:    Uuid,
}

impl ResourceValue {
  pub fn kind(&self) -> Kind {
    match self {
      Self::Location(_) => Kind::Location,
      Self::Job(_) => Kind::Job,
      Self::JobMap(_) => Kind::JobMap,
      Self::Benefit(_) => Kind::Benefit,
      Self::Question(_) => Kind::Question,
      Self::QuestionTopic(_) => Kind::QuestionTopic,
      Self::RoleType(_) => Kind::RoleType,
      Self::CompanyChatbot(_) => Kind::CompanyChatbot,
    }
  }

  /// Serialise the inner payload (without the kind tag) for the `body_json`
  /// database column.
  pub fn to_json(&self) -> Result<serde_json::Value> {
    let full = serde_json::to_value(self)?;
    Ok(full.get("value").cloned().unwrap_or(serde_json::Value::Null))
  }

  /// Rebuild from a kind and its untagged JSON payload.
  pub fn from_parts(kind: Kind, value: serde_json::Value) -> Result<Self> {
    if kind.is_event() {
      return Err(Error::Unsupported { kind, operation: "resource payload" });
    }
    let wrapped = serde_json::json!({ "kind": kind.segment(), "value": value });
    Ok(serde_json::from_value(wrapped)?)
  }

  /// Every id this payload links to; all must belong to the writing tenant.
  pub fn references(&self) -> Vec<Reference> {
    match self {
      Self::Job(job) => {
        let mut refs = Vec::new();
        if let Some(id) = job.location_id {
          refs.push(Reference { field: "location_id", kind: Kind::Location, id });
        }
        if let Some(id) = job.role_type_id {
          refs.push(Reference { field: "role_type_id", kind: Kind::RoleType, id });
        }
        refs.extend(job.specialism_ids.iter().map(|&id| Reference {
          field: "specialism_ids",
          kind: Kind::JobMap,
          id,
        }));
        refs
      }
      Self::Question(q) => q
        .topic_id
        .map(|id| Reference { field: "topic_id", kind: Kind::QuestionTopic, id })
        .into_iter()
        .collect(),
      _ => Vec::new(),
    }
  }
}

// ─── Resource ────────────────────────────────────────────────────────────────

/// A persisted resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
  pub resource_id: Uuid,
  pub company_id:  Uuid,
  /// Staff user who created the resource; `None` when written with an API key.
  pub created_by:  Option<Uuid>,
  /// Present only for publishable kinds.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub active:      Option<bool>,
  #[serde(flatten)]
  pub value:       ResourceValue,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

impl Resource {
  pub fn kind(&self) -> Kind { self.value.kind() }

  /// Whether chatbot consumers may see this resource.
  pub fn is_visible(&self) -> bool {
    !self.kind().is_publishable() || self.active == Some(true)
  }

  /// The notification for a mutation of this resource, if its kind emits
  /// one.
  pub fn change_event(&self, change: Change) -> Option<ChangeEvent> {
    self.kind().emits_changes().then(|| ChangeEvent {
      kind: self.kind(),
      resource_id: self.resource_id,
      company_id: self.company_id,
      change,
    })
  }
}

// ─── Writes ──────────────────────────────────────────────────────────────────

/// Input to [`crate::store::TenantStore::create_resource`]. The company and
/// creating user are taken from the tenant, never from here.
#[derive(Debug, Clone)]
pub struct NewResource {
  pub value:  ResourceValue,
  /// Ignored for kinds that are not publishable.
  pub active: bool,
}

impl NewResource {
  /// A draft: publishable kinds start hidden.
  pub fn new(value: ResourceValue) -> Self { Self { value, active: false } }

  pub fn published(value: ResourceValue) -> Self { Self { value, active: true } }
}

/// Input to [`crate::store::TenantStore::update_resource`]. Replaces the
/// payload; `active: None` keeps the current flag.
#[derive(Debug, Clone)]
pub struct ResourceUpdate {
  pub value:  ResourceValue,
  pub active: Option<bool>,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn job(location_id: Option<Uuid>, specialism_ids: Vec<Uuid>) -> ResourceValue {
    ResourceValue::Job(JobValue {
      title: "Front End Engineer".into(),
      location_id,
      role_type_id: None,
      specialism_ids,
      description_url: "http://www.piedpiper.com/job/23".into(),
      apply_url: "http://www.piedpiper.com/job/23/apply".into(),
      video_url: String::new(),
      intro: String::new(),
    })
  }

  #[test]
  fn parts_roundtrip() {
    let v = job(Some(Uuid::new_v4()), vec![]);
    let json = v.to_json().unwrap();
    assert!(json.get("kind").is_none());
    assert_eq!(ResourceValue::from_parts(Kind::Job, json).unwrap(), v);
  }

  #[test]
  fn event_kinds_have_no_resource_payload() {
    let err = ResourceValue::from_parts(Kind::JobsData, serde_json::json!({})).unwrap_err();
    assert!(matches!(err, Error::Unsupported { kind: Kind::JobsData, .. }));
  }

  #[test]
  fn job_references_cover_every_link() {
    let loc = Uuid::new_v4();
    let maps = vec![Uuid::new_v4(), Uuid::new_v4()];
    let refs = job(Some(loc), maps.clone()).references();

    assert_eq!(refs.len(), 3);
    assert_eq!(refs[0], Reference { field: "location_id", kind: Kind::Location, id: loc });
    assert!(refs[1..].iter().all(|r| r.kind == Kind::JobMap));
  }

  #[test]
  fn only_emitting_kinds_produce_change_events() {
    let now = Utc::now();
    let mut r = Resource {
      resource_id: Uuid::new_v4(),
      company_id:  Uuid::new_v4(),
      created_by:  None,
      active:      None,
      value:       ResourceValue::RoleType(RoleTypeValue { role_type: "Leader".into() }),
      created_at:  now,
      updated_at:  now,
    };
    assert!(r.change_event(Change::Created).is_none());

    r.value = ResourceValue::Location(LocationValue {
      street_address: String::new(),
      city:           "Oakland".into(),
      country:        "United States".into(),
      post_code:      String::new(),
    });
    let ev = r.change_event(Change::Updated).unwrap();
    assert_eq!(ev.kind, Kind::Location);
    assert_eq!(ev.resource_id, r.resource_id);
  }

  #[test]
  fn publishable_resources_hidden_until_active() {
    let now = Utc::now();
    let mut r = Resource {
      resource_id: Uuid::new_v4(),
      company_id:  Uuid::new_v4(),
      created_by:  None,
      active:      Some(false),
      value:       job(None, vec![]),
      created_at:  now,
      updated_at:  now,
    };
    assert!(!r.is_visible());
    r.active = Some(true);
    assert!(r.is_visible());
  }
}
