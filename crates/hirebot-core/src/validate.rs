//! Field-level payload validation.
//!
//! Client payloads arrive as loose JSON. Each kind declares its fields in
//! [`fields`]; [`check`] walks the payload against that table and reports
//! every offending field at once, so expected-shape violations never surface
//! as deserialisation faults. Keys not in the table (including any
//! `company`-like key) are ignored.

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{
  Error, Result,
  event::{EventValue, NewEvent},
  kind::Kind,
  resource::ResourceValue,
};

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";
pub const NULL: &str = "This field may not be null.";
pub const NOT_A_STRING: &str = "Not a valid string.";
pub const NOT_A_BOOLEAN: &str = "Must be a valid boolean.";
pub const BAD_DATETIME: &str = "Datetime has wrong format. Use RFC 3339.";
pub const BAD_UUID: &str = "Must be a valid UUID.";
pub const NOT_A_LIST: &str = "Expected a list of items.";
pub const NOT_AN_OBJECT: &str = "Invalid data. Expected a JSON object.";
pub const UNKNOWN_REFERENCE: &str = "Invalid id - object does not exist.";

/// Key used for errors not tied to one field.
pub const NON_FIELD: &str = "non_field_errors";

// ─── FieldErrors ─────────────────────────────────────────────────────────────

/// Offending field name → reasons. Serialises as a plain JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
  pub fn new() -> Self { Self::default() }

  pub fn single(field: &str, reason: &str) -> Self {
    let mut errors = Self::new();
    errors.add(field, reason);
    errors
  }

  pub fn add(&mut self, field: &str, reason: &str) {
    let reasons = self.0.entry(field.to_owned()).or_default();
    if !reasons.iter().any(|r| r == reason) {
      reasons.push(reason.to_owned());
    }
  }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn get(&self, field: &str) -> Option<&[String]> {
    self.0.get(field).map(Vec::as_slice)
  }

  pub fn fields(&self) -> impl Iterator<Item = &str> {
    self.0.keys().map(String::as_str)
  }

  fn into_result(self) -> Result<()> {
    if self.is_empty() { Ok(()) } else { Err(Error::Validation(self)) }
  }
}

impl fmt::Display for FieldErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let fields: Vec<&str> = self.fields().collect();
    write!(f, "invalid fields: {}", fields.join(", "))
  }
}

// ─── Field tables ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
  /// A string; `max` characters when set.
  Text { max: Option<usize> },
  Bool,
  /// `true`, `false` or `null`.
  TriState,
  DateTime,
  Id,
  IdList,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
  pub name:     &'static str,
  pub ty:       FieldType,
  /// Required fields must be present, non-null and, for text, non-blank.
  pub required: bool,
}

const fn text(name: &'static str, max: usize, required: bool) -> FieldSpec {
  FieldSpec { name, ty: FieldType::Text { max: Some(max) }, required }
}

const fn long_text(name: &'static str, required: bool) -> FieldSpec {
  FieldSpec { name, ty: FieldType::Text { max: None }, required }
}

const fn of(name: &'static str, ty: FieldType) -> FieldSpec {
  FieldSpec { name, ty, required: false }
}

const LOCATION: &[FieldSpec] = &[
  text("street_address", 255, false),
  text("city", 100, true),
  text("country", 100, true),
  text("post_code", 20, false),
];

const JOB: &[FieldSpec] = &[
  text("title", 255, true),
  of("location_id", FieldType::Id),
  of("role_type_id", FieldType::Id),
  of("specialism_ids", FieldType::IdList),
  text("description_url", 255, false),
  text("apply_url", 255, true),
  text("video_url", 255, false),
  long_text("intro", false),
];

const JOB_MAP: &[FieldSpec] = &[
  text("specialism", 60, true),
  text("category_one", 100, true),
  text("category_two", 100, false),
];

const BENEFIT: &[FieldSpec] = &[
  text("title", 255, true),
  long_text("blurb", false),
  text("icon_url", 255, false),
  text("benefits_url", 255, false),
  text("benefits_message", 255, false),
];

const QUESTION: &[FieldSpec] = &[
  text("question", 255, true),
  long_text("answer", true),
  of("topic_id", FieldType::Id),
];

const QUESTION_TOPIC: &[FieldSpec] = &[text("topic", 100, true)];

const ROLE_TYPE: &[FieldSpec] = &[text("role_type", 100, true)];

const COMPANY_CHATBOT: &[FieldSpec] = &[
  text("career_site_url", 255, true),
  text("privacy_notice_url", 255, true),
  long_text("next_steps", false),
  text("company_video_url", 255, false),
  text("talent_email", 255, true),
];

/// Fields shared by every event kind.
const EVENT_COMMON: &[FieldSpec] = &[
  text("chatbot_user_id", 60, true),
  FieldSpec { name: "date_time", ty: FieldType::DateTime, required: true },
];

const JOBS_DATA: &[FieldSpec] = &[
  text("specialism_search", 100, true),
  text("location_search", 60, true),
  text("role_type_search", 100, true),
  of("found_job", FieldType::TriState),
  of("saw_benefits", FieldType::TriState),
  of("saw_company_video", FieldType::TriState),
  of("saw_job_video", FieldType::TriState),
  of("add_to_pipeline", FieldType::TriState),
  of("joined_pipeline", FieldType::Bool),
];

const QNS_DATA: &[FieldSpec] = &[
  of("has_question", FieldType::Bool),
  text("search_question", 100, false),
  of("question_helpful", FieldType::TriState),
  of("wants_reply", FieldType::TriState),
  long_text("question_left", false),
];

const BROWSING_DATA: &[FieldSpec] = &[of("is_browsing", FieldType::Bool)];

const ACTIVE: FieldSpec = FieldSpec { name: "active", ty: FieldType::Bool, required: false };

/// The kind-specific fields of `kind`. Event kinds additionally carry
/// the common event fields, checked by [`check`].
pub fn fields(kind: Kind) -> &'static [FieldSpec] {
  match kind {
    Kind::Location => LOCATION,
    Kind::Job => JOB,
    Kind::JobMap => JOB_MAP,
    Kind::Benefit => BENEFIT,
    Kind::Question => QUESTION,
    Kind::QuestionTopic => QUESTION_TOPIC,
    Kind::RoleType => ROLE_TYPE,
    Kind::CompanyChatbot => COMPANY_CHATBOT,
    Kind::JobsData => JOBS_DATA,
    Kind::QnsData => QNS_DATA,
    Kind::BrowsingData => BROWSING_DATA,
  }
}

// ─── Checking ────────────────────────────────────────────────────────────────

/// Check `payload` against every field declared for `kind`.
pub fn check(kind: Kind, payload: &Value) -> Result<()> {
  let Some(object) = payload.as_object() else {
    return Err(Error::Validation(FieldErrors::single(NON_FIELD, NOT_AN_OBJECT)));
  };

  let mut errors = FieldErrors::new();
  if kind.is_event() {
    check_fields(EVENT_COMMON, object, &mut errors);
  }
  check_fields(fields(kind), object, &mut errors);
  if kind.is_publishable() {
    check_fields(&[ACTIVE], object, &mut errors);
  }
  errors.into_result()
}

fn check_fields(specs: &[FieldSpec], object: &Map<String, Value>, errors: &mut FieldErrors) {
  for spec in specs {
    if let Some(reason) = check_field(spec, object.get(spec.name)) {
      errors.add(spec.name, reason);
    }
  }
}

fn check_field(spec: &FieldSpec, value: Option<&Value>) -> Option<&'static str> {
  let value = match value {
    None if spec.required => return Some(REQUIRED),
    None => return None,
    Some(Value::Null) if spec.ty == FieldType::TriState => return None,
    Some(Value::Null) if spec.required || spec.ty == FieldType::Bool => {
      return Some(NULL);
    }
    Some(Value::Null) => return None,
    Some(v) => v,
  };

  match spec.ty {
    FieldType::Text { max } => {
      let Some(s) = value.as_str() else { return Some(NOT_A_STRING) };
      if spec.required && s.trim().is_empty() {
        return Some(BLANK);
      }
      match max {
        Some(max) if s.chars().count() > max => Some(too_long(max)),
        _ => None,
      }
    }
    FieldType::Bool | FieldType::TriState => {
      (!value.is_boolean()).then_some(NOT_A_BOOLEAN)
    }
    FieldType::DateTime => match value.as_str() {
      Some(s) if s.trim().is_empty() && spec.required => Some(BLANK),
      Some(s) if DateTime::parse_from_rfc3339(s).is_ok() => None,
      _ => Some(BAD_DATETIME),
    },
    FieldType::Id => match value.as_str() {
      Some(s) if Uuid::parse_str(s).is_ok() => None,
      _ => Some(BAD_UUID),
    },
    FieldType::IdList => match value.as_array() {
      None => Some(NOT_A_LIST),
      Some(items) => items
        .iter()
        .any(|v| v.as_str().and_then(|s| Uuid::parse_str(s).ok()).is_none())
        .then_some(BAD_UUID),
    },
  }
}

/// Max-length messages, interned per limit used in the tables above.
fn too_long(max: usize) -> &'static str {
  match max {
    20 => "Ensure this field has no more than 20 characters.",
    60 => "Ensure this field has no more than 60 characters.",
    100 => "Ensure this field has no more than 100 characters.",
    _ => "Ensure this field has no more than 255 characters.",
  }
}

// ─── Parsing ─────────────────────────────────────────────────────────────────

/// A validated resource payload plus its requested `active` flag.
#[derive(Debug, Clone)]
pub struct ResourceDraft {
  pub value:  ResourceValue,
  /// `None` when the payload did not mention `active`.
  pub active: Option<bool>,
}

/// Validate and type a resource payload for an owned `kind`.
pub fn resource_draft(kind: Kind, payload: &Value) -> Result<ResourceDraft> {
  if kind.is_event() {
    return Err(Error::Unsupported { kind, operation: "resource payload" });
  }
  check(kind, payload)?;

  let value = ResourceValue::from_parts(kind, without_nulls(payload))?;
  let active = if kind.is_publishable() {
    payload.get("active").and_then(Value::as_bool)
  } else {
    None
  };
  Ok(ResourceDraft { value, active })
}

/// Drop explicit nulls so optional fields fall back to their defaults.
fn without_nulls(payload: &Value) -> Value {
  match payload {
    Value::Object(object) => Value::Object(
      object
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect(),
    ),
    other => other.clone(),
  }
}

/// Validate and type an event payload for an event `kind`.
pub fn new_event(kind: Kind, payload: &Value) -> Result<NewEvent> {
  if !kind.is_event() {
    return Err(Error::Unsupported { kind, operation: "event payload" });
  }
  check(kind, payload)?;

  let chatbot_user_id = payload
    .get("chatbot_user_id")
    .and_then(Value::as_str)
    .unwrap_or_default()
    .to_owned();
  let date_time = payload
    .get("date_time")
    .and_then(Value::as_str)
    .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
    .map(|dt| dt.with_timezone(&Utc))
    .ok_or_else(|| Error::Validation(FieldErrors::single("date_time", BAD_DATETIME)))?;

  let value = EventValue::from_parts(kind, without_nulls(payload))?;
  Ok(NewEvent { chatbot_user_id, date_time, value })
}

#[cfg(test)]
mod tests {
  use serde_json::json;
  use strum::IntoEnumIterator;

  use super::*;
  use crate::resource::BenefitValue;

  fn field_errors(result: Result<impl std::fmt::Debug>) -> FieldErrors {
    match result {
      Err(Error::Validation(errors)) => errors,
      other => panic!("expected validation failure, got {other:?}"),
    }
  }

  #[test]
  fn missing_and_blank_required_fields_are_reported_together() {
    let errors = field_errors(resource_draft(
      Kind::Location,
      &json!({ "city": "  ", "post_code": "123-4444" }),
    ));
    assert_eq!(errors.get("city"), Some(&[BLANK.to_owned()][..]));
    assert_eq!(errors.get("country"), Some(&[REQUIRED.to_owned()][..]));
    assert!(errors.get("post_code").is_none());
  }

  #[test]
  fn empty_date_time_is_rejected() {
    let errors = field_errors(new_event(
      Kind::QnsData,
      &json!({ "chatbot_user_id": "abc123-3", "date_time": "" }),
    ));
    assert!(errors.get("date_time").is_some());
  }

  #[test]
  fn malformed_date_time_is_rejected() {
    let errors = field_errors(new_event(
      Kind::BrowsingData,
      &json!({ "chatbot_user_id": "abc123-3", "date_time": "yesterday" }),
    ));
    assert_eq!(errors.get("date_time"), Some(&[BAD_DATETIME.to_owned()][..]));
  }

  #[test]
  fn wrong_types_are_reported() {
    let errors = field_errors(new_event(
      Kind::JobsData,
      &json!({
        "chatbot_user_id": 42,
        "date_time": "2019-12-03T12:34:56Z",
        "specialism_search": "Engineering",
        "location_search": "London",
        "role_type_search": "Leader",
        "found_job": "maybe",
        "joined_pipeline": null,
      }),
    ));
    assert_eq!(errors.get("chatbot_user_id"), Some(&[NOT_A_STRING.to_owned()][..]));
    assert_eq!(errors.get("found_job"), Some(&[NOT_A_BOOLEAN.to_owned()][..]));
    assert_eq!(errors.get("joined_pipeline"), Some(&[NULL.to_owned()][..]));
  }

  #[test]
  fn tri_state_accepts_null() {
    let ev = new_event(
      Kind::JobsData,
      &json!({
        "chatbot_user_id": "abc123",
        "date_time": "2019-12-03T12:34:56Z",
        "specialism_search": "Engineering",
        "location_search": "London",
        "role_type_search": "Leader",
        "found_job": null,
        "saw_benefits": true,
      }),
    )
    .unwrap();
    match ev.value {
      EventValue::JobsData(v) => {
        assert_eq!(v.found_job, None);
        assert_eq!(v.saw_benefits, Some(true));
        assert!(!v.joined_pipeline);
      }
      other => panic!("unexpected value {other:?}"),
    }
  }

  #[test]
  fn null_optional_text_falls_back_to_default() {
    let draft = resource_draft(
      Kind::Location,
      &json!({ "city": "Oakland", "country": "United States", "post_code": null }),
    )
    .unwrap();
    assert!(matches!(draft.value, ResourceValue::Location(ref l) if l.post_code.is_empty()));
  }

  #[test]
  fn overlong_text_is_rejected() {
    let errors = field_errors(new_event(
      Kind::BrowsingData,
      &json!({ "chatbot_user_id": "x".repeat(61), "date_time": "2019-12-03T12:34:56Z" }),
    ));
    assert_eq!(
      errors.get("chatbot_user_id"),
      Some(&["Ensure this field has no more than 60 characters.".to_owned()][..])
    );
  }

  #[test]
  fn bad_reference_ids_are_rejected() {
    let errors = field_errors(resource_draft(
      Kind::Job,
      &json!({
        "title": "Engineer",
        "apply_url": "https://x/apply",
        "location_id": "not-a-uuid",
        "specialism_ids": [Uuid::new_v4().to_string(), 7],
      }),
    ));
    assert_eq!(errors.get("location_id"), Some(&[BAD_UUID.to_owned()][..]));
    assert_eq!(errors.get("specialism_ids"), Some(&[BAD_UUID.to_owned()][..]));
  }

  #[test]
  fn active_flag_only_read_for_publishable_kinds() {
    let benefit = resource_draft(
      Kind::Benefit,
      &json!({ "title": "Parental Leave", "active": true }),
    )
    .unwrap();
    assert_eq!(benefit.active, Some(true));
    assert_eq!(
      benefit.value,
      ResourceValue::Benefit(BenefitValue {
        title:            "Parental Leave".into(),
        blurb:            String::new(),
        icon_url:         String::new(),
        benefits_url:     String::new(),
        benefits_message: String::new(),
      })
    );

    let topic = resource_draft(Kind::QuestionTopic, &json!({ "topic": "Perks", "active": true }))
      .unwrap();
    assert_eq!(topic.active, None);
  }

  #[test]
  fn active_must_be_boolean() {
    let errors = field_errors(resource_draft(
      Kind::Benefit,
      &json!({ "title": "Parental Leave", "active": "yes" }),
    ));
    assert_eq!(errors.get("active"), Some(&[NOT_A_BOOLEAN.to_owned()][..]));
  }

  #[test]
  fn non_object_payload_is_rejected() {
    let errors = field_errors(resource_draft(Kind::RoleType, &json!(["Leader"])));
    assert_eq!(errors.get(NON_FIELD), Some(&[NOT_AN_OBJECT.to_owned()][..]));
  }

  #[test]
  fn every_kind_declares_a_required_field() {
    for kind in Kind::iter().filter(|k| !k.is_event()) {
      assert!(fields(kind).iter().any(|f| f.required), "{kind} has no required field");
    }
  }

  #[test]
  fn wrong_class_is_unsupported() {
    assert!(matches!(
      resource_draft(Kind::QnsData, &json!({})),
      Err(Error::Unsupported { .. })
    ));
    assert!(matches!(new_event(Kind::Job, &json!({})), Err(Error::Unsupported { .. })));
  }
}
