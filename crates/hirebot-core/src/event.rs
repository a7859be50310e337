//! Chatbot analytics events.
//!
//! Events are strictly append-only: inserted once, never updated, and only
//! removed when their company is deleted. Repeats from the same chatbot
//! session are expected and kept.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, kind::Kind};

// ─── Payload types ───────────────────────────────────────────────────────────

/// A job-search conversation. `Option<bool>` fields are yes/no/unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobsDataValue {
  pub specialism_search: String,
  pub location_search:   String,
  pub role_type_search:  String,
  #[serde(default)]
  pub found_job:         Option<bool>,
  #[serde(default)]
  pub saw_benefits:      Option<bool>,
  #[serde(default)]
  pub saw_company_video: Option<bool>,
  #[serde(default)]
  pub saw_job_video:     Option<bool>,
  #[serde(default)]
  pub add_to_pipeline:   Option<bool>,
  #[serde(default)]
  pub joined_pipeline:   bool,
}

/// A question conversation, including any free-text feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QnsDataValue {
  #[serde(default)]
  pub has_question:     bool,
  #[serde(default)]
  pub search_question:  String,
  #[serde(default)]
  pub question_helpful: Option<bool>,
  #[serde(default)]
  pub wants_reply:      Option<bool>,
  #[serde(default)]
  pub question_left:    String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowsingDataValue {
  #[serde(default)]
  pub is_browsing: bool,
}

// ─── EventValue ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum EventValue {
  JobsData(JobsDataValue),
  QnsData(QnsDataValue),
  BrowsingData(BrowsingDataValue),
}

impl EventValue {
  pub fn kind(&self) -> Kind {
    match self {
      Self::JobsData(_) => Kind::JobsData,
      Self::QnsData(_) => Kind::QnsData,
      Self::BrowsingData(_) => Kind::BrowsingData,
    }
  }

  /// Serialise the inner payload (without the kind tag).
  pub fn to_json(&self) -> Result<serde_json::Value> {
    let full = serde_json::to_value(self)?;
    Ok(full.get("value").cloned().unwrap_or(serde_json::Value::Null))
  }

  pub fn from_parts(kind: Kind, value: serde_json::Value) -> Result<Self> {
    if !kind.is_event() {
      return Err(Error::Unsupported { kind, operation: "event payload" });
    }
    let wrapped = serde_json::json!({ "kind": kind.segment(), "value": value });
    Ok(serde_json::from_value(wrapped)?)
  }
}

// ─── Event ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
  pub event_id:        Uuid,
  pub company_id:      Uuid,
  /// Anonymous chatbot session identifier.
  pub chatbot_user_id: String,
  /// When the conversation happened, as reported by the chatbot.
  pub date_time:       DateTime<Utc>,
  #[serde(flatten)]
  pub value:           EventValue,
  /// Server-assigned insert time.
  pub recorded_at:     DateTime<Utc>,
}

/// Input to [`crate::store::TenantStore::record_event`].
#[derive(Debug, Clone)]
pub struct NewEvent {
  pub chatbot_user_id: String,
  pub date_time:       DateTime<Utc>,
  pub value:           EventValue,
}
