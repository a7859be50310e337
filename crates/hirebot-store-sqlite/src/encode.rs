//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. UUIDs are stored as
//! hyphenated lowercase strings. Resource and event payloads are stored as
//! compact JSON next to their kind discriminant.

use std::str::FromStr as _;

use chrono::{DateTime, Utc};
use hirebot_core::{
  company::{Company, StaffUser},
  credential::ApiKey,
  event::{Event, EventValue},
  kind::Kind,
  resource::{Resource, ResourceValue},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

pub fn decode_kind(s: &str) -> Result<Kind> {
  Kind::from_str(s).map_err(|_| Error::Decode(format!("unknown kind: {s:?}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `companies` row.
pub struct RawCompany {
  pub company_id:   String,
  pub company_name: String,
  pub is_active:    bool,
  pub created_at:   String,
}

impl RawCompany {
  pub const COLUMNS: &'static str = "company_id, company_name, is_active, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      company_id:   row.get(0)?,
      company_name: row.get(1)?,
      is_active:    row.get(2)?,
      created_at:   row.get(3)?,
    })
  }

  pub fn into_company(self) -> Result<Company> {
    Ok(Company {
      company_id:   decode_uuid(&self.company_id)?,
      company_name: self.company_name,
      is_active:    self.is_active,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from an `api_keys` row.
pub struct RawApiKey {
  pub key_id:     String,
  pub company_id: String,
  pub name:       String,
  pub prefix:     String,
  pub key_hash:   String,
  pub revoked:    bool,
  pub created_at: String,
}

impl RawApiKey {
  pub const COLUMNS: &'static str =
    "key_id, company_id, name, prefix, key_hash, revoked, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      key_id:     row.get(0)?,
      company_id: row.get(1)?,
      name:       row.get(2)?,
      prefix:     row.get(3)?,
      key_hash:   row.get(4)?,
      revoked:    row.get(5)?,
      created_at: row.get(6)?,
    })
  }

  pub fn into_api_key(self) -> Result<ApiKey> {
    Ok(ApiKey {
      key_id:     decode_uuid(&self.key_id)?,
      company_id: decode_uuid(&self.company_id)?,
      name:       self.name,
      prefix:     self.prefix,
      key_hash:   self.key_hash,
      revoked:    self.revoked,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `staff_users` row.
pub struct RawStaffUser {
  pub user_id:       String,
  pub company_id:    String,
  pub email:         String,
  pub name:          String,
  pub password_hash: String,
  pub is_active:     bool,
  pub created_at:    String,
}

impl RawStaffUser {
  pub const COLUMNS: &'static str =
    "user_id, company_id, email, name, password_hash, is_active, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:       row.get(0)?,
      company_id:    row.get(1)?,
      email:         row.get(2)?,
      name:          row.get(3)?,
      password_hash: row.get(4)?,
      is_active:     row.get(5)?,
      created_at:    row.get(6)?,
    })
  }

  pub fn into_staff_user(self) -> Result<StaffUser> {
    Ok(StaffUser {
      user_id:       decode_uuid(&self.user_id)?,
      company_id:    decode_uuid(&self.company_id)?,
      email:         self.email,
      name:          self.name,
      password_hash: self.password_hash,
      is_active:     self.is_active,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `resources` row.
pub struct RawResource {
  pub resource_id: String,
  pub company_id:  String,
  pub kind:        String,
  pub active:      Option<bool>,
  pub body_json:   String,
  pub created_by:  Option<String>,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawResource {
  pub const COLUMNS: &'static str =
    "resource_id, company_id, kind, active, body_json, created_by, created_at, updated_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      resource_id: row.get(0)?,
      company_id:  row.get(1)?,
      kind:        row.get(2)?,
      active:      row.get(3)?,
      body_json:   row.get(4)?,
      created_by:  row.get(5)?,
      created_at:  row.get(6)?,
      updated_at:  row.get(7)?,
    })
  }

  pub fn into_resource(self) -> Result<Resource> {
    let kind = decode_kind(&self.kind)?;
    let body: serde_json::Value = serde_json::from_str(&self.body_json)?;

    Ok(Resource {
      resource_id: decode_uuid(&self.resource_id)?,
      company_id:  decode_uuid(&self.company_id)?,
      created_by:  self.created_by.as_deref().map(decode_uuid).transpose()?,
      active:      self.active,
      value:       ResourceValue::from_parts(kind, body)?,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from an `events` row.
pub struct RawEvent {
  pub event_id:        String,
  pub company_id:      String,
  pub kind:            String,
  pub chatbot_user_id: String,
  pub date_time:       String,
  pub body_json:       String,
  pub recorded_at:     String,
}

impl RawEvent {
  pub const COLUMNS: &'static str =
    "event_id, company_id, kind, chatbot_user_id, date_time, body_json, recorded_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:        row.get(0)?,
      company_id:      row.get(1)?,
      kind:            row.get(2)?,
      chatbot_user_id: row.get(3)?,
      date_time:       row.get(4)?,
      body_json:       row.get(5)?,
      recorded_at:     row.get(6)?,
    })
  }

  pub fn into_event(self) -> Result<Event> {
    let kind = decode_kind(&self.kind)?;
    let body: serde_json::Value = serde_json::from_str(&self.body_json)?;

    Ok(Event {
      event_id:        decode_uuid(&self.event_id)?,
      company_id:      decode_uuid(&self.company_id)?,
      chatbot_user_id: self.chatbot_user_id,
      date_time:       decode_dt(&self.date_time)?,
      value:           EventValue::from_parts(kind, body)?,
      recorded_at:     decode_dt(&self.recorded_at)?,
    })
  }
}
