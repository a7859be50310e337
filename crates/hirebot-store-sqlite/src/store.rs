//! [`SqliteStore`], the SQLite implementation of [`TenantStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{ErrorCode, OptionalExtension as _};
use uuid::Uuid;

use hirebot_core::{
  Error as CoreError,
  company::{Company, NewStaffUser, StaffUser, normalize_email},
  credential::{ApiKey, IssuedKey, generate_key, hash_key},
  event::{Event, NewEvent},
  kind::Kind,
  resource::{NewResource, Resource, ResourceUpdate, ResourceValue},
  store::{ListQuery, TenantStore, Visibility},
  tenant::{Principal, Tenant},
  validate::{BLANK, FieldErrors, UNKNOWN_REFERENCE},
};

use crate::{
  Error, Result,
  encode::{
    RawApiKey, RawCompany, RawEvent, RawResource, RawStaffUser, decode_uuid, encode_dt,
    encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, _) if f.code == ErrorCode::ConstraintViolation
  )
}

/// A payload reference, encoded for binding inside a connection closure.
struct BoundRef {
  field: &'static str,
  id:    String,
  kind:  &'static str,
}

fn bound_refs(value: &ResourceValue) -> Vec<BoundRef> {
  value
    .references()
    .into_iter()
    .map(|r| BoundRef { field: r.field, id: encode_uuid(r.id), kind: r.kind.segment() })
    .collect()
}

/// Fields whose referenced id is not a resource of the expected kind owned
/// by `company_id`.
fn unowned_references(
  conn:       &rusqlite::Connection,
  company_id: &str,
  refs:       &[BoundRef],
) -> rusqlite::Result<Vec<&'static str>> {
  let mut stmt = conn.prepare_cached(
    "SELECT 1 FROM resources WHERE resource_id = ?1 AND company_id = ?2 AND kind = ?3",
  )?;
  let mut unowned = Vec::new();
  for r in refs {
    if !stmt.exists(rusqlite::params![r.id, company_id, r.kind])? {
      unowned.push(r.field);
    }
  }
  Ok(unowned)
}

/// Outcome of a guarded write run inside a connection closure.
enum Guarded<T> {
  Written(T),
  Unowned(Vec<&'static str>),
}

impl<T> Guarded<T> {
  fn into_result(self) -> Result<T> {
    match self {
      Self::Written(t) => Ok(t),
      Self::Unowned(fields) => {
        let mut errors = FieldErrors::new();
        for field in fields {
          errors.add(field, UNKNOWN_REFERENCE);
        }
        Err(CoreError::Validation(errors).into())
      }
    }
  }
}

fn sql_limit(query: &ListQuery) -> (i64, i64) {
  // A negative LIMIT means no limit in SQLite.
  let limit = query.limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
  let offset = query.offset.map_or(0, |o| i64::try_from(o).unwrap_or(i64::MAX));
  (limit, offset)
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A hirebot store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn require_company(&self, company_id: Uuid) -> Result<Company> {
    self
      .get_company(company_id)
      .await?
      .ok_or(Error::Core(CoreError::CompanyNotFound(company_id)))
  }
}

// ─── TenantStore impl ────────────────────────────────────────────────────────

impl TenantStore for SqliteStore {
  type Error = Error;

  // ── Companies ─────────────────────────────────────────────────────────────

  async fn add_company(&self, company_name: &str) -> Result<Company> {
    if company_name.trim().is_empty() {
      return Err(CoreError::Validation(FieldErrors::single("company_name", BLANK)).into());
    }

    let company = Company {
      company_id:   Uuid::new_v4(),
      company_name: company_name.to_owned(),
      is_active:    true,
      created_at:   Utc::now(),
    };

    let id_str   = encode_uuid(company.company_id);
    let name_str = company.company_name.clone();
    let at_str   = encode_dt(company.created_at);

    let inserted = self
      .conn
      .call(move |conn| {
        match conn.execute(
          "INSERT INTO companies (company_id, company_name, is_active, created_at)
           VALUES (?1, ?2, 1, ?3)",
          rusqlite::params![id_str, name_str, at_str],
        ) {
          Ok(_) => Ok(true),
          Err(e) if is_constraint_violation(&e) => Ok(false),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    if !inserted {
      return Err(CoreError::DuplicateCompanyName(company.company_name).into());
    }
    Ok(company)
  }

  async fn get_company(&self, company_id: Uuid) -> Result<Option<Company>> {
    let id_str = encode_uuid(company_id);

    let raw: Option<RawCompany> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM companies WHERE company_id = ?1", RawCompany::COLUMNS),
              rusqlite::params![id_str],
              RawCompany::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCompany::into_company).transpose()
  }

  async fn list_companies(&self) -> Result<Vec<Company>> {
    let raws: Vec<RawCompany> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM companies ORDER BY company_name",
          RawCompany::COLUMNS
        ))?;
        let rows = stmt
          .query_map([], RawCompany::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCompany::into_company).collect()
  }

  async fn set_company_active(&self, company_id: Uuid, is_active: bool) -> Result<Company> {
    let id_str = encode_uuid(company_id);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE companies SET is_active = ?1 WHERE company_id = ?2",
          rusqlite::params![is_active, id_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(CoreError::CompanyNotFound(company_id).into());
    }
    self.require_company(company_id).await
  }

  async fn delete_company(&self, company_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(company_id);

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM companies WHERE company_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    Ok(deleted > 0)
  }

  // ── Credentials ───────────────────────────────────────────────────────────

  async fn issue_api_key(&self, company_id: Uuid, name: &str) -> Result<IssuedKey> {
    self.require_company(company_id).await?;

    let material = generate_key();
    let key = ApiKey {
      key_id:     Uuid::new_v4(),
      company_id,
      name:       name.to_owned(),
      prefix:     material.prefix.clone(),
      key_hash:   material.hash.clone(),
      revoked:    false,
      created_at: Utc::now(),
    };

    let key_id_str  = encode_uuid(key.key_id);
    let company_str = encode_uuid(company_id);
    let name_str    = key.name.clone();
    let prefix      = key.prefix.clone();
    let hash        = key.key_hash.clone();
    let at_str      = encode_dt(key.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO api_keys (key_id, company_id, name, prefix, key_hash, revoked, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
          rusqlite::params![key_id_str, company_str, name_str, prefix, hash, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(IssuedKey { key, secret: material.full })
  }

  async fn list_api_keys(&self, company_id: Uuid) -> Result<Vec<ApiKey>> {
    let company_str = encode_uuid(company_id);

    let raws: Vec<RawApiKey> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM api_keys WHERE company_id = ?1 ORDER BY rowid",
          RawApiKey::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![company_str], RawApiKey::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawApiKey::into_api_key).collect()
  }

  async fn revoke_api_key(&self, key_id: Uuid) -> Result<ApiKey> {
    let id_str = encode_uuid(key_id);

    let raw: Option<RawApiKey> = self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE api_keys SET revoked = 1 WHERE key_id = ?1",
          rusqlite::params![id_str],
        )?;
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM api_keys WHERE key_id = ?1", RawApiKey::COLUMNS),
              rusqlite::params![id_str],
              RawApiKey::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw
      .ok_or(Error::Core(CoreError::ApiKeyNotFound(key_id)))?
      .into_api_key()
  }

  async fn resolve_api_key(&self, presented: &str) -> Result<Option<Tenant>> {
    let hash = hash_key(presented);

    let found: Option<(String, RawCompany)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT k.key_id, c.company_id, c.company_name, c.is_active, c.created_at
               FROM api_keys k
               JOIN companies c ON c.company_id = k.company_id
               WHERE k.key_hash = ?1
                 AND k.revoked = 0
                 AND c.is_active = 1",
              rusqlite::params![hash],
              |row| {
                Ok((row.get(0)?, RawCompany {
                  company_id:   row.get(1)?,
                  company_name: row.get(2)?,
                  is_active:    row.get(3)?,
                  created_at:   row.get(4)?,
                }))
              },
            )
            .optional()?,
        )
      })
      .await?;

    let Some((key_id, company)) = found else { return Ok(None) };
    Ok(Some(Tenant::new(
      company.into_company()?,
      Principal::ApiKey { key_id: decode_uuid(&key_id)? },
    )))
  }

  // ── Staff ─────────────────────────────────────────────────────────────────

  async fn add_staff_user(&self, input: NewStaffUser) -> Result<StaffUser> {
    self.require_company(input.company_id).await?;

    let user = StaffUser {
      user_id:       Uuid::new_v4(),
      company_id:    input.company_id,
      email:         normalize_email(&input.email),
      name:          input.name,
      password_hash: input.password_hash,
      is_active:     true,
      created_at:    Utc::now(),
    };
    if user.email.is_empty() {
      return Err(CoreError::Validation(FieldErrors::single("email", BLANK)).into());
    }

    let id_str      = encode_uuid(user.user_id);
    let company_str = encode_uuid(user.company_id);
    let email       = user.email.clone();
    let name        = user.name.clone();
    let hash        = user.password_hash.clone();
    let at_str      = encode_dt(user.created_at);

    let inserted = self
      .conn
      .call(move |conn| {
        match conn.execute(
          "INSERT INTO staff_users
             (user_id, company_id, email, name, password_hash, is_active, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)",
          rusqlite::params![id_str, company_str, email, name, hash, at_str],
        ) {
          Ok(_) => Ok(true),
          Err(e) if is_constraint_violation(&e) => Ok(false),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    if !inserted {
      return Err(CoreError::DuplicateEmail(user.email).into());
    }
    Ok(user)
  }

  async fn get_staff_user_by_email(&self, email: &str) -> Result<Option<StaffUser>> {
    let email = normalize_email(email);

    let raw: Option<RawStaffUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM staff_users WHERE email = ?1", RawStaffUser::COLUMNS),
              rusqlite::params![email],
              RawStaffUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawStaffUser::into_staff_user).transpose()
  }

  // ── Resources ─────────────────────────────────────────────────────────────

  async fn create_resource(&self, tenant: &Tenant, input: NewResource) -> Result<Resource> {
    let kind = input.value.kind();
    let now = Utc::now();
    let resource = Resource {
      resource_id: Uuid::new_v4(),
      company_id:  tenant.company_id(),
      created_by:  tenant.staff_user_id(),
      active:      kind.is_publishable().then_some(input.active),
      value:       input.value,
      created_at:  now,
      updated_at:  now,
    };

    let refs        = bound_refs(&resource.value);
    let id_str      = encode_uuid(resource.resource_id);
    let company_str = encode_uuid(resource.company_id);
    let kind_str    = kind.segment();
    let active      = resource.active;
    let body        = resource.value.to_json()?.to_string();
    let created_by  = resource.created_by.map(encode_uuid);
    let at_str      = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let unowned = unowned_references(&tx, &company_str, &refs)?;
        if !unowned.is_empty() {
          return Ok(Guarded::Unowned(unowned));
        }
        tx.execute(
          "INSERT INTO resources (
             resource_id, company_id, kind, active, body_json,
             created_by, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
          rusqlite::params![id_str, company_str, kind_str, active, body, created_by, at_str],
        )?;
        tx.commit()?;
        Ok(Guarded::Written(()))
      })
      .await?
      .into_result()?;

    Ok(resource)
  }

  async fn list_resources(&self, tenant: &Tenant, query: ListQuery) -> Result<Vec<Resource>> {
    let company_str = encode_uuid(tenant.company_id());
    let kind_str = query.kind.segment();
    // Kinds without an activity flag are never narrowed on it.
    let active_only =
      query.visibility == Visibility::ActiveOnly && query.kind.is_publishable();
    let (limit, offset) = sql_limit(&query);

    let raws: Vec<RawResource> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM resources
           WHERE company_id = ?1
             AND kind = ?2
             AND (?3 = 0 OR active = 1)
           ORDER BY rowid
           LIMIT ?4 OFFSET ?5",
          RawResource::COLUMNS
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![company_str, kind_str, active_only, limit, offset],
            RawResource::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let resources = raws
      .into_iter()
      .map(RawResource::into_resource)
      .collect::<Result<Vec<_>>>()?;
    debug_assert!(!active_only || resources.iter().all(Resource::is_visible));
    Ok(resources)
  }

  async fn get_resource(
    &self,
    tenant:      &Tenant,
    kind:        Kind,
    resource_id: Uuid,
  ) -> Result<Option<Resource>> {
    let id_str      = encode_uuid(resource_id);
    let company_str = encode_uuid(tenant.company_id());
    let kind_str    = kind.segment();

    let raw: Option<RawResource> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM resources
                 WHERE resource_id = ?1 AND company_id = ?2 AND kind = ?3",
                RawResource::COLUMNS
              ),
              rusqlite::params![id_str, company_str, kind_str],
              RawResource::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawResource::into_resource).transpose()
  }

  async fn update_resource(
    &self,
    tenant:      &Tenant,
    resource_id: Uuid,
    update:      ResourceUpdate,
  ) -> Result<Option<Resource>> {
    let kind        = update.value.kind();
    let publishable = kind.is_publishable();
    let refs        = bound_refs(&update.value);
    let id_str      = encode_uuid(resource_id);
    let company_str = encode_uuid(tenant.company_id());
    let kind_str    = kind.segment();
    let body        = update.value.to_json()?.to_string();
    let requested   = update.active;
    let at_str      = encode_dt(Utc::now());

    let raw: Option<RawResource> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let current: Option<Option<bool>> = tx
          .query_row(
            "SELECT active FROM resources
             WHERE resource_id = ?1 AND company_id = ?2 AND kind = ?3",
            rusqlite::params![id_str, company_str, kind_str],
            |row| row.get::<_, Option<bool>>(0),
          )
          .optional()?;
        let Some(current) = current else {
          return Ok(Guarded::Written(None));
        };

        let unowned = unowned_references(&tx, &company_str, &refs)?;
        if !unowned.is_empty() {
          return Ok(Guarded::Unowned(unowned));
        }

        let active = publishable.then(|| requested.or(current).unwrap_or(false));
        tx.execute(
          "UPDATE resources SET body_json = ?1, active = ?2, updated_at = ?3
           WHERE resource_id = ?4 AND company_id = ?5",
          rusqlite::params![body, active, at_str, id_str, company_str],
        )?;
        let raw = tx.query_row(
          &format!("SELECT {} FROM resources WHERE resource_id = ?1", RawResource::COLUMNS),
          rusqlite::params![id_str],
          RawResource::from_row,
        )?;
        tx.commit()?;
        Ok(Guarded::Written(Some(raw)))
      })
      .await?
      .into_result()?;

    raw.map(RawResource::into_resource).transpose()
  }

  // ── Events — append-only ──────────────────────────────────────────────────

  async fn record_event(&self, tenant: &Tenant, input: NewEvent) -> Result<Event> {
    let event = Event {
      event_id:        Uuid::new_v4(),
      company_id:      tenant.company_id(),
      chatbot_user_id: input.chatbot_user_id,
      date_time:       input.date_time,
      value:           input.value,
      recorded_at:     Utc::now(),
    };

    let id_str      = encode_uuid(event.event_id);
    let company_str = encode_uuid(event.company_id);
    let kind_str    = event.value.kind().segment();
    let user_id     = event.chatbot_user_id.clone();
    let dt_str      = encode_dt(event.date_time);
    let body        = event.value.to_json()?.to_string();
    let at_str      = encode_dt(event.recorded_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO events (
             event_id, company_id, kind, chatbot_user_id, date_time, body_json, recorded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![id_str, company_str, kind_str, user_id, dt_str, body, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(event)
  }

  async fn list_events(&self, tenant: &Tenant, query: ListQuery) -> Result<Vec<Event>> {
    let company_str = encode_uuid(tenant.company_id());
    let kind_str = query.kind.segment();
    let (limit, offset) = sql_limit(&query);

    let raws: Vec<RawEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM events
           WHERE company_id = ?1 AND kind = ?2
           ORDER BY rowid
           LIMIT ?3 OFFSET ?4",
          RawEvent::COLUMNS
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![company_str, kind_str, limit, offset],
            RawEvent::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEvent::into_event).collect()
  }
}
