//! [`SqliteStore`], the SQLite implementation of [`IdentityStore`].

use std::{path::Path, sync::Arc, time::Duration};

use rusqlite::{Connection, OptionalExtension as _, TransactionBehavior, params};
use uuid::Uuid;

use registrar_core::{
  Conflict, NotFound, ValidationErrors,
  lifecycle::{StatusHistory, TransitionPolicy, normalize_reason},
  link::{IdentityLink, RelationshipType, check_endpoints},
  person::{NewPerson, Person, PersonPatch, PersonQuery, PersonStatus},
  profile::{ProfileAttributes, RoleProfile, RoleType},
  store::IdentityStore,
};

use crate::{
  Error, Result,
  encode::{
    HISTORY_COLUMNS, LINK_COLUMNS, PERSON_COLUMNS, PROFILE_COLUMNS, RawHistory, RawLink,
    RawPerson, RawProfile, encode_date, encode_dt, encode_uuid, now,
  },
  schema::SCHEMA,
};

/// How long a writer waits for another connection's lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const DEFAULT_LIST_LIMIT: usize = 100;

// ─── Closure plumbing ────────────────────────────────────────────────────────

/// Failure inside a database closure. A domain outcome (validation, conflict,
/// not found) drops the open transaction uncommitted and is handed back to the
/// caller as-is; SQLite failures become [`Error::Database`].
enum TxError {
  Sqlite(rusqlite::Error),
  Store(Error),
}

type TxResult<T> = std::result::Result<T, TxError>;

impl From<rusqlite::Error> for TxError {
  fn from(e: rusqlite::Error) -> Self { Self::Sqlite(e) }
}

impl From<Error> for TxError {
  fn from(e: Error) -> Self { Self::Store(e) }
}

impl From<registrar_core::Error> for TxError {
  fn from(e: registrar_core::Error) -> Self { Self::Store(e.into()) }
}

impl From<Conflict> for TxError {
  fn from(c: Conflict) -> Self { Self::Store(c.into()) }
}

impl From<NotFound> for TxError {
  fn from(n: NotFound) -> Self { Self::Store(n.into()) }
}

impl From<ValidationErrors> for TxError {
  fn from(v: ValidationErrors) -> Self { Self::Store(v.into()) }
}

/// Turn a constraint violation into the [`Conflict`] that `classify` derives
/// from SQLite's message; any other failure stays a database error.
fn conflict_on_constraint<F>(err: rusqlite::Error, classify: F) -> TxError
where
  F: FnOnce(&str) -> Option<Conflict>,
{
  if let rusqlite::Error::SqliteFailure(failure, message) = &err
    && failure.code == rusqlite::ErrorCode::ConstraintViolation
    && let Some(conflict) = classify(message.as_deref().unwrap_or_default())
  {
    return conflict.into();
  }
  TxError::Sqlite(err)
}

/// Begin a write transaction that takes the database lock up front, so the
/// reads it performs cannot be invalidated before it commits.
fn immediate(conn: &mut Connection) -> rusqlite::Result<rusqlite::Transaction<'_>> {
  conn.transaction_with_behavior(TransactionBehavior::Immediate)
}

fn load_person(conn: &Connection, unique_id: &str) -> TxResult<Person> {
  let raw = conn
    .query_row(
      &format!("SELECT {PERSON_COLUMNS} FROM persons WHERE unique_id = ?1"),
      [unique_id],
      RawPerson::from_row,
    )
    .optional()?
    .ok_or_else(|| NotFound::Person(unique_id.to_owned()))?;
  Ok(raw.into_person()?)
}

fn ensure_person(conn: &Connection, unique_id: &str) -> TxResult<()> {
  let exists = conn
    .query_row(
      "SELECT 1 FROM persons WHERE unique_id = ?1",
      [unique_id],
      |_| Ok(()),
    )
    .optional()?
    .is_some();

  if exists {
    Ok(())
  } else {
    Err(NotFound::Person(unique_id.to_owned()).into())
  }
}

fn load_profile(conn: &Connection, unique_id: &str, role: RoleType) -> TxResult<RoleProfile> {
  let raw = conn
    .query_row(
      &format!("SELECT {PROFILE_COLUMNS} FROM role_profiles WHERE unique_id = ?1 AND role = ?2"),
      params![unique_id, role.as_str()],
      RawProfile::from_row,
    )
    .optional()?
    .ok_or_else(|| NotFound::Profile {
      unique_id: unique_id.to_owned(),
      role,
    })?;
  Ok(raw.into_profile()?)
}

fn load_link(conn: &Connection, person: &str, linked_person: &str) -> TxResult<IdentityLink> {
  let raw = conn
    .query_row(
      &format!(
        "SELECT {LINK_COLUMNS} FROM identity_links WHERE person = ?1 AND linked_person = ?2"
      ),
      [person, linked_person],
      RawLink::from_row,
    )
    .optional()?
    .ok_or_else(|| NotFound::Link {
      from: person.to_owned(),
      to:   linked_person.to_owned(),
    })?;
  Ok(raw.into_link()?)
}

/// Links whose `column` (`person` or `linked_person`) equals `unique_id`,
/// oldest first.
fn links_by(conn: &Connection, column: &'static str, unique_id: &str) -> TxResult<Vec<IdentityLink>> {
  ensure_person(conn, unique_id)?;
  let mut stmt = conn.prepare(&format!(
    "SELECT {LINK_COLUMNS} FROM identity_links WHERE {column} = ?1 ORDER BY seq"
  ))?;
  let raws = stmt
    .query_map([unique_id], RawLink::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(raws.into_iter().map(RawLink::into_link).collect::<Result<_>>()?)
}

/// Case-folded form of a name. SQLite only folds ASCII, so name search
/// compares these columns against a fragment folded the same way.
fn fold(name: &str) -> String { name.to_lowercase() }

/// Escape `LIKE` wildcards so a name fragment matches literally.
fn escape_like(fragment: &str) -> String {
  let mut out = String::with_capacity(fragment.len());
  for c in fragment.chars() {
    if matches!(c, '\\' | '%' | '_') {
      out.push('\\');
    }
    out.push(c);
  }
  out
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A registry backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. Several
/// stores may open the same file; SQLite serialises their writers.
#[derive(Clone)]
pub struct SqliteStore {
  conn:   tokio_rusqlite::Connection,
  policy: Arc<TransitionPolicy>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(Self {
      conn,
      policy: Arc::default(),
    })
  }

  /// Replace the transition policy (permissive by default).
  pub fn with_policy(mut self, policy: TransitionPolicy) -> Self {
    self.policy = Arc::new(policy);
    self
  }

  /// Run `f` on the connection thread, separating domain outcomes from
  /// SQLite failures.
  async fn run<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&mut Connection) -> TxResult<T> + Send + 'static,
    T: Send + 'static,
  {
    self
      .conn
      .call(move |conn| match f(conn) {
        Ok(value) => Ok(Ok(value)),
        Err(TxError::Store(e)) => Ok(Err(e)),
        Err(TxError::Sqlite(e)) => Err(e.into()),
      })
      .await?
  }
}

// ─── IdentityStore impl ──────────────────────────────────────────────────────

impl IdentityStore for SqliteStore {
  type Error = Error;

  // ── People ────────────────────────────────────────────────────────────────

  async fn create_person(&self, input: NewPerson) -> Result<Person> {
    let input = input.validated()?;
    let at = now();
    let person = Person {
      unique_id:      input.unique_id,
      first_name:     input.first_name,
      last_name:      input.last_name,
      date_of_birth:  input.date_of_birth,
      place_of_birth: input.place_of_birth,
      nationality:    input.nationality,
      gender:         input.gender,
      personal_email: input.personal_email,
      phone:          input.phone,
      status:         PersonStatus::Pending,
      created_at:     at,
      updated_at:     at,
    };

    let row = person.clone();
    self
      .run(move |conn| {
        conn
          .execute(
            &format!(
              "INSERT INTO persons ({PERSON_COLUMNS}, first_name_folded, last_name_folded)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
            ),
            params![
              row.unique_id,
              row.first_name,
              row.last_name,
              encode_date(row.date_of_birth),
              row.place_of_birth,
              row.nationality,
              row.gender.as_str(),
              row.personal_email,
              row.phone,
              row.status.as_str(),
              encode_dt(row.created_at),
              encode_dt(row.updated_at),
              fold(&row.first_name),
              fold(&row.last_name),
            ],
          )
          .map_err(|e| {
            conflict_on_constraint(e, |message| {
              if message.contains("unique_id") {
                Some(Conflict::UniqueId(row.unique_id.clone()))
              } else if message.contains("personal_email") {
                Some(Conflict::Email(row.personal_email.clone()))
              } else {
                None
              }
            })
          })?;
        Ok(())
      })
      .await?;

    tracing::info!(unique_id = %person.unique_id, "person registered");
    Ok(person)
  }

  async fn get_person(&self, unique_id: &str) -> Result<Person> {
    tracing::debug!(unique_id, "loading person");
    let unique_id = unique_id.to_owned();
    self.run(move |conn| load_person(conn, &unique_id)).await
  }

  async fn update_person(&self, unique_id: &str, patch: PersonPatch) -> Result<Person> {
    let patch = patch.validated()?;
    let unique_id = unique_id.to_owned();

    let person = self
      .run(move |conn| {
        let tx = immediate(conn)?;
        let mut person = load_person(&tx, &unique_id)?;
        patch.apply(&mut person);
        person.updated_at = now();

        tx.execute(
          "UPDATE persons
           SET first_name = ?2, last_name = ?3, date_of_birth = ?4,
               place_of_birth = ?5, nationality = ?6, gender = ?7, phone = ?8,
               updated_at = ?9, first_name_folded = ?10, last_name_folded = ?11
           WHERE unique_id = ?1",
          params![
            person.unique_id,
            person.first_name,
            person.last_name,
            encode_date(person.date_of_birth),
            person.place_of_birth,
            person.nationality,
            person.gender.as_str(),
            person.phone,
            encode_dt(person.updated_at),
            fold(&person.first_name),
            fold(&person.last_name),
          ],
        )?;
        tx.commit()?;
        Ok(person)
      })
      .await?;

    tracing::info!(unique_id = %person.unique_id, "person updated");
    Ok(person)
  }

  async fn list_persons(&self, query: &PersonQuery) -> Result<Vec<Person>> {
    let status = query.status.map(PersonStatus::as_str);
    let name = query
      .name
      .as_deref()
      .map(str::trim)
      .filter(|n| !n.is_empty())
      .map(|n| format!("%{}%", escape_like(&fold(n))));
    let limit = i64::try_from(query.limit.unwrap_or(DEFAULT_LIST_LIMIT)).unwrap_or(i64::MAX);
    let offset = i64::try_from(query.offset.unwrap_or(0)).unwrap_or(i64::MAX);
    tracing::debug!(?status, ?name, limit, offset, "listing persons");

    self
      .run(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PERSON_COLUMNS} FROM persons
           WHERE (?1 IS NULL OR status = ?1)
             AND (?2 IS NULL
                  OR first_name_folded LIKE ?2 ESCAPE '\\'
                  OR last_name_folded  LIKE ?2 ESCAPE '\\')
           ORDER BY last_name, first_name, unique_id
           LIMIT ?3 OFFSET ?4"
        ))?;
        let raws = stmt
          .query_map(params![status, name, limit, offset], RawPerson::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(raws.into_iter().map(RawPerson::into_person).collect::<Result<_>>()?)
      })
      .await
  }

  async fn purge_person(&self, unique_id: &str) -> Result<Person> {
    let unique_id = unique_id.to_owned();

    let person = self
      .run(move |conn| {
        let tx = immediate(conn)?;
        let person = load_person(&tx, &unique_id)?;
        if person.status != PersonStatus::Archived {
          return Err(
            ValidationErrors::single(
              "status",
              format!("only archived persons can be purged (status is {})", person.status),
            )
            .into(),
          );
        }

        tx.execute(
          "INSERT INTO retired_identities (unique_id, personal_email, retired_at)
           VALUES (?1, ?2, ?3)",
          params![person.unique_id, person.personal_email, encode_dt(now())],
        )?;
        // Profiles, history and links go with the row via ON DELETE CASCADE.
        tx.execute("DELETE FROM persons WHERE unique_id = ?1", [&unique_id])?;
        tx.commit()?;
        Ok(person)
      })
      .await?;

    tracing::info!(unique_id = %person.unique_id, "person purged; identifiers retired");
    Ok(person)
  }

  // ── Role profiles ─────────────────────────────────────────────────────────

  async fn attach_profile(
    &self,
    unique_id: &str,
    attributes: ProfileAttributes,
  ) -> Result<RoleProfile> {
    let profile = RoleProfile {
      unique_id:   unique_id.to_owned(),
      attributes:  attributes.validated()?,
      attached_at: now(),
    };

    let role = profile.role();
    let attributes_json = profile.attributes.to_json()?.to_string();
    let owner = profile.unique_id.clone();
    let attached_at = encode_dt(profile.attached_at);

    self
      .run(move |conn| {
        let tx = immediate(conn)?;
        ensure_person(&tx, &owner)?;
        tx.execute(
          "INSERT INTO role_profiles (unique_id, role, attributes_json, attached_at)
           VALUES (?1, ?2, ?3, ?4)",
          params![owner, role.as_str(), attributes_json, attached_at],
        )
        .map_err(|e| {
          conflict_on_constraint(e, |message| {
            message.contains("role_profiles").then(|| Conflict::Profile {
              unique_id: owner.clone(),
              role,
            })
          })
        })?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    tracing::info!(unique_id = %profile.unique_id, %role, "profile attached");
    Ok(profile)
  }

  async fn detach_profile(&self, unique_id: &str, role: RoleType) -> Result<RoleProfile> {
    let unique_id = unique_id.to_owned();

    let profile = self
      .run(move |conn| {
        let tx = immediate(conn)?;
        let profile = load_profile(&tx, &unique_id, role)?;
        tx.execute(
          "DELETE FROM role_profiles WHERE unique_id = ?1 AND role = ?2",
          params![unique_id, role.as_str()],
        )?;
        tx.commit()?;
        Ok(profile)
      })
      .await?;

    tracing::info!(unique_id = %profile.unique_id, %role, "profile detached");
    Ok(profile)
  }

  async fn get_profile(&self, unique_id: &str, role: RoleType) -> Result<RoleProfile> {
    let unique_id = unique_id.to_owned();
    self
      .run(move |conn| load_profile(conn, &unique_id, role))
      .await
  }

  async fn list_profiles(&self, unique_id: &str) -> Result<Vec<RoleProfile>> {
    let unique_id = unique_id.to_owned();

    self
      .run(move |conn| {
        let tx = conn.transaction()?;
        ensure_person(&tx, &unique_id)?;
        let raws = {
          let mut stmt = tx.prepare(&format!(
            "SELECT {PROFILE_COLUMNS} FROM role_profiles
             WHERE unique_id = ?1
             ORDER BY CASE role WHEN 'student' THEN 0 WHEN 'faculty' THEN 1 ELSE 2 END"
          ))?;
          stmt
            .query_map([&unique_id], RawProfile::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        tx.commit()?;
        Ok(raws.into_iter().map(RawProfile::into_profile).collect::<Result<_>>()?)
      })
      .await
  }

  // ── Lifecycle ─────────────────────────────────────────────────────────────

  async fn change_status(
    &self,
    unique_id: &str,
    new_status: PersonStatus,
    reason: Option<String>,
  ) -> Result<(Person, StatusHistory)> {
    let unique_id = unique_id.to_owned();
    let reason = normalize_reason(reason);
    let policy = Arc::clone(&self.policy);

    let (person, entry) = self
      .run(move |conn| {
        let tx = immediate(conn)?;
        let mut person = load_person(&tx, &unique_id)?;
        policy.check(person.status, new_status)?;

        let entry = StatusHistory {
          history_id: Uuid::new_v4(),
          unique_id: unique_id.clone(),
          old_status: person.status,
          new_status,
          changed_at: now(),
          reason,
        };
        person.status = new_status;
        person.updated_at = entry.changed_at;

        tx.execute(
          "UPDATE persons SET status = ?2, updated_at = ?3 WHERE unique_id = ?1",
          params![unique_id, new_status.as_str(), encode_dt(entry.changed_at)],
        )?;
        tx.execute(
          "INSERT INTO status_history
             (history_id, unique_id, old_status, new_status, changed_at, reason)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          params![
            encode_uuid(entry.history_id),
            entry.unique_id,
            entry.old_status.as_str(),
            entry.new_status.as_str(),
            encode_dt(entry.changed_at),
            entry.reason,
          ],
        )?;
        tx.commit()?;
        Ok((person, entry))
      })
      .await?;

    tracing::info!(
      unique_id = %person.unique_id,
      from = %entry.old_status,
      to = %entry.new_status,
      "status changed"
    );
    Ok((person, entry))
  }

  async fn get_history(&self, unique_id: &str) -> Result<Vec<StatusHistory>> {
    tracing::debug!(unique_id, "loading status history");
    let unique_id = unique_id.to_owned();

    self
      .run(move |conn| {
        let tx = conn.transaction()?;
        ensure_person(&tx, &unique_id)?;
        let raws = {
          let mut stmt = tx.prepare(&format!(
            "SELECT {HISTORY_COLUMNS} FROM status_history
             WHERE unique_id = ?1
             ORDER BY changed_at DESC, seq DESC"
          ))?;
          stmt
            .query_map([&unique_id], RawHistory::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        tx.commit()?;
        Ok(raws.into_iter().map(RawHistory::into_history).collect::<Result<_>>()?)
      })
      .await
  }

  // ── Links ─────────────────────────────────────────────────────────────────

  async fn create_link(
    &self,
    person: &str,
    linked_person: &str,
    relationship_type: RelationshipType,
  ) -> Result<IdentityLink> {
    check_endpoints(person, linked_person)?;

    let link = IdentityLink {
      link_id: Uuid::new_v4(),
      person: person.to_owned(),
      linked_person: linked_person.to_owned(),
      relationship_type,
      created_at: now(),
    };

    let row = link.clone();
    self
      .run(move |conn| {
        let tx = immediate(conn)?;
        ensure_person(&tx, &row.person)?;
        ensure_person(&tx, &row.linked_person)?;
        tx.execute(
          &format!("INSERT INTO identity_links ({LINK_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
          params![
            encode_uuid(row.link_id),
            row.person,
            row.linked_person,
            row.relationship_type.as_str(),
            encode_dt(row.created_at),
          ],
        )
        .map_err(|e| {
          conflict_on_constraint(e, |message| {
            message.contains("identity_links.person").then(|| Conflict::Link {
              from: row.person.clone(),
              to:   row.linked_person.clone(),
            })
          })
        })?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    tracing::info!(
      from = %link.person,
      to = %link.linked_person,
      relationship = %link.relationship_type,
      "identity link created"
    );
    Ok(link)
  }

  async fn remove_link(&self, person: &str, linked_person: &str) -> Result<IdentityLink> {
    let (person, linked_person) = (person.to_owned(), linked_person.to_owned());

    let link = self
      .run(move |conn| {
        let tx = immediate(conn)?;
        let link = load_link(&tx, &person, &linked_person)?;
        tx.execute(
          "DELETE FROM identity_links WHERE person = ?1 AND linked_person = ?2",
          [&person, &linked_person],
        )?;
        tx.commit()?;
        Ok(link)
      })
      .await?;

    tracing::info!(from = %link.person, to = %link.linked_person, "identity link removed");
    Ok(link)
  }

  async fn outgoing_links(&self, unique_id: &str) -> Result<Vec<IdentityLink>> {
    let unique_id = unique_id.to_owned();
    self
      .run(move |conn| {
        let tx = conn.transaction()?;
        let links = links_by(&tx, "person", &unique_id)?;
        tx.commit()?;
        Ok(links)
      })
      .await
  }

  async fn incoming_links(&self, unique_id: &str) -> Result<Vec<IdentityLink>> {
    let unique_id = unique_id.to_owned();
    self
      .run(move |conn| {
        let tx = conn.transaction()?;
        let links = links_by(&tx, "linked_person", &unique_id)?;
        tx.commit()?;
        Ok(links)
      })
      .await
  }
}
