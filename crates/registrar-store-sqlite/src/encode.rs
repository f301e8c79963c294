//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`)
//! so that lexical order equals chronological order. Calendar dates are
//! `YYYY-MM-DD`. Enums are stored as their canonical lowercase names.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};
use registrar_core::{
  lifecycle::StatusHistory,
  link::{IdentityLink, RelationshipType},
  person::{Gender, Person, PersonStatus},
  profile::{ProfileAttributes, RoleProfile, RoleType},
};
use rusqlite::Row;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

/// The current time at the precision the store keeps.
pub fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::Decode(format!("date {s:?}: {e}")))
}

/// Decode a stored enum name; unknown values mean the row is corrupt.
fn decode_enum<T: FromStr>(what: &str, s: &str) -> Result<T> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown {what}: {s:?}")))
}

// ─── Persons ─────────────────────────────────────────────────────────────────

pub const PERSON_COLUMNS: &str = "unique_id, first_name, last_name, date_of_birth, \
  place_of_birth, nationality, gender, personal_email, phone, status, created_at, updated_at";

/// Raw strings read directly from a `persons` row.
pub struct RawPerson {
  pub unique_id:      String,
  pub first_name:     String,
  pub last_name:      String,
  pub date_of_birth:  String,
  pub place_of_birth: String,
  pub nationality:    String,
  pub gender:         String,
  pub personal_email: String,
  pub phone:          String,
  pub status:         String,
  pub created_at:     String,
  pub updated_at:     String,
}

impl RawPerson {
  /// Read a row selected with [`PERSON_COLUMNS`].
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      unique_id:      row.get(0)?,
      first_name:     row.get(1)?,
      last_name:      row.get(2)?,
      date_of_birth:  row.get(3)?,
      place_of_birth: row.get(4)?,
      nationality:    row.get(5)?,
      gender:         row.get(6)?,
      personal_email: row.get(7)?,
      phone:          row.get(8)?,
      status:         row.get(9)?,
      created_at:     row.get(10)?,
      updated_at:     row.get(11)?,
    })
  }

  pub fn into_person(self) -> Result<Person> {
    Ok(Person {
      unique_id:      self.unique_id,
      first_name:     self.first_name,
      last_name:      self.last_name,
      date_of_birth:  decode_date(&self.date_of_birth)?,
      place_of_birth: self.place_of_birth,
      nationality:    self.nationality,
      gender:         decode_enum::<Gender>("gender", &self.gender)?,
      personal_email: self.personal_email,
      phone:          self.phone,
      status:         decode_enum::<PersonStatus>("status", &self.status)?,
      created_at:     decode_dt(&self.created_at)?,
      updated_at:     decode_dt(&self.updated_at)?,
    })
  }
}

// ─── Role profiles ───────────────────────────────────────────────────────────

pub const PROFILE_COLUMNS: &str = "unique_id, role, attributes_json, attached_at";

/// Raw strings read directly from a `role_profiles` row.
pub struct RawProfile {
  pub unique_id:       String,
  pub role:            String,
  pub attributes_json: String,
  pub attached_at:     String,
}

impl RawProfile {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      unique_id:       row.get(0)?,
      role:            row.get(1)?,
      attributes_json: row.get(2)?,
      attached_at:     row.get(3)?,
    })
  }

  pub fn into_profile(self) -> Result<RoleProfile> {
    let role = decode_enum::<RoleType>("role", &self.role)?;
    let attributes: serde_json::Value = serde_json::from_str(&self.attributes_json)?;
    Ok(RoleProfile {
      unique_id:   self.unique_id,
      attributes:  ProfileAttributes::from_parts(role, attributes)?,
      attached_at: decode_dt(&self.attached_at)?,
    })
  }
}

// ─── Status history ──────────────────────────────────────────────────────────

pub const HISTORY_COLUMNS: &str =
  "history_id, unique_id, old_status, new_status, changed_at, reason";

/// Raw strings read directly from a `status_history` row.
pub struct RawHistory {
  pub history_id: String,
  pub unique_id:  String,
  pub old_status: String,
  pub new_status: String,
  pub changed_at: String,
  pub reason:     Option<String>,
}

impl RawHistory {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      history_id: row.get(0)?,
      unique_id:  row.get(1)?,
      old_status: row.get(2)?,
      new_status: row.get(3)?,
      changed_at: row.get(4)?,
      reason:     row.get(5)?,
    })
  }

  pub fn into_history(self) -> Result<StatusHistory> {
    Ok(StatusHistory {
      history_id: decode_uuid(&self.history_id)?,
      unique_id:  self.unique_id,
      old_status: decode_enum("status", &self.old_status)?,
      new_status: decode_enum("status", &self.new_status)?,
      changed_at: decode_dt(&self.changed_at)?,
      reason:     self.reason,
    })
  }
}

// ─── Identity links ──────────────────────────────────────────────────────────

pub const LINK_COLUMNS: &str =
  "link_id, person, linked_person, relationship_type, created_at";

/// Raw strings read directly from an `identity_links` row.
pub struct RawLink {
  pub link_id:           String,
  pub person:            String,
  pub linked_person:     String,
  pub relationship_type: String,
  pub created_at:        String,
}

impl RawLink {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      link_id:           row.get(0)?,
      person:            row.get(1)?,
      linked_person:     row.get(2)?,
      relationship_type: row.get(3)?,
      created_at:        row.get(4)?,
    })
  }

  pub fn into_link(self) -> Result<IdentityLink> {
    Ok(IdentityLink {
      link_id:           decode_uuid(&self.link_id)?,
      person:            self.person,
      linked_person:     self.linked_person,
      relationship_type: decode_enum::<RelationshipType>(
        "relationship type",
        &self.relationship_type,
      )?,
      created_at:        decode_dt(&self.created_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn timestamps_sort_lexically() {
    let early = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();
    let late = early + chrono::Duration::microseconds(1500);

    let (a, b) = (encode_dt(early), encode_dt(late));
    assert_eq!(a.len(), b.len());
    assert!(a < b);
    assert_eq!(decode_dt(&b).unwrap(), late);
  }

  #[test]
  fn unknown_enum_is_decode_error() {
    let err = decode_enum::<PersonStatus>("status", "deleted").unwrap_err();
    assert!(matches!(err, Error::Decode(_)));
  }
}
