//! Person: the canonical identity record.
//!
//! A person is registered once and keeps its `unique_id` and
//! `personal_email` forever. Its status only moves through
//! [`crate::store::IdentityStore::change_status`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

use crate::{
  Result,
  error::ValidationErrors,
  validate::{Validator, parse_choice, trim},
};

pub const UNIQUE_ID_MAX_LEN: usize = 20;
pub const NAME_MIN_LEN: usize = 2;
pub const NAME_MAX_LEN: usize = 50;
pub const PLACE_OF_BIRTH_MAX_LEN: usize = 100;
pub const NATIONALITY_MAX_LEN: usize = 50;
pub const PHONE_MAX_LEN: usize = 20;

// ─── Enums ───────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
  VariantNames,
)]
#[strum(ascii_case_insensitive)]
pub enum Gender {
  #[serde(rename = "M")]
  #[strum(serialize = "M")]
  Male,
  #[serde(rename = "F")]
  #[strum(serialize = "F")]
  Female,
  #[serde(rename = "O")]
  #[strum(serialize = "O")]
  Other,
}

impl Gender {
  pub fn as_str(self) -> &'static str { self.into() }

  pub fn parse(value: &str) -> Result<Self> { parse_choice("gender", value) }
}

/// Lifecycle status of a person. New registrations start as `Pending`;
/// `Archived` is the soft-delete state.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  IntoStaticStr,
  VariantNames,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PersonStatus {
  #[default]
  Pending,
  Active,
  Suspended,
  Inactive,
  Archived,
}

impl PersonStatus {
  pub fn as_str(self) -> &'static str { self.into() }

  /// Parse a status name, rejecting unknown values as a validation error.
  pub fn parse(value: &str) -> Result<Self> { parse_choice("status", value) }
}

// ─── Person ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
  /// Caller-assigned registry identifier, e.g. `STU202600001`.
  pub unique_id:      String,
  pub first_name:     String,
  pub last_name:      String,
  pub date_of_birth:  NaiveDate,
  pub place_of_birth: String,
  pub nationality:    String,
  pub gender:         Gender,
  pub personal_email: String,
  pub phone:          String,
  pub status:         PersonStatus,
  pub created_at:     DateTime<Utc>,
  /// Refreshed by every profile-field update and status change.
  pub updated_at:     DateTime<Utc>,
}

// ─── NewPerson ───────────────────────────────────────────────────────────────

/// Input to [`crate::store::IdentityStore::create_person`]. Status and
/// timestamps are always assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPerson {
  pub unique_id:      String,
  pub first_name:     String,
  pub last_name:      String,
  pub date_of_birth:  NaiveDate,
  pub place_of_birth: String,
  pub nationality:    String,
  pub gender:         Gender,
  pub personal_email: String,
  pub phone:          String,
}

impl NewPerson {
  /// Trim every text field and check all constraints, reporting every
  /// violated field at once.
  pub fn validated(mut self) -> Result<Self> {
    self.normalize();
    let mut v = Validator::new();
    self.check(&mut v);
    v.finish()?;
    Ok(self)
  }

  fn normalize(&mut self) {
    for field in [
      &mut self.unique_id,
      &mut self.first_name,
      &mut self.last_name,
      &mut self.place_of_birth,
      &mut self.nationality,
      &mut self.personal_email,
      &mut self.phone,
    ] {
      trim(field);
    }
  }

  fn check(&self, v: &mut Validator) {
    v.identifier("unique_id", &self.unique_id, UNIQUE_ID_MAX_LEN)
      .text("first_name", &self.first_name, NAME_MIN_LEN, NAME_MAX_LEN)
      .text("last_name", &self.last_name, NAME_MIN_LEN, NAME_MAX_LEN)
      .text("place_of_birth", &self.place_of_birth, 1, PLACE_OF_BIRTH_MAX_LEN)
      .text("nationality", &self.nationality, 1, NATIONALITY_MAX_LEN)
      .email("personal_email", &self.personal_email)
      .digits("phone", &self.phone, PHONE_MAX_LEN);
  }
}

/// A registration whose every field is still text, as typed at a terminal.
/// Parsing reports malformed dates and choices together with every other
/// violated field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrationForm {
  pub unique_id:      String,
  pub first_name:     String,
  pub last_name:      String,
  /// `YYYY-MM-DD`.
  pub date_of_birth:  String,
  pub place_of_birth: String,
  pub nationality:    String,
  pub gender:         String,
  pub personal_email: String,
  pub phone:          String,
}

impl RegistrationForm {
  pub fn parse(self) -> Result<NewPerson> {
    let mut v = Validator::new();
    let date_of_birth = v.date("date_of_birth", &self.date_of_birth);
    let gender = v.choice::<Gender>("gender", &self.gender);

    // Placeholders only survive when the matching parse succeeded; otherwise
    // `finish` below already fails.
    let mut input = NewPerson {
      unique_id:      self.unique_id,
      first_name:     self.first_name,
      last_name:      self.last_name,
      date_of_birth:  date_of_birth.unwrap_or_default(),
      place_of_birth: self.place_of_birth,
      nationality:    self.nationality,
      gender:         gender.unwrap_or(Gender::Other),
      personal_email: self.personal_email,
      phone:          self.phone,
    };
    input.normalize();
    input.check(&mut v);
    v.finish()?;
    Ok(input)
  }
}

// ─── PersonPatch ─────────────────────────────────────────────────────────────

/// A partial update of the descriptive fields of a person. Identity fields
/// (`unique_id`, `personal_email`) and `status` cannot be patched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonPatch {
  pub first_name:     Option<String>,
  pub last_name:      Option<String>,
  pub date_of_birth:  Option<NaiveDate>,
  pub place_of_birth: Option<String>,
  pub nationality:    Option<String>,
  pub gender:         Option<Gender>,
  pub phone:          Option<String>,
}

impl PersonPatch {
  pub fn is_empty(&self) -> bool {
    self.first_name.is_none()
      && self.last_name.is_none()
      && self.date_of_birth.is_none()
      && self.place_of_birth.is_none()
      && self.nationality.is_none()
      && self.gender.is_none()
      && self.phone.is_none()
  }

  /// Trim and validate only the fields the patch touches.
  pub fn validated(mut self) -> Result<Self> {
    if self.is_empty() {
      return Err(ValidationErrors::single("fields", "no fields to update").into());
    }
    self.normalize();
    let mut v = Validator::new();
    self.check(&mut v);
    v.finish()?;
    Ok(self)
  }

  fn normalize(&mut self) {
    for field in [
      &mut self.first_name,
      &mut self.last_name,
      &mut self.place_of_birth,
      &mut self.nationality,
      &mut self.phone,
    ]
    .into_iter()
    .flatten()
    {
      trim(field);
    }
  }

  fn check(&self, v: &mut Validator) {
    if let Some(first) = &self.first_name {
      v.text("first_name", first, NAME_MIN_LEN, NAME_MAX_LEN);
    }
    if let Some(last) = &self.last_name {
      v.text("last_name", last, NAME_MIN_LEN, NAME_MAX_LEN);
    }
    if let Some(place) = &self.place_of_birth {
      v.text("place_of_birth", place, 1, PLACE_OF_BIRTH_MAX_LEN);
    }
    if let Some(nationality) = &self.nationality {
      v.text("nationality", nationality, 1, NATIONALITY_MAX_LEN);
    }
    if let Some(phone) = &self.phone {
      v.digits("phone", phone, PHONE_MAX_LEN);
    }
  }

  /// Write the touched fields onto `person`. Does not refresh `updated_at`.
  pub fn apply(self, person: &mut Person) {
    if let Some(v) = self.first_name {
      person.first_name = v;
    }
    if let Some(v) = self.last_name {
      person.last_name = v;
    }
    if let Some(v) = self.date_of_birth {
      person.date_of_birth = v;
    }
    if let Some(v) = self.place_of_birth {
      person.place_of_birth = v;
    }
    if let Some(v) = self.nationality {
      person.nationality = v;
    }
    if let Some(v) = self.gender {
      person.gender = v;
    }
    if let Some(v) = self.phone {
      person.phone = v;
    }
  }
}

/// Text counterpart of [`PersonPatch`]; absent fields stay untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatchForm {
  pub first_name:     Option<String>,
  pub last_name:      Option<String>,
  pub date_of_birth:  Option<String>,
  pub place_of_birth: Option<String>,
  pub nationality:    Option<String>,
  pub gender:         Option<String>,
  pub phone:          Option<String>,
}

impl PatchForm {
  pub fn parse(self) -> Result<PersonPatch> {
    let untouched = self.first_name.is_none()
      && self.last_name.is_none()
      && self.date_of_birth.is_none()
      && self.place_of_birth.is_none()
      && self.nationality.is_none()
      && self.gender.is_none()
      && self.phone.is_none();
    if untouched {
      return Err(ValidationErrors::single("fields", "no fields to update").into());
    }

    let mut v = Validator::new();
    let date_of_birth = self
      .date_of_birth
      .as_deref()
      .and_then(|d| v.date("date_of_birth", d));
    let gender = self
      .gender
      .as_deref()
      .and_then(|g| v.choice::<Gender>("gender", g));

    let mut patch = PersonPatch {
      first_name: self.first_name,
      last_name: self.last_name,
      date_of_birth,
      place_of_birth: self.place_of_birth,
      nationality: self.nationality,
      gender,
      phone: self.phone,
    };
    patch.normalize();
    patch.check(&mut v);
    v.finish()?;
    Ok(patch)
  }
}

// ─── Query ───────────────────────────────────────────────────────────────────

/// Parameters for [`crate::store::IdentityStore::list_persons`].
#[derive(Debug, Clone, Default)]
pub struct PersonQuery {
  pub status: Option<PersonStatus>,
  /// Case-insensitive fragment matched against first and last name.
  pub name:   Option<String>,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}
