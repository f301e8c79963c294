//! Role profiles: the role-specific attribute sets attached to a person.
//!
//! A person holds at most one profile per [`RoleType`], but may hold several
//! role types at once (a student who also works as staff). Profiles are a
//! tagged union keyed by role rather than a type hierarchy.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

use crate::{
  Result,
  validate::{Validator, parse_choice, trim, trim_opt},
};

const DEPARTMENT_MAX_LEN: usize = 100;

// ─── Role type ───────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
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
pub enum RoleType {
  Student,
  Faculty,
  Staff,
}

impl RoleType {
  pub fn as_str(self) -> &'static str { self.into() }

  pub fn parse(value: &str) -> Result<Self> { parse_choice("role", value) }
}

// ─── Student ─────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  VariantNames,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StudentStatus {
  #[default]
  Active,
  Suspended,
  Graduated,
  Expelled,
}

/// The secondary-school diploma a student was admitted with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diploma {
  /// Diploma name, e.g. "Bac".
  #[serde(rename = "type")]
  pub kind:   String,
  pub year:   i32,
  pub honors: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
  #[serde(default)]
  pub national_id_number: Option<String>,
  #[serde(default)]
  pub highschool_diploma: Option<Diploma>,
  pub major:              String,
  pub entry_year:         i32,
  #[serde(default)]
  pub student_status:     StudentStatus,
  pub faculty:            String,
  pub department:         String,
  #[serde(default)]
  pub group:              Option<String>,
  #[serde(default)]
  pub scholarship:        bool,
}

impl StudentProfile {
  fn normalize(&mut self) {
    trim_opt(&mut self.national_id_number);
    trim(&mut self.major);
    trim(&mut self.faculty);
    trim(&mut self.department);
    trim_opt(&mut self.group);
    if let Some(d) = self.highschool_diploma.as_mut() {
      trim(&mut d.kind);
      trim_opt(&mut d.honors);
    }
  }

  fn check(&self, v: &mut Validator) {
    v.optional_text("national_id_number", self.national_id_number.as_deref(), 50)
      .text("major", &self.major, 1, 100)
      .positive("entry_year", self.entry_year.into())
      .text("faculty", &self.faculty, 1, 100)
      .text("department", &self.department, 1, DEPARTMENT_MAX_LEN)
      .optional_text("group", self.group.as_deref(), 50);
    if let Some(d) = &self.highschool_diploma {
      v.text("highschool_diploma.type", &d.kind, 1, 50)
        .positive("highschool_diploma.year", d.year.into())
        .optional_text("highschool_diploma.honors", d.honors.as_deref(), 50);
    }
  }
}

// ─── Faculty ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AcademicRank {
  Professor,
  Associate,
  Assistant,
  Lecturer,
  Instructor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum EmploymentCategory {
  Tenured,
  /// Adjunct or part-time.
  Adjunct,
  /// Visiting researcher.
  Visiting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ContractType {
  Permanent,
  Temporary,
  Hourly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacultyProfile {
  pub rank:                   AcademicRank,
  pub employment_category:    EmploymentCategory,
  pub appointment_start_date: NaiveDate,
  pub primary_department:     String,
  #[serde(default)]
  pub secondary_departments:  Vec<String>,
  #[serde(default)]
  pub office:                 Option<String>,
  #[serde(default)]
  pub phd_institution:        Option<String>,
  #[serde(default)]
  pub research_areas:         Option<String>,
  #[serde(default)]
  pub habilitation:           bool,
  pub contract_type:          ContractType,
  pub contract_start_date:    NaiveDate,
  #[serde(default)]
  pub contract_end_date:      Option<NaiveDate>,
  #[serde(default)]
  pub teaching_hours:         i32,
}

impl FacultyProfile {
  fn normalize(&mut self) {
    trim(&mut self.primary_department);
    self.secondary_departments.iter_mut().for_each(trim);
    self.secondary_departments.retain(|d| !d.is_empty());
    trim_opt(&mut self.office);
    trim_opt(&mut self.phd_institution);
    trim_opt(&mut self.research_areas);
  }

  fn check(&self, v: &mut Validator) {
    v.text("primary_department", &self.primary_department, 1, DEPARTMENT_MAX_LEN);
    for dept in &self.secondary_departments {
      v.text("secondary_departments", dept, 1, DEPARTMENT_MAX_LEN);
    }
    v.optional_text("office", self.office.as_deref(), 100)
      .optional_text("phd_institution", self.phd_institution.as_deref(), 200)
      .non_negative("teaching_hours", self.teaching_hours.into())
      .ensure(
        self
          .contract_end_date
          .is_none_or(|end| end >= self.contract_start_date),
        "contract_end_date",
        "must not be before contract_start_date",
      );
  }
}

// ─── Staff ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum StaffGrade {
  #[serde(rename = "1")]
  #[strum(serialize = "1")]
  One,
  #[serde(rename = "2")]
  #[strum(serialize = "2")]
  Two,
  #[serde(rename = "3")]
  #[strum(serialize = "3")]
  Three,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffProfile {
  pub assigned_department: String,
  pub job_title:           String,
  pub grade:               StaffGrade,
  pub entry_date:          NaiveDate,
}

impl StaffProfile {
  fn normalize(&mut self) {
    trim(&mut self.assigned_department);
    trim(&mut self.job_title);
  }

  fn check(&self, v: &mut Validator) {
    v.text("assigned_department", &self.assigned_department, 1, DEPARTMENT_MAX_LEN)
      .text("job_title", &self.job_title, 1, 100);
  }
}

// ─── ProfileAttributes ───────────────────────────────────────────────────────

/// The role-specific payload of a profile. The variant is the role tag stored
/// alongside the person in the profile table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "attributes", rename_all = "lowercase")]
pub enum ProfileAttributes {
  Student(StudentProfile),
  Faculty(FacultyProfile),
  Staff(StaffProfile),
}

impl ProfileAttributes {
  pub fn role(&self) -> RoleType {
    match self {
      Self::Student(_) => RoleType::Student,
      Self::Faculty(_) => RoleType::Faculty,
      Self::Staff(_) => RoleType::Staff,
    }
  }

  /// Trim text attributes and check every role-specific constraint.
  pub fn validated(mut self) -> Result<Self> {
    let mut v = Validator::new();
    match &mut self {
      Self::Student(p) => {
        p.normalize();
        p.check(&mut v);
      }
      Self::Faculty(p) => {
        p.normalize();
        p.check(&mut v);
      }
      Self::Staff(p) => {
        p.normalize();
        p.check(&mut v);
      }
    }
    v.finish()?;
    Ok(self)
  }

  /// Serialise the inner attributes (without the role tag) for storage.
  pub fn to_json(&self) -> Result<serde_json::Value> {
    let full = serde_json::to_value(self)?;
    Ok(full.get("attributes").cloned().unwrap_or(serde_json::Value::Null))
  }

  /// Rebuild from a stored role tag and attribute payload.
  pub fn from_parts(role: RoleType, attributes: serde_json::Value) -> Result<Self> {
    let wrapped = serde_json::json!({ "role": role, "attributes": attributes });
    Ok(serde_json::from_value(wrapped)?)
  }
}

// ─── RoleProfile ─────────────────────────────────────────────────────────────

/// A profile as stored: the owning person, its attributes, and when it was
/// attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleProfile {
  pub unique_id:   String,
  #[serde(flatten)]
  pub attributes:  ProfileAttributes,
  pub attached_at: DateTime<Utc>,
}

impl RoleProfile {
  pub fn role(&self) -> RoleType { self.attributes.role() }
}

#[cfg(test)]
pub(crate) mod test_helpers {
  use chrono::NaiveDate;

  use super::*;

  pub(crate) fn student(major: &str, entry_year: i32) -> ProfileAttributes {
    ProfileAttributes::Student(StudentProfile {
      national_id_number: Some("123456789".into()),
      highschool_diploma: Some(Diploma {
        kind:   "Bac".into(),
        year:   2020,
        honors: Some("Good".into()),
      }),
      major: major.into(),
      entry_year,
      student_status: StudentStatus::Active,
      faculty: "Science".into(),
      department: "CS".into(),
      group: Some("A".into()),
      scholarship: true,
    })
  }

  pub(crate) fn staff(job_title: &str) -> ProfileAttributes {
    ProfileAttributes::Staff(StaffProfile {
      assigned_department: "Registrar Office".into(),
      job_title:           job_title.into(),
      grade:               StaffGrade::Two,
      entry_date:          NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
    })
  }

  pub(crate) fn faculty(start: NaiveDate, end: Option<NaiveDate>) -> ProfileAttributes {
    ProfileAttributes::Faculty(FacultyProfile {
      rank:                   AcademicRank::Lecturer,
      employment_category:    EmploymentCategory::Tenured,
      appointment_start_date: start,
      primary_department:     "Mathematics".into(),
      secondary_departments:  vec!["Physics".into()],
      office:                 Some("B-204".into()),
      phd_institution:        None,
      research_areas:         None,
      habilitation:           false,
      contract_type:          ContractType::Permanent,
      contract_start_date:    start,
      contract_end_date:      end,
      teaching_hours:         12,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;
  use serde_json::json;

  use super::{test_helpers::*, *};
  use crate::Error;

  fn invalid_fields(err: Error) -> Vec<String> {
    let Error::Validation(errors) = err else { panic!("expected validation error, got {err}") };
    errors.errors().iter().map(|e| e.field.clone()).collect()
  }

  #[test]
  fn entry_year_must_be_positive() {
    assert_eq!(invalid_fields(student("CS", 0).validated().unwrap_err()), ["entry_year"]);
    assert_eq!(invalid_fields(student("CS", -2020).validated().unwrap_err()), ["entry_year"]);
    assert!(student("CS", 2020).validated().is_ok());
  }

  #[test]
  fn blank_required_attributes_rejected() {
    let err = student("   ", 2020).validated().unwrap_err();
    assert_eq!(invalid_fields(err), ["major"]);

    let err = staff("").validated().unwrap_err();
    assert_eq!(invalid_fields(err), ["job_title"]);
  }

  #[test]
  fn contract_end_before_start_rejected() {
    let start = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
    let before = NaiveDate::from_ymd_opt(2025, 8, 31).unwrap();

    let err = faculty(start, Some(before)).validated().unwrap_err();
    assert_eq!(invalid_fields(err), ["contract_end_date"]);
    assert!(faculty(start, Some(start)).validated().is_ok());
    assert!(faculty(start, None).validated().is_ok());
  }

  #[test]
  fn role_follows_variant() {
    assert_eq!(student("CS", 2020).role(), RoleType::Student);
    assert_eq!(staff("Clerk").role(), RoleType::Staff);
    assert_eq!(RoleType::parse("Faculty").unwrap(), RoleType::Faculty);
    assert!(RoleType::parse("alumni").is_err());
  }

  #[test]
  fn storage_parts_keep_role_tag_out_of_payload() {
    let attrs = staff("Clerk");
    let payload = attrs.to_json().unwrap();
    assert!(payload.get("role").is_none());
    assert_eq!(payload["grade"], json!("2"));

    let back = ProfileAttributes::from_parts(RoleType::Staff, payload).unwrap();
    assert_eq!(back, attrs);
  }

  #[test]
  fn student_defaults_apply_when_omitted() {
    let attrs = ProfileAttributes::from_parts(
      RoleType::Student,
      json!({
        "major": "Math",
        "entry_year": 2021,
        "faculty": "Science",
        "department": "Math",
      }),
    )
    .unwrap();

    let ProfileAttributes::Student(p) = attrs else { panic!("expected student") };
    assert_eq!(p.student_status, StudentStatus::Active);
    assert!(!p.scholarship);
    assert_eq!(p.group, None);
  }
}
