//! Identity links: typed, directed edges between two people.
//!
//! Links are never symmetrised: `A → B` says nothing about `B → A`. Callers
//! that want both directions create both edges.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr, VariantNames};
use uuid::Uuid;

use crate::{
  Result,
  error::ValidationErrors,
  validate::parse_choice,
};

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum RelationshipType {
  /// The target record is this person's earlier student identity.
  #[default]
  WasStudent,
  /// Both records describe the same human.
  SamePerson,
}

impl RelationshipType {
  pub fn as_str(self) -> &'static str { self.into() }

  pub fn parse(value: &str) -> Result<Self> { parse_choice("relationship_type", value) }
}

/// A directed edge `person → linked_person`. At most one edge exists per
/// ordered pair, whatever its relationship type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityLink {
  pub link_id:           Uuid,
  pub person:            String,
  pub linked_person:     String,
  pub relationship_type: RelationshipType,
  pub created_at:        DateTime<Utc>,
}

/// Reject self-links before the store is consulted.
pub fn check_endpoints(person: &str, linked_person: &str) -> Result<()> {
  if person == linked_person {
    return Err(
      ValidationErrors::single("linked_person", "a person cannot be linked to itself").into(),
    );
  }
  Ok(())
}
