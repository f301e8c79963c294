//! Status history and the transition policy.
//!
//! Every change of [`Person::status`](crate::person::Person) is paired with
//! exactly one [`StatusHistory`] row written in the same transaction. History
//! rows are append-only.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Result, error::ValidationErrors, person::PersonStatus};

// ─── History ─────────────────────────────────────────────────────────────────

/// An immutable audit record of one status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHistory {
  pub history_id: Uuid,
  pub unique_id:  String,
  pub old_status: PersonStatus,
  pub new_status: PersonStatus,
  /// Equal to the person's `updated_at` after the transition.
  pub changed_at: DateTime<Utc>,
  pub reason:     Option<String>,
}

/// Blank reasons are stored as no reason at all.
pub fn normalize_reason(reason: Option<String>) -> Option<String> {
  reason
    .map(|r| r.trim().to_owned())
    .filter(|r| !r.is_empty())
}

// ─── Policy ──────────────────────────────────────────────────────────────────

/// Which status transitions the registry accepts.
///
/// `Permissive` accepts any move to a different status. `Restricted` accepts
/// only the listed `from → to` pairs. Self-transitions are rejected under
/// every policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TransitionPolicy {
  #[default]
  Permissive,
  Restricted(BTreeMap<PersonStatus, BTreeSet<PersonStatus>>),
}

impl TransitionPolicy {
  /// Build a restricted policy from an adjacency list.
  pub fn restricted<I, T>(table: I) -> Self
  where
    I: IntoIterator<Item = (PersonStatus, T)>,
    T: IntoIterator<Item = PersonStatus>,
  {
    Self::Restricted(
      table
        .into_iter()
        .map(|(from, to)| (from, to.into_iter().collect()))
        .collect(),
    )
  }

  pub fn allows(&self, from: PersonStatus, to: PersonStatus) -> bool {
    if from == to {
      return false;
    }
    match self {
      Self::Permissive => true,
      Self::Restricted(table) => table.get(&from).is_some_and(|allowed| allowed.contains(&to)),
    }
  }

  /// Reject a transition as a validation error on `new_status`.
  pub fn check(&self, from: PersonStatus, to: PersonStatus) -> Result<()> {
    if from == to {
      return Err(ValidationErrors::single("new_status", format!("status is already {to}")).into());
    }
    if !self.allows(from, to) {
      return Err(
        ValidationErrors::single(
          "new_status",
          format!("transition from {from} to {to} is not permitted"),
        )
        .into(),
      );
    }
    Ok(())
  }
}
