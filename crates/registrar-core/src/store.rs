//! The `IdentityStore` trait.
//!
//! The trait is implemented by storage backends (e.g.
//! `registrar-store-sqlite`). Adapters such as the CLI depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use crate::{
  lifecycle::StatusHistory,
  link::{IdentityLink, RelationshipType},
  person::{NewPerson, Person, PersonPatch, PersonQuery, PersonStatus},
  profile::{ProfileAttributes, RoleProfile, RoleType},
};

/// Abstraction over a registry backend.
///
/// Implementations must enforce uniqueness of `unique_id`, `personal_email`,
/// `(person, role)` and `(person, linked_person)` inside the store itself,
/// and must apply every multi-row write atomically. Validation, conflict and
/// not-found failures surface as [`crate::Error`] converted into
/// `Self::Error`.
///
/// All methods return `Send` futures so the trait can be used from a
/// multi-threaded runtime.
pub trait IdentityStore: Send + Sync {
  type Error: std::error::Error + From<crate::Error> + Send + Sync + 'static;

  // ── People ────────────────────────────────────────────────────────────

  /// Validate and register a new person with status `pending`.
  fn create_person(
    &self,
    input: NewPerson,
  ) -> impl Future<Output = Result<Person, Self::Error>> + Send;

  fn get_person(
    &self,
    unique_id: &str,
  ) -> impl Future<Output = Result<Person, Self::Error>> + Send;

  /// Apply a validated partial update and refresh `updated_at`.
  fn update_person(
    &self,
    unique_id: &str,
    patch: PersonPatch,
  ) -> impl Future<Output = Result<Person, Self::Error>> + Send;

  fn list_persons(
    &self,
    query: &PersonQuery,
  ) -> impl Future<Output = Result<Vec<Person>, Self::Error>> + Send;

  /// Permanently remove an archived person together with its profiles,
  /// history and links. Its `unique_id` and `personal_email` stay reserved.
  fn purge_person(
    &self,
    unique_id: &str,
  ) -> impl Future<Output = Result<Person, Self::Error>> + Send;

  // ── Role profiles ─────────────────────────────────────────────────────

  /// Attach the profile for `attributes.role()`; at most one per role.
  fn attach_profile(
    &self,
    unique_id: &str,
    attributes: ProfileAttributes,
  ) -> impl Future<Output = Result<RoleProfile, Self::Error>> + Send;

  /// Remove and return a profile. Leaves the person's status untouched.
  fn detach_profile(
    &self,
    unique_id: &str,
    role: RoleType,
  ) -> impl Future<Output = Result<RoleProfile, Self::Error>> + Send;

  fn get_profile(
    &self,
    unique_id: &str,
    role: RoleType,
  ) -> impl Future<Output = Result<RoleProfile, Self::Error>> + Send;

  fn list_profiles(
    &self,
    unique_id: &str,
  ) -> impl Future<Output = Result<Vec<RoleProfile>, Self::Error>> + Send;

  // ── Lifecycle ─────────────────────────────────────────────────────────

  /// Move a person to `new_status` and append the matching history row in
  /// one transaction.
  fn change_status(
    &self,
    unique_id: &str,
    new_status: PersonStatus,
    reason: Option<String>,
  ) -> impl Future<Output = Result<(Person, StatusHistory), Self::Error>> + Send;

  /// Status history, newest first.
  fn get_history(
    &self,
    unique_id: &str,
  ) -> impl Future<Output = Result<Vec<StatusHistory>, Self::Error>> + Send;

  // ── Links ─────────────────────────────────────────────────────────────

  fn create_link(
    &self,
    person: &str,
    linked_person: &str,
    relationship_type: RelationshipType,
  ) -> impl Future<Output = Result<IdentityLink, Self::Error>> + Send;

  /// Remove and return the edge `person → linked_person`.
  fn remove_link(
    &self,
    person: &str,
    linked_person: &str,
  ) -> impl Future<Output = Result<IdentityLink, Self::Error>> + Send;

  /// Edges whose source is `unique_id`, in insertion order.
  fn outgoing_links(
    &self,
    unique_id: &str,
  ) -> impl Future<Output = Result<Vec<IdentityLink>, Self::Error>> + Send;

  /// Edges whose target is `unique_id`, in insertion order.
  fn incoming_links(
    &self,
    unique_id: &str,
  ) -> impl Future<Output = Result<Vec<IdentityLink>, Self::Error>> + Send;
}
