//! Core types and trait definitions for the Registrar identity registry.
//!
//! This crate is deliberately free of database and I/O dependencies. It owns
//! the domain model, field validation, the transition policy and the
//! [`store::IdentityStore`] contract that backends implement.

pub mod error;
pub mod lifecycle;
pub mod link;
pub mod person;
pub mod profile;
pub mod store;
pub mod validate;

pub use error::{Conflict, Error, ErrorKind, NotFound, Result, ValidationErrors};
