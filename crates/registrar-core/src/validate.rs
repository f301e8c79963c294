//! Field-level validation shared by people and role profiles.
//!
//! A [`Validator`] accumulates every violation instead of stopping at the
//! first one, so callers get a complete report per request.

use std::{str::FromStr, sync::OnceLock};

use chrono::NaiveDate;
use regex::Regex;
use strum::VariantNames;

use crate::{Result, error::ValidationErrors};

static EMAIL: OnceLock<Regex> = OnceLock::new();
static DIGITS: OnceLock<Regex> = OnceLock::new();

/// `local@domain.tld`, with dot-separated DNS labels on the right.
fn email_pattern() -> &'static Regex {
  EMAIL.get_or_init(|| {
    Regex::new(
      r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,63}$",
    )
    .expect("email regex must compile")
  })
}

fn digits_pattern() -> &'static Regex {
  DIGITS.get_or_init(|| Regex::new(r"^\d+$").expect("digits regex must compile"))
}

pub const EMAIL_MAX_LEN: usize = 254;

/// Accumulates violations across many fields.
#[derive(Debug, Default)]
pub struct Validator {
  errors: ValidationErrors,
}

impl Validator {
  pub fn new() -> Self { Self::default() }

  /// Required text whose character count must fall in `min..=max`.
  pub fn text(&mut self, field: &str, value: &str, min: usize, max: usize) -> &mut Self {
    let len = value.chars().count();
    if value.is_empty() {
      self.errors.push(field, "this field is required");
    } else if len < min {
      self.errors.push(field, format!("must be at least {min} characters"));
    } else if len > max {
      self.errors.push(field, format!("must be at most {max} characters"));
    }
    self
  }

  /// Optional text; only the upper bound applies when present.
  pub fn optional_text(&mut self, field: &str, value: Option<&str>, max: usize) -> &mut Self {
    if let Some(v) = value
      && v.chars().count() > max
    {
      self.errors.push(field, format!("must be at most {max} characters"));
    }
    self
  }

  /// A registry identifier: required, bounded, no embedded whitespace.
  pub fn identifier(&mut self, field: &str, value: &str, max: usize) -> &mut Self {
    self.text(field, value, 1, max);
    if value.chars().any(char::is_whitespace) {
      self.errors.push(field, "must not contain whitespace");
    }
    self
  }

  pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
    if value.is_empty() {
      self.errors.push(field, "this field is required");
    } else if value.len() > EMAIL_MAX_LEN {
      self.errors.push(field, format!("must be at most {EMAIL_MAX_LEN} characters"));
    } else if !email_pattern().is_match(value) {
      self.errors.push(field, "enter a valid email address");
    }
    self
  }

  /// Required, bounded, and matching `^\d+$`.
  pub fn digits(&mut self, field: &str, value: &str, max: usize) -> &mut Self {
    if value.is_empty() {
      self.errors.push(field, "this field is required");
    } else if !digits_pattern().is_match(value) {
      self.errors.push(field, "must contain only digits");
    } else if value.len() > max {
      self.errors.push(field, format!("must be at most {max} characters"));
    }
    self
  }

  pub fn positive(&mut self, field: &str, value: i64) -> &mut Self {
    if value < 1 {
      self.errors.push(field, "must be a positive integer");
    }
    self
  }

  pub fn non_negative(&mut self, field: &str, value: i64) -> &mut Self {
    if value < 0 {
      self.errors.push(field, "must not be negative");
    }
    self
  }

  /// A required `YYYY-MM-DD` date; `None` after recording a violation.
  pub fn date(&mut self, field: &str, value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
      self.errors.push(field, "this field is required");
      return None;
    }
    match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
      Ok(date) => Some(date),
      Err(_) => {
        self.errors.push(field, format!("{value:?} is not a valid date (expected YYYY-MM-DD)"));
        None
      }
    }
  }

  /// One of a closed set of choices; `None` after recording a violation.
  pub fn choice<T>(&mut self, field: &str, value: &str) -> Option<T>
  where
    T: FromStr + VariantNames,
  {
    match value.trim().parse() {
      Ok(choice) => Some(choice),
      Err(_) => {
        self.errors.push(field, choice_message::<T>(value));
        None
      }
    }
  }

  /// Record `message` against `field` unless `ok` holds.
  pub fn ensure(&mut self, ok: bool, field: &str, message: &str) -> &mut Self {
    if !ok {
      self.errors.push(field, message);
    }
    self
  }

  pub fn finish(self) -> Result<()> { self.errors.into_result() }
}

/// Parse one of a closed set of choices, reporting a validation error that
/// lists the accepted values.
pub fn parse_choice<T>(field: &str, value: &str) -> Result<T>
where
  T: FromStr + VariantNames,
{
  value
    .trim()
    .parse()
    .map_err(|_| ValidationErrors::single(field, choice_message::<T>(value)).into())
}

fn choice_message<T: VariantNames>(value: &str) -> String {
  format!(
    "{value:?} is not a valid choice (expected one of: {})",
    T::VARIANTS.join(", ")
  )
}

// ─── Normalisation ───────────────────────────────────────────────────────────

pub(crate) fn trim(value: &mut String) {
  let trimmed = value.trim();
  if trimmed.len() != value.len() {
    *value = trimmed.to_owned();
  }
}

/// Trim, collapsing blank values to `None`.
pub(crate) fn trim_opt(value: &mut Option<String>) {
  if let Some(v) = value.as_mut() {
    trim(v);
  }
  if value.as_deref().is_some_and(str::is_empty) {
    *value = None;
  }
}
