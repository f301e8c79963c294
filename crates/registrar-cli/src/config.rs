//! `registrar.toml` loading.

use std::{
  collections::BTreeMap,
  path::{Path, PathBuf},
};

use anyhow::Context as _;
use registrar_core::{lifecycle::TransitionPolicy, person::PersonStatus};
use serde::Deserialize;

/// Shape of the configuration file, after environment overrides.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrarConfig {
  /// SQLite database file; a leading `~/` is expanded.
  #[serde(default = "default_store_path")]
  pub store_path:  PathBuf,
  /// Allowed `from → [to…]` status moves. Absent means any move to a
  /// different status is allowed.
  #[serde(default)]
  pub transitions: Option<BTreeMap<PersonStatus, Vec<PersonStatus>>>,
}

fn default_store_path() -> PathBuf { PathBuf::from("registrar.db") }

impl RegistrarConfig {
  /// Read `path` (if it exists) overlaid by `REGISTRAR_*` variables.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("REGISTRAR"))
      .build()
      .with_context(|| format!("failed to read config file {}", path.display()))?;

    settings
      .try_deserialize()
      .context("failed to deserialise registrar config")
  }

  pub fn store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }

  pub fn policy(&self) -> TransitionPolicy {
    match &self.transitions {
      Some(table) => TransitionPolicy::restricted(table.clone()),
      None => TransitionPolicy::Permissive,
    }
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use config::{Config, File, FileFormat};

  use super::*;

  fn parse(toml: &str) -> RegistrarConfig {
    Config::builder()
      .add_source(File::from_str(toml, FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn defaults_to_permissive_local_store() {
    let cfg = parse("");
    assert_eq!(cfg.store_path, PathBuf::from("registrar.db"));
    assert_eq!(cfg.policy(), TransitionPolicy::Permissive);
  }

  #[test]
  fn transitions_table_restricts_policy() {
    let cfg = parse(
      r#"
        store_path = "/var/lib/registrar/registry.db"

        [transitions]
        pending = ["active", "archived"]
        active  = ["suspended"]
      "#,
    );

    let policy = cfg.policy();
    assert!(policy.allows(PersonStatus::Pending, PersonStatus::Active));
    assert!(policy.allows(PersonStatus::Active, PersonStatus::Suspended));
    assert!(!policy.allows(PersonStatus::Active, PersonStatus::Archived));
    assert!(!policy.allows(PersonStatus::Suspended, PersonStatus::Active));
  }

  #[test]
  fn unknown_status_in_table_is_rejected() {
    let result = Config::builder()
      .add_source(File::from_str("[transitions]\npending = [\"deleted\"]", FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize::<RegistrarConfig>();
    assert!(result.is_err());
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else {
      return;
    };
    assert_eq!(
      expand_tilde(Path::new("~/registry.db")),
      PathBuf::from(home).join("registry.db")
    );
    assert_eq!(expand_tilde(Path::new("/tmp/x.db")), PathBuf::from("/tmp/x.db"));
  }
}
