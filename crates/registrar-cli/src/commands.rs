//! Subcommands and their dispatch onto an [`IdentityStore`].
//!
//! Every command prints the affected record (or list of records) as JSON.

use clap::{Args, Subcommand};
use registrar_core::{
  ValidationErrors,
  link::RelationshipType,
  person::{PatchForm, PersonQuery, PersonStatus, RegistrationForm},
  profile::{ProfileAttributes, RoleType},
  store::IdentityStore,
};
use serde_json::{Value, json};

#[derive(Debug, Subcommand)]
pub enum Command {
  /// Register, inspect and maintain people.
  #[command(subcommand)]
  Person(PersonCommand),

  /// Attach and detach role profiles.
  #[command(subcommand)]
  Profile(ProfileCommand),

  /// Change a person's lifecycle status or read its history.
  #[command(subcommand)]
  Status(StatusCommand),

  /// Manage directed identity links between people.
  #[command(subcommand)]
  Link(LinkCommand),
}

// ─── person ──────────────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum PersonCommand {
  /// Register a new person (status starts as `pending`).
  Create(CreateArgs),
  Get {
    unique_id: String,
  },
  /// Change descriptive fields; identity fields and status are fixed.
  Update(UpdateArgs),
  List(ListArgs),
  /// Permanently delete an archived person and retire their identifiers.
  Purge {
    unique_id: String,
  },
}

#[derive(Debug, Args)]
pub struct CreateArgs {
  #[arg(long)]
  unique_id:      String,
  #[arg(long)]
  first_name:     String,
  #[arg(long)]
  last_name:      String,
  /// YYYY-MM-DD.
  #[arg(long)]
  date_of_birth:  String,
  #[arg(long)]
  place_of_birth: String,
  #[arg(long)]
  nationality:    String,
  /// M, F or O.
  #[arg(long)]
  gender:         String,
  #[arg(long)]
  email:          String,
  #[arg(long)]
  phone:          String,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
  unique_id:      String,
  #[arg(long)]
  first_name:     Option<String>,
  #[arg(long)]
  last_name:      Option<String>,
  /// YYYY-MM-DD.
  #[arg(long)]
  date_of_birth:  Option<String>,
  #[arg(long)]
  place_of_birth: Option<String>,
  #[arg(long)]
  nationality:    Option<String>,
  #[arg(long)]
  gender:         Option<String>,
  #[arg(long)]
  phone:          Option<String>,
}

#[derive(Debug, Args)]
pub struct ListArgs {
  #[arg(long)]
  status: Option<String>,
  /// Case-insensitive fragment of the first or last name.
  #[arg(long)]
  name:   Option<String>,
  #[arg(long)]
  limit:  Option<usize>,
  #[arg(long)]
  offset: Option<usize>,
}

// ─── profile ─────────────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
  /// Attach a profile given as `{"role": "...", "attributes": {...}}`.
  Attach {
    unique_id: String,
    #[arg(long)]
    json:      String,
  },
  Detach {
    unique_id: String,
    role:      String,
  },
  Get {
    unique_id: String,
    role:      String,
  },
  List {
    unique_id: String,
  },
}

// ─── status ──────────────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum StatusCommand {
  Set {
    unique_id: String,
    status:    String,
    #[arg(long)]
    reason:    Option<String>,
  },
  /// Transitions, newest first.
  History {
    unique_id: String,
  },
}

// ─── link ────────────────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum LinkCommand {
  /// Link FROM to TO. The reverse edge is not created.
  Add {
    from:         String,
    to:           String,
    #[arg(long, default_value = "was_student")]
    relationship: String,
  },
  Remove {
    from: String,
    to:   String,
  },
  /// Outgoing links of a person, or incoming ones with `--incoming`.
  List {
    unique_id: String,
    #[arg(long)]
    incoming:  bool,
  },
}

// ─── Dispatch ────────────────────────────────────────────────────────────────

/// Run `command` against `store`, returning the JSON to print.
pub async fn execute<S: IdentityStore>(store: &S, command: Command) -> anyhow::Result<Value> {
  match command {
    Command::Person(cmd) => person(store, cmd).await,
    Command::Profile(cmd) => profile(store, cmd).await,
    Command::Status(cmd) => status(store, cmd).await,
    Command::Link(cmd) => link(store, cmd).await,
  }
}

async fn person<S: IdentityStore>(store: &S, cmd: PersonCommand) -> anyhow::Result<Value> {
  let value = match cmd {
    PersonCommand::Create(args) => {
      let input = RegistrationForm {
        unique_id:      args.unique_id,
        first_name:     args.first_name,
        last_name:      args.last_name,
        date_of_birth:  args.date_of_birth,
        place_of_birth: args.place_of_birth,
        nationality:    args.nationality,
        gender:         args.gender,
        personal_email: args.email,
        phone:          args.phone,
      }
      .parse()?;
      serde_json::to_value(store.create_person(input).await?)?
    }
    PersonCommand::Get { unique_id } => serde_json::to_value(store.get_person(&unique_id).await?)?,
    PersonCommand::Update(args) => {
      let patch = PatchForm {
        first_name:     args.first_name,
        last_name:      args.last_name,
        date_of_birth:  args.date_of_birth,
        place_of_birth: args.place_of_birth,
        nationality:    args.nationality,
        gender:         args.gender,
        phone:          args.phone,
      }
      .parse()?;
      serde_json::to_value(store.update_person(&args.unique_id, patch).await?)?
    }
    PersonCommand::List(args) => {
      let query = PersonQuery {
        status: args.status.as_deref().map(PersonStatus::parse).transpose()?,
        name:   args.name,
        limit:  args.limit,
        offset: args.offset,
      };
      serde_json::to_value(store.list_persons(&query).await?)?
    }
    PersonCommand::Purge { unique_id } => {
      serde_json::to_value(store.purge_person(&unique_id).await?)?
    }
  };
  Ok(value)
}

async fn profile<S: IdentityStore>(store: &S, cmd: ProfileCommand) -> anyhow::Result<Value> {
  let value = match cmd {
    ProfileCommand::Attach { unique_id, json } => {
      let attributes: ProfileAttributes = serde_json::from_str(&json)
        .map_err(|e| registrar_core::Error::from(ValidationErrors::single("attributes", e.to_string())))?;
      serde_json::to_value(store.attach_profile(&unique_id, attributes).await?)?
    }
    ProfileCommand::Detach { unique_id, role } => {
      let role = RoleType::parse(&role)?;
      serde_json::to_value(store.detach_profile(&unique_id, role).await?)?
    }
    ProfileCommand::Get { unique_id, role } => {
      let role = RoleType::parse(&role)?;
      serde_json::to_value(store.get_profile(&unique_id, role).await?)?
    }
    ProfileCommand::List { unique_id } => {
      serde_json::to_value(store.list_profiles(&unique_id).await?)?
    }
  };
  Ok(value)
}

async fn status<S: IdentityStore>(store: &S, cmd: StatusCommand) -> anyhow::Result<Value> {
  let value = match cmd {
    StatusCommand::Set {
      unique_id,
      status,
      reason,
    } => {
      let status = PersonStatus::parse(&status)?;
      let (person, entry) = store.change_status(&unique_id, status, reason).await?;
      json!({ "person": person, "history": entry })
    }
    StatusCommand::History { unique_id } => {
      serde_json::to_value(store.get_history(&unique_id).await?)?
    }
  };
  Ok(value)
}

async fn link<S: IdentityStore>(store: &S, cmd: LinkCommand) -> anyhow::Result<Value> {
  let value = match cmd {
    LinkCommand::Add {
      from,
      to,
      relationship,
    } => {
      let relationship = RelationshipType::parse(&relationship)?;
      serde_json::to_value(store.create_link(&from, &to, relationship).await?)?
    }
    LinkCommand::Remove { from, to } => serde_json::to_value(store.remove_link(&from, &to).await?)?,
    LinkCommand::List {
      unique_id,
      incoming: false,
    } => serde_json::to_value(store.outgoing_links(&unique_id).await?)?,
    LinkCommand::List {
      unique_id,
      incoming: true,
    } => serde_json::to_value(store.incoming_links(&unique_id).await?)?,
  };
  Ok(value)
}

#[cfg(test)]
mod tests {
  use clap::Parser;
  use registrar_core::ErrorKind;
  use registrar_store_sqlite::SqliteStore;

  use super::*;
  use crate::error_kind;

  #[derive(Parser)]
  struct TestCli {
    #[command(subcommand)]
    command: Command,
  }

  async fn run(store: &SqliteStore, args: &[&str]) -> anyhow::Result<Value> {
    let cli = TestCli::try_parse_from(std::iter::once("registrar").chain(args.iter().copied()))?;
    execute(store, cli.command).await
  }

  async fn register(store: &SqliteStore, unique_id: &str, email: &str) {
    run(store, &[
      "person",
      "create",
      "--unique-id",
      unique_id,
      "--first-name",
      "Karim",
      "--last-name",
      "Saadi",
      "--date-of-birth",
      "1999-11-02",
      "--place-of-birth",
      "Constantine",
      "--nationality",
      "Algerian",
      "--gender",
      "m",
      "--email",
      email,
      "--phone",
      "0550000000",
    ])
    .await
    .unwrap();
  }

  #[tokio::test]
  async fn create_then_get_prints_person() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    register(&store, "STU-9", "karim@example.org").await;

    let value = run(&store, &["person", "get", "STU-9"]).await.unwrap();
    assert_eq!(value["unique_id"], "STU-9");
    assert_eq!(value["gender"], "M");
    assert_eq!(value["status"], "pending");
  }

  fn invalid_fields(err: &anyhow::Error) -> Vec<String> {
    match err.downcast_ref::<registrar_core::Error>() {
      Some(registrar_core::Error::Validation(v)) => {
        v.errors().iter().map(|e| e.field.clone()).collect()
      }
      _ => panic!("expected validation error, got {err:#}"),
    }
  }

  #[tokio::test]
  async fn create_reports_every_bad_field() {
    let store = SqliteStore::open_in_memory().await.unwrap();

    let err = run(&store, &[
      "person",
      "create",
      "--unique-id",
      "STU-10",
      "--first-name",
      "A",
      "--last-name",
      "B",
      "--date-of-birth",
      "02/11/1999",
      "--place-of-birth",
      "Constantine",
      "--nationality",
      "Algerian",
      "--gender",
      "Z",
      "--email",
      "bad",
      "--phone",
      "12-3",
    ])
    .await
    .unwrap_err();

    assert_eq!(error_kind(&err), Some(ErrorKind::Validation));
    assert_eq!(invalid_fields(&err), [
      "date_of_birth",
      "gender",
      "first_name",
      "last_name",
      "personal_email",
      "phone",
    ]);
    assert!(run(&store, &["person", "get", "STU-10"]).await.is_err());
  }

  #[tokio::test]
  async fn update_reports_bad_gender_and_date_together() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    register(&store, "STU-9", "karim@example.org").await;

    let err = run(&store, &[
      "person",
      "update",
      "STU-9",
      "--gender",
      "x",
      "--date-of-birth",
      "yesterday",
    ])
    .await
    .unwrap_err();
    assert_eq!(invalid_fields(&err), ["date_of_birth", "gender"]);

    let value = run(&store, &["person", "update", "STU-9", "--gender", "f"])
      .await
      .unwrap();
    assert_eq!(value["gender"], "F");
  }

  #[tokio::test]
  async fn unknown_choice_is_validation_error() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    register(&store, "STU-9", "karim@example.org").await;

    let err = run(&store, &["status", "set", "STU-9", "expelled"])
      .await
      .unwrap_err();
    assert_eq!(error_kind(&err), Some(ErrorKind::Validation));
  }

  #[tokio::test]
  async fn status_set_reports_person_and_history() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    register(&store, "STU-9", "karim@example.org").await;

    let value = run(&store, &["status", "set", "STU-9", "active", "--reason", "enrolled"])
      .await
      .unwrap();
    assert_eq!(value["person"]["status"], "active");
    assert_eq!(value["history"]["old_status"], "pending");
    assert_eq!(value["history"]["reason"], "enrolled");

    let history = run(&store, &["status", "history", "STU-9"]).await.unwrap();
    assert_eq!(history.as_array().map(Vec::len), Some(1));
  }

  #[tokio::test]
  async fn attach_profile_from_json() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    register(&store, "STF-1", "karim@example.org").await;

    let attrs = r#"{"role":"staff","attributes":{"assigned_department":"Finance","job_title":"Accountant","grade":"1","entry_date":"2022-01-10"}}"#;
    let value = run(&store, &["profile", "attach", "STF-1", "--json", attrs])
      .await
      .unwrap();
    assert_eq!(value["role"], "staff");
    assert_eq!(value["attributes"]["job_title"], "Accountant");

    let err = run(&store, &["profile", "attach", "STF-1", "--json", attrs])
      .await
      .unwrap_err();
    assert_eq!(error_kind(&err), Some(ErrorKind::Conflict));

    let err = run(&store, &["profile", "attach", "STF-1", "--json", "{}"])
      .await
      .unwrap_err();
    assert_eq!(error_kind(&err), Some(ErrorKind::Validation));
  }

  #[tokio::test]
  async fn incoming_flag_selects_direction() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    register(&store, "STU-9", "karim@example.org").await;
    register(&store, "FAC-9", "k.saadi@example.org").await;

    run(&store, &["link", "add", "FAC-9", "STU-9"]).await.unwrap();

    let incoming = run(&store, &["link", "list", "STU-9", "--incoming"])
      .await
      .unwrap();
    assert_eq!(incoming[0]["person"], "FAC-9");
    assert_eq!(incoming[0]["relationship_type"], "was_student");

    let outgoing = run(&store, &["link", "list", "STU-9"]).await.unwrap();
    assert_eq!(outgoing, json!([]));

    let err = run(&store, &["link", "remove", "STU-9", "FAC-9"])
      .await
      .unwrap_err();
    assert_eq!(error_kind(&err), Some(ErrorKind::NotFound));
  }
}
