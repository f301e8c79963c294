//! SQL schema for the Registrar SQLite store.
//!
//! Executed once at connection startup. Every uniqueness and referential
//! rule of the registry lives here as a constraint or trigger, so concurrent
//! writers cannot race past an application-level check.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS persons (
    unique_id      TEXT PRIMARY KEY,
    first_name     TEXT NOT NULL,
    last_name      TEXT NOT NULL,
    date_of_birth  TEXT NOT NULL,   -- YYYY-MM-DD
    place_of_birth TEXT NOT NULL,
    nationality    TEXT NOT NULL,
    gender         TEXT NOT NULL CHECK (gender IN ('M', 'F', 'O')),
    personal_email TEXT NOT NULL COLLATE NOCASE,
    phone          TEXT NOT NULL,
    status         TEXT NOT NULL DEFAULT 'pending'
                   CHECK (status IN ('pending', 'active', 'suspended', 'inactive', 'archived')),
    created_at     TEXT NOT NULL,   -- RFC 3339 UTC, microsecond precision
    updated_at     TEXT NOT NULL,
    -- Lowercased names for case-insensitive search beyond ASCII.
    first_name_folded TEXT NOT NULL,
    last_name_folded  TEXT NOT NULL,
    UNIQUE (personal_email)
);

CREATE INDEX IF NOT EXISTS persons_name_idx   ON persons(last_name, first_name);
CREATE INDEX IF NOT EXISTS persons_status_idx ON persons(status);

CREATE TRIGGER IF NOT EXISTS persons_identity_immutable
BEFORE UPDATE OF unique_id, personal_email ON persons
BEGIN
    SELECT RAISE(ABORT, 'identity fields are immutable');
END;

-- Identifiers of purged persons. Rows are never removed, so an identifier
-- can be claimed at most once for the lifetime of the database.
CREATE TABLE IF NOT EXISTS retired_identities (
    unique_id      TEXT PRIMARY KEY,
    personal_email TEXT NOT NULL COLLATE NOCASE,
    retired_at     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS retired_email_idx ON retired_identities(personal_email);

CREATE TRIGGER IF NOT EXISTS persons_retired_unique_id
BEFORE INSERT ON persons
WHEN EXISTS (SELECT 1 FROM retired_identities WHERE unique_id = NEW.unique_id)
BEGIN
    SELECT RAISE(ABORT, 'retired unique_id');
END;

CREATE TRIGGER IF NOT EXISTS persons_retired_personal_email
BEFORE INSERT ON persons
WHEN EXISTS (SELECT 1 FROM retired_identities WHERE personal_email = NEW.personal_email)
BEGIN
    SELECT RAISE(ABORT, 'retired personal_email');
END;

-- One row per (person, role): the role tag selects the attribute schema.
CREATE TABLE IF NOT EXISTS role_profiles (
    unique_id       TEXT NOT NULL REFERENCES persons(unique_id) ON DELETE CASCADE,
    role            TEXT NOT NULL CHECK (role IN ('student', 'faculty', 'staff')),
    attributes_json TEXT NOT NULL,
    attached_at     TEXT NOT NULL,
    PRIMARY KEY (unique_id, role)
);

-- Append-only. `seq` breaks ties between equal timestamps.
CREATE TABLE IF NOT EXISTS status_history (
    seq        INTEGER PRIMARY KEY AUTOINCREMENT,
    history_id TEXT NOT NULL UNIQUE,
    unique_id  TEXT NOT NULL REFERENCES persons(unique_id) ON DELETE CASCADE,
    old_status TEXT NOT NULL,
    new_status TEXT NOT NULL,
    changed_at TEXT NOT NULL,
    reason     TEXT,
    CHECK (old_status != new_status)
);

CREATE INDEX IF NOT EXISTS status_history_person_idx
    ON status_history(unique_id, changed_at);

CREATE TRIGGER IF NOT EXISTS status_history_append_only
BEFORE UPDATE ON status_history
BEGIN
    SELECT RAISE(ABORT, 'status history is append-only');
END;

-- Directed edges. At most one per ordered pair; never updated in place.
CREATE TABLE IF NOT EXISTS identity_links (
    seq               INTEGER PRIMARY KEY AUTOINCREMENT,
    link_id           TEXT NOT NULL UNIQUE,
    person            TEXT NOT NULL REFERENCES persons(unique_id) ON DELETE CASCADE,
    linked_person     TEXT NOT NULL REFERENCES persons(unique_id) ON DELETE CASCADE,
    relationship_type TEXT NOT NULL CHECK (relationship_type IN ('was_student', 'same_person')),
    created_at        TEXT NOT NULL,
    UNIQUE (person, linked_person),
    CHECK  (person != linked_person)
);

CREATE INDEX IF NOT EXISTS identity_links_target_idx ON identity_links(linked_person);

CREATE TRIGGER IF NOT EXISTS identity_links_immutable
BEFORE UPDATE ON identity_links
BEGIN
    SELECT RAISE(ABORT, 'identity links are immutable');
END;

PRAGMA user_version = 1;
";
