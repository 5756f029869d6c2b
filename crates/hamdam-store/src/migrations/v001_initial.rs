//! v001 -- Initial schema creation.
//!
//! Every slice is one JSON document keyed by its slice name. Slices are
//! independent: there are no foreign keys and no multi-row transactions.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS slices (
    key        TEXT PRIMARY KEY NOT NULL,   -- e.g. "ai-users"
    json       TEXT NOT NULL,               -- serialized slice document
    updated_at TEXT NOT NULL                -- RFC-3339
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
