//! Database schema definitions
//!
//! This module contains the SQL schema of the SQLite checkpoint backend.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per saved item; fields is the JSON-encoded record
CREATE TABLE IF NOT EXISTS records (
    item_key TEXT PRIMARY KEY,
    fields TEXT NOT NULL,
    saved_at TEXT NOT NULL
);

-- Completed listing pages
CREATE TABLE IF NOT EXISTS pages (
    page_index INTEGER PRIMARY KEY,
    completed_at TEXT NOT NULL
);

-- Single-row resumption cursor and the index of the page it names
CREATE TABLE IF NOT EXISTS cursor (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    token TEXT NOT NULL,
    page_index INTEGER,
    updated_at TEXT NOT NULL
);

-- Items skipped after a permanent failure
CREATE TABLE IF NOT EXISTS failures (
    item_key TEXT PRIMARY KEY,
    reason TEXT NOT NULL,
    failed_at TEXT NOT NULL
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
