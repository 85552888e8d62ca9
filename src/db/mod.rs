//! Host database access using SQLite
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use thiserror::Error;
use tracing::info;

pub mod snippets;
pub mod transients;

/// Layout of the host tables this tool touches. Only used to create local
/// fixtures; the production tables belong to the host application.
const HOST_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS {snippets} (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL DEFAULT '',
    code TEXT NOT NULL DEFAULT '',
    code_type TEXT NOT NULL DEFAULT 'js',
    active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS {options} (
    option_id INTEGER PRIMARY KEY AUTOINCREMENT,
    option_name TEXT NOT NULL UNIQUE,
    option_value TEXT NOT NULL DEFAULT '',
    autoload TEXT NOT NULL DEFAULT 'yes'
);
"#;

/// Errors reported by the host store. The message is the store's own
/// diagnostic text and is shown to the operator as-is.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Read/write access to snippet payloads.
pub trait SnippetStore {
    /// Payload of the snippet with `id`, or `None` when no row matches.
    fn fetch_code(&self, id: i64) -> Result<Option<String>, StoreError>;

    /// Overwrite the payload of `id`, returning the number of rows updated.
    fn update_code(&self, id: i64, code: &str) -> Result<usize, StoreError>;
}

/// A wrapper around a SQLite connection to the host database.
pub struct Db {
    pub(crate) conn: Connection,
    snippets_table: String,
    options_table: String,
}

impl Db {
    /// Open the existing host database at `path`; a missing file is an error.
    /// Table names are built from `table_prefix`, which must already be validated.
    pub fn open<P: AsRef<Path>>(path: P, table_prefix: &str) -> Result<Self, StoreError> {
        let path = path.as_ref();
        info!("Opening host database: {}", path.display());

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
                | OpenFlags::SQLITE_OPEN_URI,
        )?;
        Ok(Self::with_connection(conn, table_prefix))
    }

    /// Open an in-memory database with the host tables created (useful for testing).
    pub fn open_in_memory(table_prefix: &str) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let db = Self::with_connection(conn, table_prefix);
        db.create_host_tables()?;
        Ok(db)
    }

    fn with_connection(conn: Connection, table_prefix: &str) -> Self {
        Self {
            conn,
            snippets_table: format!("{table_prefix}wpcode_snippets"),
            options_table: format!("{table_prefix}options"),
        }
    }

    /// Create the host tables if they are missing, for local copies and fixtures.
    pub fn create_host_tables(&self) -> Result<(), StoreError> {
        let sql = HOST_SCHEMA_SQL
            .replace("{snippets}", &self.snippets_table)
            .replace("{options}", &self.options_table);
        self.conn.execute_batch(&sql)?;
        Ok(())
    }
}
