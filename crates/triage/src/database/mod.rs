//! The persistent article store.
//!
//! Articles are keyed by `link`, and every insert is insert-if-absent, so re-running a batch
//! after a partial failure never creates duplicate rows. Operations are expressed as
//! [`DatabaseInstruction`] values executed against a [`Database`].
//!
//! # Examples
//!
//! ```no_run
//! use triage::{article::Article, database::*, prelude::*};
//!
//! # fn example() -> Result<()> {
//! let mut db = Database::open(Database::default_path())?;
//!
//! let article = Article::new("https://journal.example/a1", "Protein folding at scale");
//! let inserted = InsertArticles::new(vec![article.clone()]).execute(&mut db)?;
//! assert_eq!(inserted, 1);
//!
//! // Second run of the same batch is a no-op
//! assert_eq!(InsertArticles::new(vec![article]).execute(&mut db)?, 0);
//! # Ok(())
//! # }
//! ```

use rusqlite::{
  types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
  Connection, ToSql,
};

use super::*;

pub mod instruction;

pub use self::instruction::*;

/// Main database connection handler
pub struct Database {
  /// Underlying SQLite connection
  conn: Connection,
}

impl Database {
  /// Opens an existing database or creates a new one at the specified path.
  ///
  /// Parent directories are created as needed and the schema is applied idempotently.
  pub fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
      std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    conn
      .execute_batch(include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/migrations/init.sql")))?;
    debug!(path = %path.display(), "Opened article store");
    Ok(Self { conn })
  }

  /// Opens a fresh in-memory database.
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()?;
    conn
      .execute_batch(include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/migrations/init.sql")))?;
    Ok(Self { conn })
  }

  /// Returns the default path for the database file.
  ///
  /// The path is constructed as follows:
  /// - On Unix: `~/.local/share/triage/triage.db`
  /// - On macOS: `~/Library/Application Support/triage/triage.db`
  /// - On Windows: `%APPDATA%\triage\triage.db`
  /// - Fallback: `./triage/triage.db` in the current directory
  pub fn default_path() -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join("triage").join("triage.db")
  }
}

impl ToSql for Priority {
  fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> { Ok(self.as_str().into()) }
}

impl FromSql for Priority {
  fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
    value.as_str()?.parse().map_err(|e: TriageError| FromSqlError::Other(Box::new(e)))
  }
}
