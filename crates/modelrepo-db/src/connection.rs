//! SQLite connection setup.
//!
//! Every execution context opens its connection through this module so that
//! journal mode, busy timeout and foreign key enforcement are applied the same
//! way for file-backed and in-memory databases.

use std::path::Path;

use modelrepo_config::{DatabaseConfig, JournalMode};
use rusqlite::Connection;
use tracing::{debug, warn};

use crate::error::Result;

/// Opens the database described by `config`.
///
/// A missing path (or `:memory:`) opens a private in-memory database.
pub fn open(config: &DatabaseConfig) -> Result<Connection> {
    let conn = match config.database_path() {
        Some(path) => {
            debug!("opening database {}", path.display());
            Connection::open(&path)?
        }
        None => {
            debug!("opening in-memory database");
            Connection::open_in_memory()?
        }
    };

    configure(&conn, config.journal_mode(), config)?;
    Ok(conn)
}

/// Opens a database file with the default settings.
pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let path = path.as_ref();
    debug!("opening database {}", path.display());

    let conn = Connection::open(path)?;
    configure(&conn, JournalMode::Wal, &DatabaseConfig::default())?;
    Ok(conn)
}

/// Opens a private in-memory database with the default settings.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn, JournalMode::Memory, &DatabaseConfig::in_memory())?;
    Ok(conn)
}

fn configure(conn: &Connection, journal_mode: JournalMode, config: &DatabaseConfig) -> Result<()> {
    let requested = journal_mode.as_pragma();
    let applied: String =
        conn.pragma_update_and_check(None, "journal_mode", requested, |row| row.get(0))?;
    if !applied.eq_ignore_ascii_case(requested) {
        warn!("journal_mode {} not applied, database uses {}", requested, applied);
    }

    conn.busy_timeout(config.busy_timeout())?;
    conn.pragma_update(None, "foreign_keys", config.foreign_keys())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn pragma<T: rusqlite::types::FromSql>(conn: &Connection, name: &str) -> T {
        conn.pragma_query_value(None, name, |row| row.get(0)).unwrap()
    }

    #[test]
    fn test_open_path_uses_wal() {
        let dir = tempdir().unwrap();
        let conn = open_path(dir.path().join("app.db")).unwrap();

        assert_eq!(pragma::<String>(&conn, "journal_mode").to_lowercase(), "wal");
        assert_eq!(pragma::<i64>(&conn, "foreign_keys"), 1);
    }

    #[test]
    fn test_open_in_memory() {
        let conn = open_in_memory().unwrap();

        assert_eq!(pragma::<String>(&conn, "journal_mode").to_lowercase(), "memory");
        assert_eq!(pragma::<i64>(&conn, "busy_timeout"), 5000);
    }

    #[test]
    fn test_open_from_config() {
        let dir = tempdir().unwrap();
        let config = DatabaseConfig {
            path: Some(dir.path().join("cfg.db").to_string_lossy().into_owned()),
            journal_mode: Some(JournalMode::Delete),
            busy_timeout: Some(250),
            foreign_keys: Some(false),
        };

        let conn = open(&config).unwrap();

        assert_eq!(pragma::<String>(&conn, "journal_mode").to_lowercase(), "delete");
        assert_eq!(pragma::<i64>(&conn, "busy_timeout"), 250);
        assert_eq!(pragma::<i64>(&conn, "foreign_keys"), 0);
    }
}
