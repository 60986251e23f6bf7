use std::{fs, path::Path, path::PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ConfigError, Result};

const MAX_BUSY_TIMEOUT: u64 = 600_000;
const IN_MEMORY: &str = ":memory:";

/// Application's configuration
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Config {
    /// How execution contexts open their SQLite connection.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Defaults applied by repositories.
    #[serde(default)]
    pub repository: RepositoryConfig,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    /// Default: in-memory database
    pub path: Option<String>,

    /// SQLite journal mode.
    /// Default: wal (memory for in-memory databases)
    pub journal_mode: Option<JournalMode>,

    /// How long a connection waits on a locked database, in milliseconds.
    /// Default: 5000
    pub busy_timeout: Option<u64>,

    /// Enforce foreign key constraints.
    /// Default: true
    pub foreign_keys: Option<bool>,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    Wal,
    Delete,
    Memory,
}

impl JournalMode {
    pub fn as_pragma(&self) -> &'static str {
        match self {
            JournalMode::Wal => "WAL",
            JournalMode::Delete => "DELETE",
            JournalMode::Memory => "MEMORY",
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct RepositoryConfig {
    /// Whether NULL values in an update payload overwrite stored values.
    /// Default: exclude_none
    pub null_policy: Option<NullPolicy>,
}

/// What an update does with incoming NULL values.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NullPolicy {
    /// NULL means "not supplied"; the stored value is kept.
    #[default]
    ExcludeNone,
    /// NULL is written through.
    IncludeNone,
}

impl Config {
    /// Loads the configuration named by `MODELREPO_CONFIG`.
    /// Without the variable, or if the file does not exist, the defaults are used.
    pub fn new() -> Result<Self> {
        match std::env::var("MODELREPO_CONFIG") {
            Ok(path) => Self::load(path),
            Err(_) => {
                let mut config = Self::default();
                config.resolve()?;
                Ok(config)
            }
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let mut config: Config = match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Config file {} not found, using defaults", path.display());
                Self::default()
            }
            Err(err) => return Err(ConfigError::IoError(err)),
        };

        config.resolve()?;

        Ok(config)
    }

    pub fn resolve(&mut self) -> Result<()> {
        let database = &mut self.database;

        if let Some(path) = &database.path {
            if path.trim().is_empty() {
                return Err(ConfigError::InvalidDatabasePath(path.clone()));
            }
        }

        if let Some(timeout) = database.busy_timeout {
            if timeout > MAX_BUSY_TIMEOUT {
                return Err(ConfigError::InvalidBusyTimeout(timeout));
            }
        }

        let in_memory = database.is_in_memory();
        match database.journal_mode {
            Some(JournalMode::Wal) if in_memory => {
                warn!("WAL journal mode is not available for in-memory databases, using memory");
                database.journal_mode = Some(JournalMode::Memory);
            }
            None if in_memory => database.journal_mode = Some(JournalMode::Memory),
            None => database.journal_mode = Some(JournalMode::Wal),
            Some(_) => {}
        }

        database.busy_timeout.get_or_insert(5000);
        database.foreign_keys.get_or_insert(true);
        self.repository
            .null_policy
            .get_or_insert(NullPolicy::ExcludeNone);

        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let serialized = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serialized)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

impl DatabaseConfig {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            journal_mode: Some(JournalMode::Memory),
            busy_timeout: Some(5000),
            foreign_keys: Some(true),
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path().is_none()
    }

    /// Resolved database file, `None` for an in-memory database.
    /// `MODELREPO_DB` overrides the configured path.
    pub fn database_path(&self) -> Option<PathBuf> {
        if let Ok(env_path) = std::env::var("MODELREPO_DB") {
            return (env_path != IN_MEMORY).then(|| PathBuf::from(env_path));
        }
        match self.path.as_deref() {
            None | Some(IN_MEMORY) => None,
            Some(path) => Some(PathBuf::from(path)),
        }
    }

    pub fn journal_mode(&self) -> JournalMode {
        self.journal_mode.unwrap_or(if self.is_in_memory() {
            JournalMode::Memory
        } else {
            JournalMode::Wal
        })
    }

    pub fn busy_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.busy_timeout.unwrap_or(5000))
    }

    pub fn foreign_keys(&self) -> bool {
        self.foreign_keys.unwrap_or(true)
    }
}

impl RepositoryConfig {
    pub fn null_policy(&self) -> NullPolicy {
        self.null_policy.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;
    use crate::test_utils::with_env;

    #[test]
    #[serial]
    fn test_default_config_resolves_to_in_memory() {
        with_env(vec![("MODELREPO_CONFIG", None), ("MODELREPO_DB", None)], || {
            let config = Config::new().unwrap();

            assert!(config.database.is_in_memory());
            assert_eq!(config.database.journal_mode, Some(JournalMode::Memory));
            assert_eq!(config.database.busy_timeout, Some(5000));
            assert_eq!(config.database.foreign_keys, Some(true));
            assert_eq!(config.repository.null_policy(), NullPolicy::ExcludeNone);
        });
    }

    #[test]
    #[serial]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[database]
path = "/var/lib/app/app.db"
busy_timeout = 250

[repository]
null_policy = "include_none"
"#,
        )
        .unwrap();

        with_env(vec![("MODELREPO_DB", None)], || {
            let config = Config::load(&path).unwrap();

            assert_eq!(
                config.database.database_path(),
                Some(PathBuf::from("/var/lib/app/app.db"))
            );
            assert_eq!(config.database.journal_mode(), JournalMode::Wal);
            assert_eq!(
                config.database.busy_timeout(),
                std::time::Duration::from_millis(250)
            );
            assert_eq!(config.repository.null_policy(), NullPolicy::IncludeNone);
        });
    }

    #[test]
    #[serial]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("absent.toml")).unwrap();

        assert_eq!(config.repository.null_policy, Some(NullPolicy::ExcludeNone));
    }

    #[test]
    #[serial]
    fn test_resolve_rejects_empty_path() {
        let mut config = Config::default();
        config.database.path = Some("  ".to_string());

        let result = config.resolve();
        assert!(matches!(result, Err(ConfigError::InvalidDatabasePath(_))));
    }

    #[test]
    #[serial]
    fn test_resolve_rejects_large_busy_timeout() {
        let mut config = Config::default();
        config.database.busy_timeout = Some(MAX_BUSY_TIMEOUT + 1);

        let result = config.resolve();
        assert!(matches!(result, Err(ConfigError::InvalidBusyTimeout(_))));
    }

    #[test]
    #[serial]
    fn test_resolve_downgrades_wal_for_memory() {
        with_env(vec![("MODELREPO_DB", None)], || {
            let mut config = Config::default();
            config.database.journal_mode = Some(JournalMode::Wal);

            config.resolve().unwrap();
            assert_eq!(config.database.journal_mode, Some(JournalMode::Memory));
        });
    }

    #[test]
    #[serial]
    fn test_database_path_env_override() {
        with_env(vec![("MODELREPO_DB", Some("/custom/app.db"))], || {
            let config = DatabaseConfig::in_memory();
            assert_eq!(
                config.database_path(),
                Some(PathBuf::from("/custom/app.db"))
            );
        });
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.database.path = Some("app.db".to_string());
        config.repository.null_policy = Some(NullPolicy::IncludeNone);
        config.save(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let parsed: Config = toml::from_str(&content).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[repository]\nnull_policy = \"sometimes\"\n").unwrap();

        let result = Config::load(&path);
        assert!(matches!(result, Err(ConfigError::TomlDeError(_))));
    }
}
