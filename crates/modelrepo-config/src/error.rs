use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("TOML serialization error: {0}")]
    #[diagnostic(
        code(modelrepo_config::toml_serialize),
        help("Check your configuration structure for invalid values")
    )]
    TomlSerError(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    #[diagnostic(
        code(modelrepo_config::toml_deserialize),
        help("Check your config.toml syntax and structure")
    )]
    TomlDeError(#[from] toml::de::Error),

    #[error("Invalid database path: {0:?}")]
    #[diagnostic(
        code(modelrepo_config::invalid_database_path),
        help("Set database.path to a file path, or remove it to use an in-memory database")
    )]
    InvalidDatabasePath(String),

    #[error("Invalid busy timeout: {0}ms")]
    #[diagnostic(
        code(modelrepo_config::invalid_busy_timeout),
        help("database.busy_timeout is in milliseconds and must not exceed 600000")
    )]
    InvalidBusyTimeout(u64),

    #[error("IO error: {0}")]
    #[diagnostic(code(modelrepo_config::io))]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
