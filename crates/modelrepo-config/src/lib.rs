pub mod config;
pub mod error;

pub use config::{Config, DatabaseConfig, JournalMode, NullPolicy, RepositoryConfig};
pub use error::{ConfigError, Result};

#[cfg(test)]
pub mod test_utils;
