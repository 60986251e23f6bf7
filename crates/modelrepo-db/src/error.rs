//! Error types for modelrepo-db.

use std::fmt;

use miette::Diagnostic;
use thiserror::Error;

/// A single field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Structured validation failure for one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub table: &'static str,
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            errors: Vec::new(),
        }
    }

    /// Records a failure for `field`.
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns `Err(self)` if any failure was recorded.
    pub fn into_result(self) -> std::result::Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation failed", self.table)?;
        for (i, err) in self.errors.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{}: {}", err.field, err.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Database error type for modelrepo-db operations.
#[derive(Error, Diagnostic, Debug)]
pub enum DbError {
    #[error(transparent)]
    #[diagnostic(
        code(modelrepo_db::validation),
        help("Fix the listed fields; nothing was retried or persisted")
    )]
    Validation(#[from] ValidationError),

    #[error("No {table} row matched the query")]
    #[diagnostic(
        code(modelrepo_db::not_found),
        help("Use `first` when zero matches is an expected outcome")
    )]
    NotFound { table: &'static str },

    #[error("Expected exactly one {table} row, found at least {count}")]
    #[diagnostic(
        code(modelrepo_db::multiple_results),
        help("Narrow the filter, or use `first`/`all` when several matches are expected")
    )]
    MultipleResults { table: &'static str, count: usize },

    #[error("Cannot decode column {column}: {reason}")]
    #[diagnostic(
        code(modelrepo_db::decode),
        help("The stored value does not fit the entity's field type")
    )]
    Decode { column: String, reason: String },

    #[error("No foreign key relates {from} and {to}")]
    #[diagnostic(
        code(modelrepo_db::no_foreign_key),
        help("Declare the foreign key on one of the entities, or join with an explicit condition")
    )]
    NoForeignKey {
        from: &'static str,
        to: &'static str,
    },

    #[error("{table} entity has no primary key")]
    #[diagnostic(
        code(modelrepo_db::detached),
        help("Register the entity with the execution context before refreshing it")
    )]
    Detached { table: &'static str },

    #[error("Session lock poisoned")]
    #[diagnostic(
        code(modelrepo_db::poisoned),
        help("A previous operation panicked while holding the session; open a new one")
    )]
    Poisoned,

    #[error("Blocking worker failed: {0}")]
    #[diagnostic(code(modelrepo_db::worker))]
    Worker(String),

    #[error(transparent)]
    #[diagnostic(code(modelrepo_db::sqlite))]
    Sqlite(#[from] rusqlite::Error),
}

impl<T> From<std::sync::PoisonError<T>> for DbError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        DbError::Poisoned
    }
}

impl From<tokio::task::JoinError> for DbError {
    fn from(err: tokio::task::JoinError) -> Self {
        DbError::Worker(err.to_string())
    }
}

/// Result type alias for modelrepo-db operations.
pub type Result<T> = std::result::Result<T, DbError>;
