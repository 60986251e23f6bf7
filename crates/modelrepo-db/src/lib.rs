//! Generic repositories over typed table models.
//!
//! - [`query`] composes declarative filter/join/eager-load/order/pagination
//!   options into one [`Select`].
//! - [`Repository`] and [`AsyncRepository`] expose create, update, first, one,
//!   all and first-or-create for one entity type over an injected
//!   [`ExecutionContext`] or [`AsyncExecutionContext`].
//! - [`define_entity!`] generates typed columns and the [`Entity`] impl for a
//!   plain struct.
//!
//! [`Session`] and [`AsyncSession`] are the SQLite-backed execution contexts.

pub mod changes;
pub mod connection;
pub mod context;
pub mod error;
pub mod expr;
pub mod macros;
pub mod query;
pub mod record;
pub mod relation;
pub mod repository;
pub mod schema;
pub mod traits;

#[cfg(test)]
mod test_support;

pub use changes::Changes;
pub use context::{AsyncExecutionContext, AsyncSession, ExecutionContext, Rows, Session};
pub use error::{DbError, FieldError, Result, ValidationError};
pub use expr::{Col, Condition};
pub use modelrepo_config::NullPolicy;
pub use query::{compose, QueryOptions, Select, Window};
pub use record::Record;
pub use relation::Relationship;
pub use repository::{AsyncRepository, Repository};
pub use rusqlite::types::Value;
pub use traits::{Entity, Expression, Partial, Updatable, Validate};
