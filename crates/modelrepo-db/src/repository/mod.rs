//! Generic repositories.
//!
//! A repository exposes the CRUD surface for one entity type. Query shape comes
//! from [`crate::query::QueryOptions`]; execution is delegated to the injected
//! context:
//!
//! - [`Repository`] - over a blocking [`crate::ExecutionContext`]
//! - [`AsyncRepository`] - over an [`crate::AsyncExecutionContext`]

pub mod blocking;
pub mod nonblocking;

pub use blocking::Repository;
pub use nonblocking::AsyncRepository;
