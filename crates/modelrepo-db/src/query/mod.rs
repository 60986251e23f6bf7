//! The query composer.
//!
//! A caller describes a query declaratively with [`QueryOptions`]; composing it
//! produces a [`Select`], a plain value that an execution context knows how to run.
//! Composition performs no I/O and never fails: malformed expressions surface
//! when the query executes.
//!
//! # Example
//!
//! ```ignore
//! use modelrepo_db::query::QueryOptions;
//!
//! let query = QueryOptions::<User>::new()
//!     .filter(users::USERNAME.eq("alice".to_string()))
//!     .order_by(users::ID.desc())
//!     .limit(10)
//!     .compose();
//! ```
//!
//! # Submodules
//!
//! - [`clause`] — Join, ordering and pagination clauses.
//! - [`options`] — [`QueryOptions`] and the fixed composition order.
//! - [`select`] — The composed [`Select`].

pub mod clause;
pub mod options;
pub mod select;

pub use clause::{Join, JoinClause, OrderClause, Window};
pub use options::{compose, QueryOptions};
pub use select::Select;
