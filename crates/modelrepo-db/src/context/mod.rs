//! Execution contexts: the unit of work a repository runs against.
//!
//! A context registers entities for persistence, executes composed queries,
//! commits, rolls back and refreshes entities from persisted state. The blocking
//! [`ExecutionContext`] and the async [`AsyncExecutionContext`] have the same
//! shape; [`Session`] and [`AsyncSession`] implement them over SQLite.
//!
//! Handles are cheap to clone and clones share one connection and one open
//! transaction. A handle belongs to one logical unit of work.

use std::future::Future;

use crate::{
    error::{DbError, Result},
    query::Select,
    traits::Entity,
};

pub mod async_session;
pub(crate) mod render;
pub mod session;

pub use async_session::AsyncSession;
pub use session::Session;

/// Blocking execution context.
pub trait ExecutionContext: Clone + Send + Sync {
    /// Registers a new `entity` for persistence in the current unit of work.
    fn add<E: Entity>(&self, entity: &mut E) -> Result<()>;

    /// Registers the new state of an already persisted `entity`.
    ///
    /// Fails with [`DbError::NotFound`] when no row has its key.
    fn update<E: Entity>(&self, entity: &E) -> Result<()>;

    fn execute<E: Entity>(&self, query: &Select<E>) -> Result<Rows<E>>;

    /// Makes every registered change durable.
    fn commit(&self) -> Result<()>;

    /// Discards every change registered since the last commit.
    fn rollback(&self) -> Result<()>;

    /// Reloads `entity` from persisted state.
    fn refresh<E: Entity>(&self, entity: &mut E) -> Result<()>;
}

/// Async execution context. Every operation is an await point.
pub trait AsyncExecutionContext: Clone + Send + Sync {
    fn add<E: Entity>(&self, entity: &mut E) -> impl Future<Output = Result<()>> + Send;

    fn update<E: Entity>(&self, entity: &E) -> impl Future<Output = Result<()>> + Send;

    fn execute<E: Entity>(
        &self,
        query: &Select<E>,
    ) -> impl Future<Output = Result<Rows<E>>> + Send;

    fn commit(&self) -> impl Future<Output = Result<()>> + Send;

    fn rollback(&self) -> impl Future<Output = Result<()>> + Send;

    fn refresh<E: Entity>(&self, entity: &mut E) -> impl Future<Output = Result<()>> + Send;
}

/// The materialized result of executing a query.
#[derive(Debug, Clone)]
pub struct Rows<E> {
    table: &'static str,
    items: Vec<E>,
}

impl<E: Entity> Rows<E> {
    pub fn new(items: Vec<E>) -> Self {
        Self {
            table: E::TABLE,
            items,
        }
    }

    /// The first row, if any. Extra rows are ignored.
    pub fn first(self) -> Option<E> {
        self.items.into_iter().next()
    }

    /// Exactly one row. When the query was capped, `count` in
    /// [`DbError::MultipleResults`] is a lower bound.
    pub fn one(self) -> Result<E> {
        let count = self.items.len();
        let mut items = self.items.into_iter();
        match (items.next(), count) {
            (Some(item), 1) => Ok(item),
            (None, _) => Err(DbError::NotFound { table: self.table }),
            (Some(_), count) => Err(DbError::MultipleResults {
                table: self.table,
                count,
            }),
        }
    }

    pub fn all(self) -> Vec<E> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
