//! Async SQLite execution context.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use modelrepo_config::DatabaseConfig;
use rusqlite::Connection;
use tokio::task;

use crate::{
    connection,
    context::{session::SessionState, AsyncExecutionContext, Rows},
    error::Result,
    query::Select,
    traits::Entity,
};

/// Async SQLite execution context.
///
/// Each operation locks the shared session state on tokio's blocking pool, so
/// awaiting never blocks the runtime. Entities are cloned onto the worker and
/// written back when the operation completes.
#[derive(Clone)]
pub struct AsyncSession {
    state: Arc<Mutex<SessionState>>,
}

impl AsyncSession {
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let conn = task::spawn_blocking(move || connection::open_path(path)).await??;
        Ok(Self::from_connection(conn))
    }

    pub async fn open_in_memory() -> Result<Self> {
        let conn = task::spawn_blocking(connection::open_in_memory).await??;
        Ok(Self::from_connection(conn))
    }

    pub async fn from_config(config: &DatabaseConfig) -> Result<Self> {
        let config = config.clone();
        let conn = task::spawn_blocking(move || connection::open(&config)).await??;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::new(conn))),
        }
    }

    /// Runs raw SQL statements, such as schema DDL.
    pub async fn execute_batch(&self, sql: &str) -> Result<()> {
        let sql = sql.to_string();
        self.run(move |state| state.execute_batch(&sql)).await
    }

    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut SessionState) -> Result<T> + Send + 'static,
    {
        let state = Arc::clone(&self.state);
        task::spawn_blocking(move || {
            let mut guard = state.lock()?;
            f(&mut *guard)
        })
        .await?
    }
}

impl AsyncExecutionContext for AsyncSession {
    async fn add<E: Entity>(&self, entity: &mut E) -> Result<()> {
        let mut owned = entity.clone();
        *entity = self
            .run(move |state| {
                state.add(&mut owned)?;
                Ok(owned)
            })
            .await?;
        Ok(())
    }

    async fn update<E: Entity>(&self, entity: &E) -> Result<()> {
        let owned = entity.clone();
        self.run(move |state| state.update(&owned)).await
    }

    async fn execute<E: Entity>(&self, query: &Select<E>) -> Result<Rows<E>> {
        let query = query.clone();
        self.run(move |state| state.execute(&query)).await
    }

    async fn commit(&self) -> Result<()> {
        self.run(|state| state.commit()).await
    }

    async fn rollback(&self) -> Result<()> {
        self.run(|state| state.rollback()).await
    }

    async fn refresh<E: Entity>(&self, entity: &mut E) -> Result<()> {
        let mut owned = entity.clone();
        *entity = self
            .run(move |state| {
                state.refresh(&mut owned)?;
                Ok(owned)
            })
            .await?;
        Ok(())
    }
}
