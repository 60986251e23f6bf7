//! Blocking SQLite execution context.

use std::{
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};

use modelrepo_config::DatabaseConfig;
use rusqlite::{params_from_iter, types::Value, Connection};
use tracing::{debug, trace};

use crate::{
    connection,
    context::{render, ExecutionContext, Rows},
    error::{DbError, Result},
    query::Select,
    record::Record,
    relation::RecordSource,
    traits::Entity,
};

/// Connection plus unit-of-work state shared by [`Session`] and
/// [`super::AsyncSession`] handles.
///
/// A transaction is opened lazily by the first write and stays open until
/// `commit` or `rollback`, so registered entities are visible to queries on
/// the same session before they are durable.
pub(crate) struct SessionState {
    conn: Connection,
}

impl SessionState {
    pub(crate) fn new(conn: Connection) -> Self {
        Self { conn }
    }

    fn begin(&mut self) -> Result<()> {
        if self.conn.is_autocommit() {
            debug!("BEGIN");
            self.conn.execute_batch("BEGIN")?;
        }
        Ok(())
    }

    fn run(&self, sql: &str, params: &[Value]) -> Result<usize> {
        debug!(sql, params = params.len(), "execute");
        Ok(self.conn.execute(sql, params_from_iter(params.iter()))?)
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Record>> {
        debug!(sql, params = params.len(), "query");
        let mut stmt = self.conn.prepare(sql)?;
        let records = stmt
            .query_map(params_from_iter(params.iter()), |row| Record::from_row(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        trace!("{} rows", records.len());
        Ok(records)
    }

    pub(crate) fn execute_batch(&mut self, sql: &str) -> Result<()> {
        debug!("execute batch");
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// Inserts `entity` into the open transaction and writes the generated key back.
    ///
    /// A key already set is inserted as given, so a duplicate surfaces as the
    /// backend's constraint error.
    pub(crate) fn add<E: Entity>(&mut self, entity: &mut E) -> Result<()> {
        self.begin()?;

        let (sql, params) = render::insert(entity);
        self.run(&sql, &params)?;
        if entity.primary_key().is_none() {
            entity.set_primary_key(self.conn.last_insert_rowid());
        }
        trace!("{} {:?} registered", E::TABLE, entity.primary_key());
        Ok(())
    }

    /// Writes the current state of a persisted `entity` into the open transaction.
    pub(crate) fn update<E: Entity>(&mut self, entity: &E) -> Result<()> {
        let key = entity
            .primary_key()
            .ok_or(DbError::Detached { table: E::TABLE })?;
        self.begin()?;

        let matched = match render::update(entity, key) {
            Some((sql, params)) => self.run(&sql, &params)?,
            None => self
                .query(
                    &format!("SELECT {pk} FROM {} WHERE {pk} = ?", E::TABLE, pk = E::PRIMARY_KEY),
                    &[Value::Integer(key)],
                )?
                .len(),
        };
        if matched == 0 {
            return Err(DbError::NotFound { table: E::TABLE });
        }

        trace!("{} {} updated", E::TABLE, key);
        Ok(())
    }

    pub(crate) fn execute<E: Entity>(&mut self, query: &Select<E>) -> Result<Rows<E>> {
        let (sql, params) = render::select(query)?;
        let mut items = self
            .query(&sql, &params)?
            .iter()
            .map(E::from_record)
            .collect::<Result<Vec<_>>>()?;

        if !items.is_empty() {
            for relationship in query.relationships() {
                trace!("loading {}.{}", E::TABLE, relationship.name());
                relationship.load(&mut *self, &mut items)?;
            }
        }

        Ok(Rows::new(items))
    }

    pub(crate) fn commit(&mut self) -> Result<()> {
        if !self.conn.is_autocommit() {
            debug!("COMMIT");
            self.conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    pub(crate) fn rollback(&mut self) -> Result<()> {
        if !self.conn.is_autocommit() {
            debug!("ROLLBACK");
            self.conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }

    pub(crate) fn refresh<E: Entity>(&mut self, entity: &mut E) -> Result<()> {
        let key = entity
            .primary_key()
            .ok_or(DbError::Detached { table: E::TABLE })?;

        let sql = format!("SELECT * FROM {} WHERE {} = ?", E::TABLE, E::PRIMARY_KEY);
        let record = self
            .query(&sql, &[Value::Integer(key)])?
            .into_iter()
            .next()
            .ok_or(DbError::NotFound { table: E::TABLE })?;

        *entity = E::from_record(&record)?;
        Ok(())
    }
}

impl RecordSource for SessionState {
    fn select_in(
        &mut self,
        table: &'static str,
        column: &'static str,
        keys: &[Value],
        order_by: &'static str,
    ) -> Result<Vec<Record>> {
        let (sql, params) = render::select_in(table, column, keys, order_by);
        self.query(&sql, &params)
    }
}

/// Blocking SQLite execution context.
///
/// # Example
///
/// ```ignore
/// let session = Session::open_in_memory()?;
/// session.execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY, username TEXT NOT NULL)")?;
///
/// let users = Repository::<User, _>::new(session.clone());
/// let alice = users.create(Changes::new().set(users::USERNAME, "alice"))?;
/// session.commit()?;
/// ```
#[derive(Clone)]
pub struct Session {
    state: Arc<Mutex<SessionState>>,
}

impl Session {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::from_connection(connection::open_path(path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_connection(connection::open_in_memory()?))
    }

    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        Ok(Self::from_connection(connection::open(config)?))
    }

    /// Wraps an already configured connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::new(conn))),
        }
    }

    /// Runs raw SQL statements, such as schema DDL.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.lock()?.execute_batch(sql)
    }

    fn lock(&self) -> Result<MutexGuard<'_, SessionState>> {
        Ok(self.state.lock()?)
    }
}

impl ExecutionContext for Session {
    fn add<E: Entity>(&self, entity: &mut E) -> Result<()> {
        self.lock()?.add(entity)
    }

    fn update<E: Entity>(&self, entity: &E) -> Result<()> {
        self.lock()?.update(entity)
    }

    fn execute<E: Entity>(&self, query: &Select<E>) -> Result<Rows<E>> {
        self.lock()?.execute(query)
    }

    fn commit(&self) -> Result<()> {
        self.lock()?.commit()
    }

    fn rollback(&self) -> Result<()> {
        self.lock()?.rollback()
    }

    fn refresh<E: Entity>(&self, entity: &mut E) -> Result<()> {
        self.lock()?.refresh(entity)
    }
}
