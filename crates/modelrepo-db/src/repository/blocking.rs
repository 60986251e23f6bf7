//! Repository over a blocking execution context.

use std::{fmt, marker::PhantomData};

use modelrepo_config::{NullPolicy, RepositoryConfig};
use tracing::debug;

use crate::{
    changes::{self, Changes},
    context::ExecutionContext,
    error::Result,
    query::QueryOptions,
    traits::{Entity, Updatable},
};

/// CRUD operations for entity type `E` over execution context `C`.
///
/// Only [`Repository::first_or_create`] commits; every other write is left for
/// the caller to commit or roll back through the context.
///
/// # Example
///
/// ```ignore
/// let repo = Repository::<User, _>::new(session.clone());
///
/// let mut alice = repo.create(Changes::new().set(users::USERNAME, "alice"))?;
/// session.commit()?;
///
/// repo.update(&mut alice, Changes::new().set(users::EMAIL, Some("a@example.com".into())))?;
/// session.commit()?;
///
/// let found = repo.one(QueryOptions::new().filter(users::USERNAME.eq("alice".to_string())))?;
/// ```
pub struct Repository<E, C> {
    ctx: C,
    null_policy: NullPolicy,
    _entity: PhantomData<fn() -> E>,
}

impl<E, C: Clone> Clone for Repository<E, C> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
            null_policy: self.null_policy,
            _entity: PhantomData,
        }
    }
}

impl<E: Entity, C> fmt::Debug for Repository<E, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("table", &E::TABLE)
            .field("null_policy", &self.null_policy)
            .finish()
    }
}

impl<E: Entity, C: ExecutionContext> Repository<E, C> {
    pub fn new(ctx: C) -> Self {
        Self {
            ctx,
            null_policy: NullPolicy::default(),
            _entity: PhantomData,
        }
    }

    /// Takes the repository defaults from configuration.
    pub fn from_config(ctx: C, config: &RepositoryConfig) -> Self {
        Self::new(ctx).with_null_policy(config.null_policy())
    }

    /// How [`Repository::update`] treats NULL values in a payload.
    pub fn with_null_policy(mut self, policy: NullPolicy) -> Self {
        self.null_policy = policy;
        self
    }

    pub fn null_policy(&self) -> NullPolicy {
        self.null_policy
    }

    pub fn context(&self) -> &C {
        &self.ctx
    }

    /// Builds a new entity from `changes` and registers it with the context.
    ///
    /// Fails with a validation error when a required column is missing, a value
    /// does not fit its field, or the entity's own validation rejects it. A
    /// primary key supplied in `changes` is inserted as given; if a row already
    /// has it, the backend's constraint error is returned.
    pub fn create(&self, changes: Changes<E>) -> Result<E> {
        let mut entity = changes::build(&changes)?;
        self.ctx.add(&mut entity)?;
        debug!("created {} {:?}", E::TABLE, entity.primary_key());
        Ok(entity)
    }

    /// Applies `changes` onto `entity`, re-validates it and registers the new state.
    ///
    /// On a validation error the entity keeps whatever was assigned and nothing
    /// is registered. An entity whose row no longer exists fails with
    /// [`DbError::NotFound`](crate::DbError::NotFound).
    pub fn update<'e>(&self, entity: &'e mut E, changes: Changes<E>) -> Result<&'e mut E> {
        entity.apply(&changes, self.null_policy)?;
        self.ctx.update(&*entity)?;
        debug!("updated {} {:?}", E::TABLE, entity.primary_key());
        Ok(entity)
    }

    /// The first match, or `None`. The pagination window is ignored.
    pub fn first(&self, options: QueryOptions<E>) -> Result<Option<E>> {
        let query = options.unpaginated().limit(1).compose();
        Ok(self.ctx.execute(&query)?.first())
    }

    /// Exactly one match. The pagination window is ignored.
    ///
    /// At most two rows are read, so the count in
    /// [`DbError::MultipleResults`](crate::DbError::MultipleResults) is 2.
    pub fn one(&self, options: QueryOptions<E>) -> Result<E> {
        let query = options.unpaginated().limit(2).compose();
        self.ctx.execute(&query)?.one()
    }

    /// Every match, ordered and paginated.
    pub fn all(&self, options: QueryOptions<E>) -> Result<Vec<E>> {
        let query = options.compose();
        Ok(self.ctx.execute(&query)?.all())
    }

    /// Returns the first match or creates, commits and refreshes a new entity.
    ///
    /// The lookup does not consult `changes`; two callers racing on the same
    /// lookup can both create unless the table has a matching unique constraint.
    pub fn first_or_create(&self, options: QueryOptions<E>, changes: Changes<E>) -> Result<E> {
        if let Some(found) = self.first(options)? {
            return Ok(found);
        }

        let mut entity = self.create(changes)?;
        self.ctx.commit()?;
        self.ctx.refresh(&mut entity)?;
        Ok(entity)
    }
}
