//! Repository over an async execution context.
//!
//! Same surface as [`super::Repository`]; every operation that reaches the
//! context is an await point.

use std::{fmt, marker::PhantomData};

use modelrepo_config::{NullPolicy, RepositoryConfig};
use tracing::debug;

use crate::{
    changes::{self, Changes},
    context::AsyncExecutionContext,
    error::Result,
    query::QueryOptions,
    traits::{Entity, Updatable},
};

/// CRUD operations for entity type `E` over async execution context `C`.
pub struct AsyncRepository<E, C> {
    ctx: C,
    null_policy: NullPolicy,
    _entity: PhantomData<fn() -> E>,
}

impl<E, C: Clone> Clone for AsyncRepository<E, C> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
            null_policy: self.null_policy,
            _entity: PhantomData,
        }
    }
}

impl<E: Entity, C> fmt::Debug for AsyncRepository<E, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncRepository")
            .field("table", &E::TABLE)
            .field("null_policy", &self.null_policy)
            .finish()
    }
}

impl<E: Entity, C: AsyncExecutionContext> AsyncRepository<E, C> {
    pub fn new(ctx: C) -> Self {
        Self {
            ctx,
            null_policy: NullPolicy::default(),
            _entity: PhantomData,
        }
    }

    pub fn from_config(ctx: C, config: &RepositoryConfig) -> Self {
        Self::new(ctx).with_null_policy(config.null_policy())
    }

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

    pub async fn create(&self, changes: Changes<E>) -> Result<E> {
        let mut entity = changes::build(&changes)?;
        self.ctx.add(&mut entity).await?;
        debug!("created {} {:?}", E::TABLE, entity.primary_key());
        Ok(entity)
    }

    pub async fn update<'e>(&self, entity: &'e mut E, changes: Changes<E>) -> Result<&'e mut E> {
        entity.apply(&changes, self.null_policy)?;
        self.ctx.update(&*entity).await?;
        debug!("updated {} {:?}", E::TABLE, entity.primary_key());
        Ok(entity)
    }

    pub async fn first(&self, options: QueryOptions<E>) -> Result<Option<E>> {
        let query = options.unpaginated().limit(1).compose();
        Ok(self.ctx.execute(&query).await?.first())
    }

    pub async fn one(&self, options: QueryOptions<E>) -> Result<E> {
        let query = options.unpaginated().limit(2).compose();
        self.ctx.execute(&query).await?.one()
    }

    pub async fn all(&self, options: QueryOptions<E>) -> Result<Vec<E>> {
        let query = options.compose();
        Ok(self.ctx.execute(&query).await?.all())
    }

    /// See [`super::Repository::first_or_create`]; the same race applies.
    pub async fn first_or_create(&self, options: QueryOptions<E>, changes: Changes<E>) -> Result<E> {
        if let Some(found) = self.first(options).await? {
            return Ok(found);
        }

        let mut entity = self.create(changes).await?;
        self.ctx.commit().await?;
        self.ctx.refresh(&mut entity).await?;
        Ok(entity)
    }
}
