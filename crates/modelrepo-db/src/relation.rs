//! Declared relationships and their select-in eager loading.
//!
//! Loading a relationship for a batch of parents costs one extra query per
//! [`SELECT_IN_BATCH`] parent keys, never one query per parent.

use std::{
    collections::{BTreeSet, HashMap},
    fmt,
    marker::PhantomData,
};

use rusqlite::types::Value;
use tracing::trace;

use crate::{
    error::Result,
    record::{as_key, Record},
    traits::Entity,
};

/// Maximum number of keys bound into one `IN (...)` lookup.
pub const SELECT_IN_BATCH: usize = 500;

/// Where eager loaders fetch related rows from; implemented by execution contexts.
pub trait RecordSource {
    /// Rows of `table` whose `column` is one of `keys`, ordered by `order_by`.
    fn select_in(
        &mut self,
        table: &'static str,
        column: &'static str,
        keys: &[Value],
        order_by: &'static str,
    ) -> Result<Vec<Record>>;
}

/// A relationship path that can be eagerly loaded onto parents of type `P`.
pub trait SelectIn<P>: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fetches the related rows for every parent and attaches them.
    fn load(&self, source: &mut dyn RecordSource, parents: &mut [P]) -> Result<()>;
}

enum Kind<P, C> {
    /// `C.foreign_key` references the parent's primary key.
    HasMany {
        foreign_key: &'static str,
        attach: fn(&mut P, Vec<C>),
    },
    /// `P.foreign_key` references the child's primary key.
    BelongsTo {
        foreign_key: &'static str,
        attach: fn(&mut P, Option<C>),
    },
}

/// A relationship attribute declared on entity `P`, targeting entity `C`.
///
/// ```ignore
/// fn attach_posts(user: &mut User, posts: Vec<Post>) {
///     user.posts = posts;
/// }
///
/// pub const POSTS: Relationship<User, Post> =
///     Relationship::has_many("posts", "author_id", attach_posts);
/// ```
pub struct Relationship<P, C> {
    name: &'static str,
    kind: Kind<P, C>,
    _types: PhantomData<fn() -> (P, C)>,
}

impl<P, C> Clone for Relationship<P, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P, C> Copy for Relationship<P, C> {}

impl<P, C> Clone for Kind<P, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P, C> Copy for Kind<P, C> {}

impl<P, C> fmt::Debug for Relationship<P, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (kind, foreign_key) = match self.kind {
            Kind::HasMany { foreign_key, .. } => ("has_many", foreign_key),
            Kind::BelongsTo { foreign_key, .. } => ("belongs_to", foreign_key),
        };
        f.debug_struct("Relationship")
            .field("name", &self.name)
            .field("kind", &kind)
            .field("foreign_key", &foreign_key)
            .finish()
    }
}

impl<P, C> Relationship<P, C> {
    /// One-to-many: children carry `foreign_key` pointing at the parent's key.
    pub const fn has_many(
        name: &'static str,
        foreign_key: &'static str,
        attach: fn(&mut P, Vec<C>),
    ) -> Self {
        Self {
            name,
            kind: Kind::HasMany {
                foreign_key,
                attach,
            },
            _types: PhantomData,
        }
    }

    /// Many-to-one: the parent carries `foreign_key` pointing at the child's key.
    pub const fn belongs_to(
        name: &'static str,
        foreign_key: &'static str,
        attach: fn(&mut P, Option<C>),
    ) -> Self {
        Self {
            name,
            kind: Kind::BelongsTo {
                foreign_key,
                attach,
            },
            _types: PhantomData,
        }
    }
}

impl<P: Entity, C: Entity> SelectIn<P> for Relationship<P, C> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn load(&self, source: &mut dyn RecordSource, parents: &mut [P]) -> Result<()> {
        match self.kind {
            Kind::HasMany {
                foreign_key,
                attach,
            } => {
                let keys: BTreeSet<i64> = parents.iter().filter_map(|p| p.primary_key()).collect();
                let records = fetch(source, C::TABLE, foreign_key, &keys, C::PRIMARY_KEY)?;

                let mut grouped: HashMap<i64, Vec<C>> = HashMap::new();
                for record in &records {
                    let owner: Option<i64> = record.get(foreign_key)?;
                    if let Some(owner) = owner {
                        grouped.entry(owner).or_default().push(C::from_record(record)?);
                    }
                }

                for parent in parents.iter_mut() {
                    let children = parent
                        .primary_key()
                        .and_then(|key| grouped.get(&key).cloned())
                        .unwrap_or_default();
                    attach(parent, children);
                }
            }
            Kind::BelongsTo {
                foreign_key,
                attach,
            } => {
                let reference = |parent: &P| {
                    parent
                        .values()
                        .into_iter()
                        .find(|(column, _)| *column == foreign_key)
                        .and_then(|(_, value)| as_key(&value))
                };

                let keys: BTreeSet<i64> = parents.iter().filter_map(reference).collect();
                let records = fetch(source, C::TABLE, C::PRIMARY_KEY, &keys, C::PRIMARY_KEY)?;

                let mut targets: HashMap<i64, C> = HashMap::new();
                for record in &records {
                    let target = C::from_record(record)?;
                    if let Some(key) = target.primary_key() {
                        targets.insert(key, target);
                    }
                }

                for parent in parents.iter_mut() {
                    let target = reference(&*parent).and_then(|key| targets.get(&key).cloned());
                    attach(parent, target);
                }
            }
        }

        Ok(())
    }
}

fn fetch(
    source: &mut dyn RecordSource,
    table: &'static str,
    column: &'static str,
    keys: &BTreeSet<i64>,
    order_by: &'static str,
) -> Result<Vec<Record>> {
    let keys: Vec<Value> = keys.iter().copied().map(Value::Integer).collect();
    let mut records = Vec::new();

    for batch in keys.chunks(SELECT_IN_BATCH) {
        trace!("select-in {} batch of {} keys", table, batch.len());
        records.extend(source.select_in(table, column, batch, order_by)?);
    }

    Ok(records)
}
