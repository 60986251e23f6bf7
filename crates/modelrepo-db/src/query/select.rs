//! The composed query.

use std::{fmt, marker::PhantomData, sync::Arc};

use crate::{
    expr::Condition,
    query::clause::{JoinClause, OrderClause, Window},
    relation::SelectIn,
    traits::Entity,
};

/// "Select all instances of `E`", narrowed by clauses.
///
/// A `Select` is pure data: building one performs no I/O and raises no errors.
/// It is normally produced by [`super::QueryOptions::compose`], which applies
/// clauses in a fixed order; the methods here apply exactly one clause each.
pub struct Select<E> {
    joins: Vec<JoinClause>,
    relationships: Vec<Arc<dyn SelectIn<E>>>,
    filter: Option<Condition>,
    order: Vec<OrderClause>,
    window: Option<Window>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for Select<E> {
    fn clone(&self) -> Self {
        Self {
            joins: self.joins.clone(),
            relationships: self.relationships.clone(),
            filter: self.filter.clone(),
            order: self.order.clone(),
            window: self.window,
            _entity: PhantomData,
        }
    }
}

impl<E> fmt::Debug for Select<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let relationships: Vec<_> = self.relationships.iter().map(|r| r.name()).collect();
        f.debug_struct("Select")
            .field("joins", &self.joins)
            .field("relationships", &relationships)
            .field("filter", &self.filter)
            .field("order", &self.order)
            .field("window", &self.window)
            .finish()
    }
}

impl<E: Entity> Default for Select<E> {
    fn default() -> Self {
        Self::all()
    }
}

impl<E: Entity> Select<E> {
    /// Every row of `E`, default order, unbounded.
    pub fn all() -> Self {
        Self {
            joins: Vec::new(),
            relationships: Vec::new(),
            filter: None,
            order: Vec::new(),
            window: None,
            _entity: PhantomData,
        }
    }

    /// Applies a pagination window; a zero limit leaves the query unbounded.
    pub fn paginate(mut self, window: Window) -> Self {
        self.window = window.is_bounded().then_some(window);
        self
    }

    pub fn join(mut self, join: JoinClause) -> Self {
        self.joins.push(join);
        self
    }

    /// Requests select-in loading of a relationship.
    pub fn load(mut self, relationship: Arc<dyn SelectIn<E>>) -> Self {
        self.relationships.push(relationship);
        self
    }

    /// ANDs `condition` into the filter.
    pub fn and_where(mut self, condition: Condition) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and_also(condition),
            None => condition,
        });
        self
    }

    /// Appends an ORDER BY term after the existing ones.
    pub fn order_by(mut self, order: OrderClause) -> Self {
        self.order.push(order);
        self
    }

    pub fn joins(&self) -> &[JoinClause] {
        &self.joins
    }

    pub fn relationships(&self) -> &[Arc<dyn SelectIn<E>>] {
        &self.relationships
    }

    pub fn filter(&self) -> Option<&Condition> {
        self.filter.as_ref()
    }

    pub fn has_filter(&self) -> bool {
        self.filter.is_some()
    }

    pub fn order(&self) -> &[OrderClause] {
        &self.order
    }

    pub fn window(&self) -> Option<Window> {
        self.window
    }
}
