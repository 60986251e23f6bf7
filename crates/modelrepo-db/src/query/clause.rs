//! Clause types shared by [`super::QueryOptions`] and [`super::Select`].

use crate::{
    expr::Condition,
    schema::ForeignKey,
    traits::{Entity, Expression},
};

/// An ORDER BY term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderClause {
    pub column: String,
    pub desc: bool,
}

/// An (offset, limit) pagination window. A limit of zero means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Window {
    pub offset: u64,
    pub limit: u64,
}

impl Window {
    pub const fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }

    /// 1-based page of `per_page` rows.
    pub const fn page(page: u64, per_page: u64) -> Self {
        Self {
            offset: page.saturating_sub(1).saturating_mul(per_page),
            limit: per_page,
        }
    }

    pub const fn is_bounded(&self) -> bool {
        self.limit > 0
    }
}

/// A join as requested by the caller.
#[derive(Debug, Clone)]
pub enum Join {
    /// Join a related table on the foreign key the schema declares.
    Implicit(JoinClause),
    /// Join a related table and AND `condition` into the filter.
    On(JoinClause, Condition),
}

impl Join {
    pub fn implicit<T: Entity>() -> Self {
        Join::Implicit(JoinClause::of::<T>(false))
    }

    pub fn on<T: Entity>(condition: impl Expression) -> Self {
        Join::On(JoinClause::of::<T>(true), condition.into_condition())
    }
}

/// A joined table as it appears in a composed query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinClause {
    pub table: &'static str,
    pub primary_key: &'static str,
    pub foreign_keys: &'static [ForeignKey],
    /// Joined together with an explicit condition; no foreign key is required.
    pub explicit: bool,
}

impl JoinClause {
    fn of<T: Entity>(explicit: bool) -> Self {
        Self {
            table: T::TABLE,
            primary_key: T::PRIMARY_KEY,
            foreign_keys: T::FOREIGN_KEYS,
            explicit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_page() {
        assert_eq!(Window::page(1, 20), Window::new(0, 20));
        assert_eq!(Window::page(3, 20), Window::new(40, 20));
        assert_eq!(Window::page(0, 20), Window::new(0, 20));
    }

    #[test]
    fn test_window_page_saturates() {
        assert_eq!(Window::page(u64::MAX, 2), Window::new(u64::MAX, 2));
    }

    #[test]
    fn test_window_zero_limit_is_unbounded() {
        assert!(!Window::new(10, 0).is_bounded());
        assert!(Window::new(0, 1).is_bounded());
    }
}
