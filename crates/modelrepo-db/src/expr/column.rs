//! Represents a typed database column.
//!
//! `Col<E, T>` ties a column name to its entity `E` and a Rust type `T`, enabling
//! compile-time safety when constructing filters and update payloads. It implements
//! [`Expression`], so it can be used directly in filters.

use std::marker::PhantomData;

use rusqlite::types::Value;

use crate::{query::clause::OrderClause, traits::Expression};

/// A typed reference to a column of entity `E`'s table.
///
/// Columns are normally declared through [`crate::define_entity!`].
///
/// # Example
///
/// ```rust
/// use modelrepo_db::expr::Col;
///
/// struct User;
///
/// const NAME: Col<User, String> = Col::new("users", "name");
/// assert_eq!(NAME.qualified(), "users.name");
/// ```
pub struct Col<E, T> {
    pub table: &'static str,
    pub name: &'static str,
    _type: PhantomData<fn() -> (E, T)>,
}

impl<E, T> Clone for Col<E, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E, T> Copy for Col<E, T> {}

impl<E, T> std::fmt::Debug for Col<E, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Col({}.{})", self.table, self.name)
    }
}

impl<E, T> Col<E, T> {
    /// Creates a new column reference.
    ///
    /// # Parameters
    ///
    /// - `table`: the table the column belongs to (e.g., `"users"`)
    /// - `name`: the actual column name in the database (e.g., `"user_name"`)
    pub const fn new(table: &'static str, name: &'static str) -> Self {
        Self {
            table,
            name,
            _type: PhantomData,
        }
    }

    /// `table.column`, unambiguous when other tables are joined.
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.table, self.name)
    }

    /// Ascending ordering key.
    pub fn asc(self) -> OrderClause {
        OrderClause {
            column: self.qualified(),
            desc: false,
        }
    }

    /// Descending ordering key.
    pub fn desc(self) -> OrderClause {
        OrderClause {
            column: self.qualified(),
            desc: true,
        }
    }
}

impl<E, T> From<Col<E, T>> for OrderClause {
    fn from(col: Col<E, T>) -> Self {
        col.asc()
    }
}

impl<E: 'static, T: 'static> Expression for Col<E, T> {
    fn to_sql(&self, _params: &mut Vec<Value>) -> String {
        self.qualified()
    }
}
