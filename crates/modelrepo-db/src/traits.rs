//! Core traits that power the repositories.
//!
//! These traits define the contract for:
//! - Building filter expressions (`Expression`)
//! - Describing a table-backed model (`Entity`, usually via [`crate::define_entity!`])
//! - Checking a complete attribute set (`Validate`)
//! - Supplying a subset of an entity's fields (`Partial`)
//! - Applying a partial update to a live entity (`Updatable`)

use modelrepo_config::NullPolicy;
use rusqlite::types::Value;

use crate::{
    changes::{self, Changes},
    error::{Result, ValidationError},
    expr::ops::{BinaryOp, Condition, InOp, LikeOp, LogicalOp, NotOp, NullOp},
    record::Record,
    schema::{Column, ForeignKey},
};

/// A trait for types that can be converted into SQL expressions.
///
/// This enables ergonomic filter construction using operators like `.eq()`, `.like()`, etc.
/// Implementors include:
/// - [`super::expr::Col`]: a table column
/// - [`BinaryOp`], [`LikeOp`], etc.: compound expressions
/// - [`Condition`]: any of the above with its type erased
///
/// An expression is an unevaluated tree. Nothing inspects it until an execution
/// context renders it with `to_sql`, which appends bound parameters to `params`
/// and returns the fragment with `?` placeholders.
pub trait Expression: Sized + Send + Sync + 'static {
    /// Converts this expression into a SQL string fragment and appends bound parameters.
    ///
    /// # Example
    ///
    /// ```rust
    /// use modelrepo_db::expr::Col;
    /// use modelrepo_db::traits::Expression as _;
    ///
    /// struct User;
    ///
    /// let col = Col::<User, String>::new("users", "name");
    /// let expr = col.eq("User".to_string());
    /// let mut params = vec![];
    /// let sql = expr.to_sql(&mut params);
    /// assert_eq!(sql, "users.name = ?");
    /// assert_eq!(params.len(), 1);
    /// ```
    fn to_sql(&self, params: &mut Vec<Value>) -> String;

    /// Creates a SQL `=` condition.
    fn eq<T: Into<Value>>(self, value: T) -> BinaryOp<Self> {
        BinaryOp::new(self, "=", value.into())
    }

    /// Creates a SQL `!=` condition.
    fn ne<T: Into<Value>>(self, value: T) -> BinaryOp<Self> {
        BinaryOp::new(self, "!=", value.into())
    }

    /// Creates a SQL `>` condition.
    fn gt<T: Into<Value>>(self, value: T) -> BinaryOp<Self> {
        BinaryOp::new(self, ">", value.into())
    }

    /// Creates a SQL `<` condition.
    fn lt<T: Into<Value>>(self, value: T) -> BinaryOp<Self> {
        BinaryOp::new(self, "<", value.into())
    }

    /// Creates a SQL `>=` condition.
    fn gte<T: Into<Value>>(self, value: T) -> BinaryOp<Self> {
        BinaryOp::new(self, ">=", value.into())
    }

    /// Creates a SQL `<=` condition.
    fn lte<T: Into<Value>>(self, value: T) -> BinaryOp<Self> {
        BinaryOp::new(self, "<=", value.into())
    }

    /// Creates a SQL `LIKE` condition.
    fn like(self, pattern: impl Into<String>) -> LikeOp<Self> {
        LikeOp::new(self, pattern.into(), false)
    }

    /// Creates a case-insensitive `LIKE` condition.
    fn ilike(self, pattern: impl Into<String>) -> LikeOp<Self> {
        LikeOp::new(self, pattern.into(), true)
    }

    /// Creates a SQL `IN` condition.
    fn in_<T, I>(self, values: I) -> InOp<Self>
    where
        T: Into<Value>,
        I: IntoIterator<Item = T>,
    {
        let values = values.into_iter().map(|v| v.into()).collect();
        InOp::new(self, values, false)
    }

    /// Creates a SQL `NOT IN` condition.
    fn not_in<T, I>(self, values: I) -> InOp<Self>
    where
        T: Into<Value>,
        I: IntoIterator<Item = T>,
    {
        let values = values.into_iter().map(|v| v.into()).collect();
        InOp::new(self, values, true)
    }

    /// Creates a SQL `IS NULL` condition.
    fn null(self) -> NullOp<Self> {
        NullOp::new(self, true)
    }

    /// Creates a SQL `IS NOT NULL` condition.
    fn not_null(self) -> NullOp<Self> {
        NullOp::new(self, false)
    }

    /// Combines two expressions with `AND`.
    fn and<E: Expression>(self, other: E) -> LogicalOp<Self, E> {
        LogicalOp::new(self, other, "AND")
    }

    /// Combines two expressions with `OR`.
    fn or<E: Expression>(self, other: E) -> LogicalOp<Self, E> {
        LogicalOp::new(self, other, "OR")
    }

    /// Negates this expression.
    fn not(self) -> NotOp<Self> {
        NotOp::new(self)
    }

    /// Erases the concrete expression type.
    fn into_condition(self) -> Condition {
        Condition::new(self)
    }
}

/// A full-instance check run after every create and update.
///
/// The default accepts everything; implement it to enforce constraints that the
/// field types alone cannot express.
pub trait Validate {
    fn validate(&self) -> std::result::Result<(), ValidationError> {
        Ok(())
    }
}

/// A registered table-backed model type.
///
/// Implementations are normally generated by [`crate::define_entity!`]. The
/// primary key is an integer assigned by the storage layer and is `None` until
/// the entity has been registered with an execution context.
pub trait Entity: Validate + Default + Clone + Send + Sync + 'static {
    const TABLE: &'static str;
    const PRIMARY_KEY: &'static str;
    /// Every assignable column except the primary key, in declaration order.
    const COLUMNS: &'static [Column];
    const FOREIGN_KEYS: &'static [ForeignKey] = &[];

    fn primary_key(&self) -> Option<i64>;

    fn set_primary_key(&mut self, key: i64);

    fn from_record(record: &Record) -> Result<Self>;

    /// Current values of [`Self::COLUMNS`], in the same order.
    fn values(&self) -> Vec<(&'static str, Value)>;

    /// Assigns one column (the primary key included), coercing `value` to the field type.
    fn assign(&mut self, column: &str, value: Value) -> std::result::Result<(), String>;
}

/// A value carrying a subset of `E`'s fields, such as an input DTO.
///
/// ```ignore
/// struct UserIn {
///     username: String,
/// }
///
/// impl Partial<User> for UserIn {
///     fn write(&self, changes: &mut Changes<User>) {
///         changes.put(users::USERNAME, self.username.clone());
///     }
/// }
/// ```
pub trait Partial<E: Entity> {
    fn write(&self, changes: &mut Changes<E>);
}

impl<E: Entity> Partial<E> for E {
    fn write(&self, changes: &mut Changes<E>) {
        for (column, value) in self.values() {
            changes.put_raw(column, value);
        }
    }
}

/// Applying a partial update in place.
pub trait Updatable: Entity {
    /// Assigns every change (subject to `policy`), then re-validates the whole entity.
    ///
    /// Assignments made before a failure are kept; the caller decides whether to
    /// discard the entity.
    fn apply(&mut self, changes: &Changes<Self>, policy: NullPolicy) -> Result<()>;
}

impl<E: Entity> Updatable for E {
    fn apply(&mut self, changes: &Changes<Self>, policy: NullPolicy) -> Result<()> {
        changes::apply(self, changes, policy)
    }
}
