//! Update payloads and how they are reconciled with entities.
//!
//! A [`Changes`] value merges two sources: a partial instance (anything that
//! implements [`Partial`]) and keyword fields set column by column. Keyword fields
//! win whenever both supply the same column, whichever was added first.

use std::{fmt, marker::PhantomData};

use modelrepo_config::NullPolicy;
use rusqlite::types::Value;
use tracing::trace;

use crate::{
    error::{Result, ValidationError},
    expr::Col,
    traits::{Entity, Partial},
};

/// Column assignments for entity `E`.
pub struct Changes<E> {
    values: Vec<(&'static str, Value)>,
    allow_nulls: bool,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Default for Changes<E> {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            allow_nulls: false,
            _entity: PhantomData,
        }
    }
}

impl<E> Clone for Changes<E> {
    fn clone(&self) -> Self {
        Self {
            values: self.values.clone(),
            allow_nulls: self.allow_nulls,
            _entity: PhantomData,
        }
    }
}

impl<E> fmt::Debug for Changes<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Changes")
            .field("values", &self.values)
            .field("allow_nulls", &self.allow_nulls)
            .finish()
    }
}

impl<E: Entity> Changes<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from every field a partial instance carries.
    pub fn from_partial<P: Partial<E> + ?Sized>(partial: &P) -> Self {
        let mut changes = Self::new();
        partial.write(&mut changes);
        changes
    }

    /// Sets a keyword field, overriding any earlier value for the column.
    pub fn set<T: Into<Value>>(mut self, col: Col<E, T>, value: impl Into<T>) -> Self {
        self.put(col, value.into());
        self
    }

    /// Merges a partial instance underneath the keyword fields already set.
    pub fn with_partial<P: Partial<E> + ?Sized>(mut self, partial: &P) -> Self {
        let incoming = Self::from_partial(partial);
        for (column, value) in incoming.values {
            if self.get(column).is_none() {
                self.values.push((column, value));
            }
        }
        self
    }

    /// Lets NULL values overwrite stored ones regardless of the repository's policy.
    pub fn allow_nulls(mut self) -> Self {
        self.allow_nulls = true;
        self
    }

    /// In-place [`Changes::set`], for [`Partial`] implementations.
    pub fn put<T: Into<Value>>(&mut self, col: Col<E, T>, value: T) {
        self.put_raw(col.name, value.into());
    }

    pub(crate) fn put_raw(&mut self, column: &'static str, value: Value) {
        match self.values.iter_mut().find(|(name, _)| *name == column) {
            Some(slot) => slot.1 = value,
            None => self.values.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| value)
    }

    pub fn nulls_allowed(&self) -> bool {
        self.allow_nulls
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.values.iter().map(|(column, value)| (*column, value))
    }
}

/// Builds a new in-memory entity from a merged payload.
///
/// Every supplied value is assigned, NULLs included. Required columns that were
/// not supplied, values that do not fit their field type, and failures reported by
/// [`Validate`](crate::Validate) are collected into one [`ValidationError`].
pub(crate) fn build<E: Entity>(changes: &Changes<E>) -> Result<E> {
    let mut entity = E::default();
    let mut failures = ValidationError::new(E::TABLE);

    for (column, value) in changes.iter() {
        if let Err(reason) = entity.assign(column, value.clone()) {
            failures.push(column, reason);
        }
    }

    for column in E::COLUMNS.iter().filter(|c| c.is_required()) {
        match changes.get(column.name) {
            None | Some(Value::Null) => failures.push(column.name, "field required"),
            Some(_) => {}
        }
    }

    if failures.is_empty() {
        if let Err(invalid) = entity.validate() {
            failures.errors.extend(invalid.errors);
        }
    }

    failures.into_result()?;
    Ok(entity)
}

/// Assigns a merged payload onto an existing entity, then re-validates all of it.
pub(crate) fn apply<E: Entity>(
    entity: &mut E,
    changes: &Changes<E>,
    policy: NullPolicy,
) -> Result<()> {
    let write_nulls = changes.nulls_allowed() || policy == NullPolicy::IncludeNone;
    let mut failures = ValidationError::new(E::TABLE);

    for (column, value) in changes.iter() {
        if *value == Value::Null && !write_nulls {
            trace!("skipping NULL for {}.{}", E::TABLE, column);
            continue;
        }
        if let Err(reason) = entity.assign(column, value.clone()) {
            failures.push(column, reason);
        }
    }

    if let Err(invalid) = entity.validate() {
        failures.errors.extend(invalid.errors);
    }

    failures.into_result()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::DbError,
        test_support::{users, User, UserIn},
        traits::Updatable,
    };

    fn user(username: &str, email: Option<&str>) -> User {
        User {
            id: Some(1),
            username: username.to_string(),
            email: email.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_keyword_fields_win_in_either_order() {
        let dto = UserIn {
            username: "from-dto".to_string(),
            email: Some("dto@example.com".to_string()),
        };

        let partial_first = Changes::from_partial(&dto).set(users::USERNAME, "keyword");
        let keyword_first = Changes::<User>::new()
            .set(users::USERNAME, "keyword")
            .with_partial(&dto);

        for changes in [partial_first, keyword_first] {
            assert_eq!(
                changes.get("username"),
                Some(&Value::Text("keyword".to_string()))
            );
            assert_eq!(
                changes.get("email"),
                Some(&Value::Text("dto@example.com".to_string()))
            );
        }
    }

    #[test]
    fn test_entity_as_partial_excludes_primary_key() {
        let changes = Changes::from_partial(&user("alice", None));

        assert!(changes.get("id").is_none());
        assert_eq!(changes.get("email"), Some(&Value::Null));
    }

    #[test]
    fn test_build_requires_non_nullable_columns() {
        let err = build::<User>(&Changes::new()).unwrap_err();

        match err {
            DbError::Validation(invalid) => {
                assert!(invalid.has_field("username"));
                assert!(!invalid.has_field("email"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_build_runs_entity_validation() {
        let err = build::<User>(&Changes::new().set(users::USERNAME, "   ")).unwrap_err();
        assert!(matches!(err, DbError::Validation(ref v) if v.has_field("username")));
    }

    #[test]
    fn test_apply_excludes_nulls_by_default() {
        let mut entity = user("alice", Some("alice@example.com"));
        let changes = Changes::from_partial(&user("alicia", None));

        entity.apply(&changes, NullPolicy::ExcludeNone).unwrap();

        assert_eq!(entity.username, "alicia");
        assert_eq!(entity.email.as_deref(), Some("alice@example.com"));
        assert_eq!(entity.id, Some(1));
    }

    #[test]
    fn test_apply_writes_nulls_when_asked() {
        let mut by_policy = user("alice", Some("alice@example.com"));
        by_policy
            .apply(
                &Changes::new().set(users::EMAIL, None::<String>),
                NullPolicy::IncludeNone,
            )
            .unwrap();
        assert_eq!(by_policy.email, None);

        let mut by_flag = user("alice", Some("alice@example.com"));
        by_flag
            .apply(
                &Changes::new().set(users::EMAIL, None::<String>).allow_nulls(),
                NullPolicy::ExcludeNone,
            )
            .unwrap();
        assert_eq!(by_flag.email, None);
    }

    #[test]
    fn test_apply_keeps_partial_assignment_on_failure() {
        let mut entity = user("alice", None);
        let changes = Changes::new()
            .set(users::EMAIL, Some("new@example.com".to_string()))
            .set(users::USERNAME, "");

        let err = entity.apply(&changes, NullPolicy::ExcludeNone).unwrap_err();

        assert!(matches!(err, DbError::Validation(_)));
        assert_eq!(entity.email.as_deref(), Some("new@example.com"));
        assert_eq!(entity.username, "");
    }

    #[test]
    fn test_apply_reports_type_coercion_failure() {
        let mut entity = user("alice", None);
        let mut changes = Changes::<User>::new().allow_nulls();
        changes.put_raw("username", Value::Null);

        let err = entity.apply(&changes, NullPolicy::ExcludeNone).unwrap_err();
        assert!(matches!(err, DbError::Validation(ref v) if v.has_field("username")));
    }
}
