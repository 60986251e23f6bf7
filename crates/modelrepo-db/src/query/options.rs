//! Declarative query clauses and their composition.

use std::{fmt, sync::Arc};

use tracing::trace;

use crate::{
    expr::Condition,
    query::{
        clause::{Join, OrderClause, Window},
        select::Select,
    },
    relation::{Relationship, SelectIn},
    traits::{Entity, Expression},
};

/// Everything a caller may say about the shape of a query on `E`.
///
/// Every clause is optional. The order in which builder methods are called does
/// not matter: [`QueryOptions::compose`] always applies clauses in the same order.
///
/// # Example
///
/// ```ignore
/// let options = QueryOptions::new()
///     .filter(users::USERNAME.like("ali"))
///     .join::<Post>()
///     .load(USER_POSTS)
///     .order_by(users::USERNAME)
///     .order_by(users::ID.desc())
///     .limit(10);
/// ```
pub struct QueryOptions<E> {
    filter: Option<Condition>,
    joins: Vec<Join>,
    relationships: Vec<Arc<dyn SelectIn<E>>>,
    order_by: Vec<OrderClause>,
    window: Window,
}

impl<E> Default for QueryOptions<E> {
    fn default() -> Self {
        Self {
            filter: None,
            joins: Vec::new(),
            relationships: Vec::new(),
            order_by: Vec::new(),
            window: Window::default(),
        }
    }
}

impl<E> Clone for QueryOptions<E> {
    fn clone(&self) -> Self {
        Self {
            filter: self.filter.clone(),
            joins: self.joins.clone(),
            relationships: self.relationships.clone(),
            order_by: self.order_by.clone(),
            window: self.window,
        }
    }
}

impl<E> fmt::Debug for QueryOptions<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let relationships: Vec<_> = self.relationships.iter().map(|r| r.name()).collect();
        f.debug_struct("QueryOptions")
            .field("filter", &self.filter)
            .field("joins", &self.joins)
            .field("relationships", &relationships)
            .field("order_by", &self.order_by)
            .field("window", &self.window)
            .finish()
    }
}

impl<E: Entity> QueryOptions<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter predicate. Calling it again ANDs the predicates together.
    pub fn filter(mut self, expr: impl Expression) -> Self {
        let condition = expr.into_condition();
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and_also(condition),
            None => condition,
        });
        self
    }

    /// Joins `T` on the foreign key declared between the two tables.
    pub fn join<T: Entity>(mut self) -> Self {
        self.joins.push(Join::implicit::<T>());
        self
    }

    /// Joins `T` and ANDs `condition` into the filter.
    pub fn join_on<T: Entity>(mut self, condition: impl Expression) -> Self {
        self.joins.push(Join::on::<T>(condition));
        self
    }

    /// Eagerly loads a relationship of `E`.
    pub fn load<C: Entity>(mut self, relationship: Relationship<E, C>) -> Self {
        self.relationships.push(Arc::new(relationship));
        self
    }

    /// Appends an ordering key; columns sort ascending unless wrapped with `.desc()`.
    pub fn order_by(mut self, order: impl Into<OrderClause>) -> Self {
        self.order_by.push(order.into());
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.window.offset = offset;
        self
    }

    /// Zero means unbounded.
    pub fn limit(mut self, limit: u64) -> Self {
        self.window.limit = limit;
        self
    }

    pub fn page(mut self, page: u64, per_page: u64) -> Self {
        self.window = Window::page(page, per_page);
        self
    }

    /// Drops the pagination window; `first` and `one` set their own limit.
    pub(crate) fn unpaginated(mut self) -> Self {
        self.window = Window::default();
        self
    }

    /// Builds the query, applying clauses in this order:
    ///
    /// 1. select all of `E`
    /// 2. pagination (offset, then limit), only when the limit is non-zero
    /// 3. joins, in sequence; a join's own condition is ANDed into the filter
    /// 4. eager-load requests
    /// 5. the filter predicate, ANDed into the filter
    /// 6. ordering keys, in the order given
    pub fn compose(self) -> Select<E> {
        let mut query = Select::<E>::all();

        if self.window.is_bounded() {
            query = query.paginate(self.window);
        }

        for join in self.joins {
            query = match join {
                Join::Implicit(clause) => query.join(clause),
                Join::On(clause, condition) => query.join(clause).and_where(condition),
            };
        }

        for relationship in self.relationships {
            query = query.load(relationship);
        }

        if let Some(filter) = self.filter {
            query = query.and_where(filter);
        }

        for order in self.order_by {
            query = query.order_by(order);
        }

        trace!("composed query on {}: {:?}", E::TABLE, query);
        query
    }
}

/// Free-function form of [`QueryOptions::compose`].
pub fn compose<E: Entity>(options: QueryOptions<E>) -> Select<E> {
    options.compose()
}

#[cfg(test)]
mod tests {
    use rusqlite::types::Value;

    use super::*;
    use crate::test_support::{user_relationships, users, User, UserRelationship, USER_RELATIONSHIPS};

    fn filter_sql<E: Entity>(query: &Select<E>) -> Option<(String, Vec<Value>)> {
        query.filter().map(|f| {
            let mut params = vec![];
            let sql = f.to_sql(&mut params);
            (sql, params)
        })
    }

    #[test]
    fn test_no_clauses_selects_everything() {
        let query = QueryOptions::<User>::new().compose();

        assert!(query.joins().is_empty());
        assert!(query.relationships().is_empty());
        assert!(query.filter().is_none());
        assert!(query.order().is_empty());
        assert!(query.window().is_none());
    }

    #[test]
    fn test_zero_limit_ignores_offset() {
        let query = QueryOptions::<User>::new().offset(5).limit(0).compose();
        assert!(query.window().is_none());

        let query = QueryOptions::<User>::new().offset(5).limit(2).compose();
        assert_eq!(query.window(), Some(Window::new(5, 2)));
    }

    #[test]
    fn test_join_condition_precedes_filter_and_uses_and() {
        // Filter supplied first; composition still puts the join condition first.
        let query = QueryOptions::<User>::new()
            .filter(users::USERNAME.eq("alice".to_string()))
            .join_on::<UserRelationship>(user_relationships::VALUE.eq("v1".to_string()))
            .compose();

        let (sql, params) = filter_sql(&query).unwrap();
        assert_eq!(
            sql,
            "(user_relationships.value = ? AND users.username = ?)"
        );
        assert_eq!(
            params,
            vec![
                Value::Text("v1".to_string()),
                Value::Text("alice".to_string())
            ]
        );
        assert_eq!(query.joins().len(), 1);
        assert!(query.joins()[0].explicit);
    }

    #[test]
    fn test_implicit_join_adds_no_condition() {
        let query = QueryOptions::<User>::new().join::<UserRelationship>().compose();

        assert_eq!(query.joins()[0].table, "user_relationships");
        assert!(!query.joins()[0].explicit);
        assert!(query.filter().is_none());
    }

    #[test]
    fn test_repeated_filters_are_anded() {
        let query = QueryOptions::<User>::new()
            .filter(users::USERNAME.eq("a".to_string()))
            .filter(users::EMAIL.null())
            .compose();

        let (sql, _) = filter_sql(&query).unwrap();
        assert_eq!(sql, "(users.username = ? AND users.email IS NULL)");
    }

    #[test]
    fn test_order_keys_keep_listed_order() {
        let query = QueryOptions::<User>::new()
            .order_by(users::USERNAME)
            .order_by(users::ID.desc())
            .compose();

        assert_eq!(
            query.order(),
            &[
                OrderClause {
                    column: "users.username".to_string(),
                    desc: false
                },
                OrderClause {
                    column: "users.id".to_string(),
                    desc: true
                },
            ]
        );
    }

    #[test]
    fn test_relationships_are_recorded() {
        let query = QueryOptions::<User>::new().load(USER_RELATIONSHIPS).compose();

        let names: Vec<_> = query.relationships().iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["relationships"]);
    }

    #[test]
    fn test_compose_free_function_matches_method() {
        let options = QueryOptions::<User>::new()
            .filter(users::USERNAME.eq("a".to_string()))
            .page(2, 10);

        let a = compose(options.clone());
        let b = options.compose();
        assert_eq!(filter_sql(&a), filter_sql(&b));
        assert_eq!(a.window(), Some(Window::new(10, 10)));
        assert_eq!(a.window(), b.window());
    }
}
