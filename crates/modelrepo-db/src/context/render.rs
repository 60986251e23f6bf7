//! Renders composed queries and entity writes as SQLite statements.

use rusqlite::types::Value;

use crate::{
    error::{DbError, Result},
    query::{JoinClause, Select},
    schema::ForeignKey,
    traits::{Entity, Expression},
};

/// A rendered statement and its positional parameters.
pub(crate) type Statement = (String, Vec<Value>);

/// `SELECT E.* FROM E [JOIN ..] [WHERE ..] [ORDER BY ..] [LIMIT ? OFFSET ?]`
pub(crate) fn select<E: Entity>(query: &Select<E>) -> Result<Statement> {
    let mut sql = format!("SELECT {table}.* FROM {table}", table = E::TABLE);
    let mut params = Vec::new();

    let mut joined: Vec<(&'static str, &'static [ForeignKey])> = vec![(E::TABLE, E::FOREIGN_KEYS)];
    for join in query.joins() {
        sql.push(' ');
        sql.push_str(&join_sql::<E>(join, &joined)?);
        joined.push((join.table, join.foreign_keys));
    }

    if let Some(filter) = query.filter() {
        sql.push_str(" WHERE ");
        sql.push_str(&filter.to_sql(&mut params));
    }

    if !query.order().is_empty() {
        let terms: Vec<String> = query
            .order()
            .iter()
            .map(|o| format!("{} {}", o.column, if o.desc { "DESC" } else { "ASC" }))
            .collect();
        sql.push_str(" ORDER BY ");
        sql.push_str(&terms.join(", "));
    }

    if let Some(window) = query.window() {
        sql.push_str(" LIMIT ? OFFSET ?");
        params.push(Value::Integer(to_sql_int(window.limit)));
        params.push(Value::Integer(to_sql_int(window.offset)));
    }

    Ok((sql, params))
}

/// Finds the foreign key linking `join` to any table already in the query.
///
/// The joined table referencing an earlier table is tried first, then an
/// earlier table referencing the joined one.
fn join_sql<E: Entity>(
    join: &JoinClause,
    joined: &[(&'static str, &'static [ForeignKey])],
) -> Result<String> {
    for (left, left_keys) in joined {
        if let Some(fk) = join.foreign_keys.iter().find(|fk| fk.references == *left) {
            return Ok(format!(
                "JOIN {t} ON {t}.{c} = {l}.{r}",
                t = join.table,
                c = fk.column,
                l = left,
                r = fk.referenced_column
            ));
        }
        if let Some(fk) = left_keys.iter().find(|fk| fk.references == join.table) {
            return Ok(format!(
                "JOIN {t} ON {l}.{c} = {t}.{r}",
                t = join.table,
                c = fk.column,
                l = left,
                r = fk.referenced_column
            ));
        }
    }

    if join.explicit {
        // The caller's condition relates the tables.
        return Ok(format!("CROSS JOIN {}", join.table));
    }

    Err(DbError::NoForeignKey {
        from: E::TABLE,
        to: join.table,
    })
}

/// `INSERT` of every non-NULL column, so column defaults apply to the rest.
/// The primary key is included only when set.
pub(crate) fn insert<E: Entity>(entity: &E) -> Statement {
    let mut columns = Vec::new();
    let mut params = Vec::new();

    if let Some(key) = entity.primary_key() {
        columns.push(E::PRIMARY_KEY);
        params.push(Value::Integer(key));
    }
    for (column, value) in entity.values() {
        if value == Value::Null {
            continue;
        }
        columns.push(column);
        params.push(value);
    }

    if columns.is_empty() {
        return (format!("INSERT INTO {} DEFAULT VALUES", E::TABLE), params);
    }

    let placeholders = vec!["?"; columns.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        E::TABLE,
        columns.join(", "),
        placeholders
    );
    (sql, params)
}

/// `UPDATE` of every column by primary key. `None` when there is nothing to set.
pub(crate) fn update<E: Entity>(entity: &E, key: i64) -> Option<Statement> {
    let values = entity.values();
    if values.is_empty() {
        return None;
    }

    let assignments: Vec<String> = values.iter().map(|(c, _)| format!("{c} = ?")).collect();
    let mut params: Vec<Value> = values.into_iter().map(|(_, v)| v).collect();
    params.push(Value::Integer(key));

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        E::TABLE,
        assignments.join(", "),
        E::PRIMARY_KEY
    );
    Some((sql, params))
}

/// `SELECT * FROM table WHERE column IN (?, ..) ORDER BY order_by`
pub(crate) fn select_in(
    table: &str,
    column: &str,
    keys: &[Value],
    order_by: &str,
) -> Statement {
    let placeholders = vec!["?"; keys.len()].join(", ");
    let sql = format!(
        "SELECT * FROM {table} WHERE {column} IN ({placeholders}) ORDER BY {order_by}"
    );
    (sql, keys.to_vec())
}

fn to_sql_int(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        query::QueryOptions,
        test_support::{user_relationships, users, User, UserRelationship},
    };

    #[test]
    fn test_select_all() {
        let (sql, params) = select(&QueryOptions::<User>::new().compose()).unwrap();

        assert_eq!(sql, "SELECT users.* FROM users");
        assert!(params.is_empty());
    }

    #[test]
    fn test_select_full_shape() {
        let query = QueryOptions::<User>::new()
            .filter(users::USERNAME.like("ali"))
            .order_by(users::USERNAME)
            .order_by(users::ID.desc())
            .page(2, 10)
            .compose();

        let (sql, params) = select(&query).unwrap();

        assert_eq!(
            sql,
            "SELECT users.* FROM users WHERE users.username LIKE ? \
             ORDER BY users.username ASC, users.id DESC LIMIT ? OFFSET ?"
        );
        assert_eq!(
            params,
            vec![
                Value::Text("%ali%".to_string()),
                Value::Integer(10),
                Value::Integer(10)
            ]
        );
    }

    #[test]
    fn test_join_inferred_from_joined_table() {
        let query = QueryOptions::<User>::new()
            .join::<UserRelationship>()
            .compose();

        let (sql, _) = select(&query).unwrap();
        assert_eq!(
            sql,
            "SELECT users.* FROM users JOIN user_relationships \
             ON user_relationships.user_id = users.id"
        );
    }

    #[test]
    fn test_join_inferred_from_base_table() {
        let query = QueryOptions::<UserRelationship>::new()
            .join_on::<User>(users::USERNAME.eq("alice".to_string()))
            .compose();

        let (sql, params) = select(&query).unwrap();
        assert_eq!(
            sql,
            "SELECT user_relationships.* FROM user_relationships JOIN users \
             ON user_relationships.user_id = users.id WHERE users.username = ?"
        );
        assert_eq!(params, vec![Value::Text("alice".to_string())]);
    }

    #[test]
    fn test_implicit_join_without_foreign_key_fails() {
        let query = QueryOptions::<User>::new().join::<User>().compose();

        assert!(matches!(
            select(&query),
            Err(DbError::NoForeignKey {
                from: "users",
                to: "users"
            })
        ));
    }

    #[test]
    fn test_explicit_join_without_foreign_key_cross_joins() {
        let query = QueryOptions::<User>::new()
            .join_on::<User>(user_relationships::VALUE.eq("x".to_string()))
            .compose();

        let (sql, _) = select(&query).unwrap();
        assert!(sql.starts_with("SELECT users.* FROM users CROSS JOIN users WHERE"));
    }

    #[test]
    fn test_insert_and_update() {
        let user = User {
            username: "alice".to_string(),
            ..Default::default()
        };

        let (sql, params) = insert(&user);
        assert_eq!(sql, "INSERT INTO users (username) VALUES (?)");
        assert_eq!(params, vec![Value::Text("alice".to_string())]);

        let (sql, params) = update(&user, 3).unwrap();
        assert_eq!(sql, "UPDATE users SET username = ?, email = ? WHERE id = ?");
        assert_eq!(params.last(), Some(&Value::Integer(3)));
    }

    #[test]
    fn test_insert_with_key() {
        let user = User {
            id: Some(9),
            username: "alice".to_string(),
            ..Default::default()
        };

        let (sql, params) = insert(&user);
        assert_eq!(sql, "INSERT INTO users (id, username) VALUES (?, ?)");
        assert_eq!(params[0], Value::Integer(9));
    }

    #[test]
    fn test_select_in() {
        let (sql, params) = select_in(
            "user_relationships",
            "user_id",
            &[Value::Integer(1), Value::Integer(2)],
            "id",
        );

        assert_eq!(
            sql,
            "SELECT * FROM user_relationships WHERE user_id IN (?, ?) ORDER BY id"
        );
        assert_eq!(params.len(), 2);
    }
}
