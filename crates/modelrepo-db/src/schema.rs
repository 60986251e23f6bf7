//! Static table metadata carried by every [`Entity`](crate::Entity).

use rusqlite::types::{FromSql, ValueRef};

/// A non-key column of an entity's table.
#[derive(Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    nullable: fn() -> bool,
}

impl Column {
    pub const fn new(name: &'static str, nullable: fn() -> bool) -> Self {
        Self { name, nullable }
    }

    /// A required column must be supplied when an entity is created.
    pub fn is_required(&self) -> bool {
        !(self.nullable)()
    }
}

impl std::fmt::Debug for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Column")
            .field("name", &self.name)
            .field("required", &self.is_required())
            .finish()
    }
}

/// Whether the field type `T` can hold SQL NULL.
pub fn nullable<T: FromSql>() -> bool {
    T::column_result(ValueRef::Null).is_ok()
}

/// `column` references `references.referenced_column`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    pub column: &'static str,
    pub references: &'static str,
    pub referenced_column: &'static str,
}

impl ForeignKey {
    pub const fn new(
        column: &'static str,
        references: &'static str,
        referenced_column: &'static str,
    ) -> Self {
        Self {
            column,
            references,
            referenced_column,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nullability_follows_field_type() {
        assert!(nullable::<Option<String>>());
        assert!(nullable::<Option<i64>>());
        assert!(!nullable::<String>());
        assert!(!nullable::<i64>());
        assert!(!nullable::<bool>());
    }

    #[test]
    fn test_required_column() {
        let name = Column::new("name", nullable::<String>);
        let bio = Column::new("bio", nullable::<Option<String>>);

        assert!(name.is_required());
        assert!(!bio.is_required());
    }
}
