//! Macros for defining entity schemas.
//!
//! The [`define_entity!`] macro ties a plain struct to its table: it generates a
//! module of typed column constants and the [`Entity`](crate::Entity) impl.

/// Declares the table behind a struct.
///
/// The struct must derive `Default` and `Clone`, implement
/// [`Validate`](crate::Validate), and hold its primary key as `Option<i64>`.
/// Fields not listed (relationship attributes) keep their default when a row is
/// decoded. Column names are the field names.
///
/// # Syntax
///
/// ```ignore
/// #[derive(Debug, Clone, Default)]
/// pub struct Post {
///     pub id: Option<i64>,
///     pub author_id: i64,
///     pub title: String,
///     pub body: Option<String>,
/// }
///
/// impl Validate for Post {}
///
/// define_entity!(
///     Post => posts {
///         table: "posts",
///         primary_key: ID => id,
///         columns: {
///             AUTHOR_ID: i64 => author_id,
///             TITLE: String => title,
///             BODY: Option<String> => body,
///         },
///         foreign_keys: [author_id -> "users".id],
///     }
/// );
/// ```
///
/// This expands to a module of columns plus `impl Entity for Post`:
///
/// ```ignore
/// pub mod posts {
///     pub const TABLE: &str = "posts";
///     pub const ID: Col<Post, Option<i64>> = Col::new("posts", "id");
///     pub const AUTHOR_ID: Col<Post, i64> = Col::new("posts", "author_id");
///     pub const TITLE: Col<Post, String> = Col::new("posts", "title");
///     pub const BODY: Col<Post, Option<String>> = Col::new("posts", "body");
/// }
/// ```
///
/// A column is required on create unless its type can hold NULL.
#[macro_export]
macro_rules! define_entity {
    (
        $entity:ident => $module:ident {
            table: $table:literal,
            primary_key: $pk_const:ident => $pk_field:ident,
            columns: {
                $($col_const:ident: $col_type:ty => $field:ident),* $(,)?
            }
            $(, foreign_keys: [
                $($fk_col:ident -> $fk_table:literal . $fk_ref:ident),* $(,)?
            ])?
            $(,)?
        }
    ) => {
        pub mod $module {
            #[allow(unused_imports)]
            use super::*;

            pub const TABLE: &str = $table;

            pub const $pk_const: $crate::expr::Col<$entity, Option<i64>> =
                $crate::expr::Col::new($table, stringify!($pk_field));

            $(
                pub const $col_const: $crate::expr::Col<$entity, $col_type> =
                    $crate::expr::Col::new($table, stringify!($field));
            )*
        }

        impl $crate::Entity for $entity {
            const TABLE: &'static str = $table;
            const PRIMARY_KEY: &'static str = stringify!($pk_field);
            const COLUMNS: &'static [$crate::schema::Column] = &[
                $(
                    $crate::schema::Column::new(
                        stringify!($field),
                        $crate::schema::nullable::<$col_type>,
                    ),
                )*
            ];
            const FOREIGN_KEYS: &'static [$crate::schema::ForeignKey] = &[
                $($(
                    $crate::schema::ForeignKey::new(
                        stringify!($fk_col),
                        $fk_table,
                        stringify!($fk_ref),
                    ),
                )*)?
            ];

            fn primary_key(&self) -> Option<i64> {
                self.$pk_field
            }

            fn set_primary_key(&mut self, key: i64) {
                self.$pk_field = Some(key);
            }

            #[allow(clippy::needless_update)]
            fn from_record(record: &$crate::Record) -> $crate::Result<Self> {
                Ok(Self {
                    $pk_field: record.get(stringify!($pk_field))?,
                    $($field: record.get(stringify!($field))?,)*
                    ..Default::default()
                })
            }

            fn values(&self) -> Vec<(&'static str, $crate::Value)> {
                vec![
                    $((stringify!($field), $crate::Value::from(self.$field.clone())),)*
                ]
            }

            fn assign(
                &mut self,
                column: &str,
                value: $crate::Value,
            ) -> std::result::Result<(), String> {
                match column {
                    c if c == stringify!($pk_field) => {
                        self.$pk_field = $crate::record::decode_value(&value)?;
                    }
                    $(
                        c if c == stringify!($field) => {
                            self.$field = $crate::record::decode_value(&value)?;
                        }
                    )*
                    other => return Err(format!("no column {other} on {}", $table)),
                }
                Ok(())
            }
        }
    };
}
