//! Entities and helpers shared by the unit tests.

use crate::{
    changes::Changes,
    define_entity,
    error::ValidationError,
    relation::Relationship,
    traits::{Partial, Validate},
};

pub const SCHEMA: &str = "
    CREATE TABLE users (
        id INTEGER PRIMARY KEY,
        username TEXT NOT NULL,
        email TEXT
    );
    CREATE TABLE user_relationships (
        id INTEGER PRIMARY KEY,
        user_id INTEGER NOT NULL REFERENCES users(id),
        value TEXT NOT NULL
    );
";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct User {
    pub id: Option<i64>,
    pub username: String,
    pub email: Option<String>,
    pub relationships: Vec<UserRelationship>,
}

impl Validate for User {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut invalid = ValidationError::new("users");
        if self.username.trim().is_empty() {
            invalid.push("username", "must not be blank");
        }
        invalid.into_result()
    }
}

define_entity!(
    User => users {
        table: "users",
        primary_key: ID => id,
        columns: {
            USERNAME: String => username,
            EMAIL: Option<String> => email,
        }
    }
);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserRelationship {
    pub id: Option<i64>,
    pub user_id: i64,
    pub value: String,
    pub user: Option<Box<User>>,
}

impl Validate for UserRelationship {}

define_entity!(
    UserRelationship => user_relationships {
        table: "user_relationships",
        primary_key: ID => id,
        columns: {
            USER_ID: i64 => user_id,
            VALUE: String => value,
        },
        foreign_keys: [user_id -> "users".id],
    }
);

fn attach_relationships(user: &mut User, relationships: Vec<UserRelationship>) {
    user.relationships = relationships;
}

fn attach_user(relationship: &mut UserRelationship, user: Option<User>) {
    relationship.user = user.map(Box::new);
}

pub const USER_RELATIONSHIPS: Relationship<User, UserRelationship> =
    Relationship::has_many("relationships", "user_id", attach_relationships);

pub const RELATIONSHIP_USER: Relationship<UserRelationship, User> =
    Relationship::belongs_to("user", "user_id", attach_user);

/// Input DTO covering a subset of [`User`].
#[derive(Debug, Clone)]
pub struct UserIn {
    pub username: String,
    pub email: Option<String>,
}

impl Partial<User> for UserIn {
    fn write(&self, changes: &mut Changes<User>) {
        changes.put(users::USERNAME, self.username.clone());
        changes.put(users::EMAIL, self.email.clone());
    }
}

/// Routes library logs to the test harness; set `RUST_LOG` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
