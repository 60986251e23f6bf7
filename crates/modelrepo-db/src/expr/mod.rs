//! Expression types for building filter conditions.
//!
//! This module contains the building blocks of query filters.

pub mod column;
pub mod ops;

pub use column::Col;
pub use ops::Condition;
