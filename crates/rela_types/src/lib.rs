//! Relational type algebra
//!
//! Types are finite unions of basic-type tuples with separate integer and
//! formula flags. Everything here is a pure value; the signature hierarchy
//! is encoded in each basic type's ancestor chain.

mod basic;
mod rel;
mod types;

pub use basic::{BasicType, INT_ID, NONE_ID, UNIV_ID};
pub use rel::Rel;
pub use types::Type;
