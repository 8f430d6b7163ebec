//! ABOUTME: Shared error, domain types, and small traits for the scholarly agent engine
//! ABOUTME: The foundational crate every other workspace member depends on

pub mod error;
pub mod schema;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
