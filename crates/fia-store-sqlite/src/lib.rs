//! SQLite backend for the FIA reduction database.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Each public operation is one
//! transaction; the UNIQUE constraints in [`schema`] are the final word on
//! natural-key identity.

mod encode;
mod resolve;
mod schema;
mod store;

pub mod error;

pub use error::{Error, ErrorKind, Result};
pub use store::{SqliteStore, StoreOptions};

#[cfg(test)]
mod tests;
