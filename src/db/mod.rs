//! Database access: the Diesel pool, the [`Store`] seam and an in-memory store.

pub mod database;
pub mod memory;
pub mod store;

pub use database::{Database, DatabaseConfig, DbConnection};
pub use memory::MemoryStore;
pub use store::{DieselStore, Store};
