//! Storage layer: the async `Store` trait plus in-memory and SQLite
//! implementations sharing the same semantics.

pub mod db;
pub mod memory;
pub mod ports;
pub mod sqlite;

pub use memory::MemoryStore;
pub use ports::{Store, StoreError};
pub use sqlite::SqliteStore;
