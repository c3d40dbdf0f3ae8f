// SQLite-backed key-value store
// Holds locally persisted state such as the favorites list

pub mod cache;

pub use cache::{CacheError, KvStore};
