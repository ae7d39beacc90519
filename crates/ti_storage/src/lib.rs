//! Storage backends implementing the `ti_core` store traits.

pub mod backends;

pub use backends::memory::MemoryStore;
#[cfg(feature = "sqlite")]
pub use backends::sqlite::SqliteStore;
