pub mod in_memory;
pub mod sqlite_store;

pub use in_memory::InMemorySettingsStore;
pub use sqlite_store::SqliteSettingsStore;
