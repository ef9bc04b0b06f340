//! Card repository implementations

mod in_memory;
mod sqlite_repository;

pub use in_memory::InMemoryCardRepository;
pub use sqlite_repository::SqliteCardRepository;
