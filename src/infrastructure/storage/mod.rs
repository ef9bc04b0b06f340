//! Storage infrastructure - connection setup, migrations and backend selection

mod factory;
pub mod migrations;
mod sqlite;

pub use factory::{Repositories, StorageFactory, StorageType};
pub use migrations::{run_storage_migrations, Migration, Migrator, SqliteMigrator};
pub use sqlite::{connect, connect_in_memory};
