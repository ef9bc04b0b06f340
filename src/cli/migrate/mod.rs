//! Migrate command - manages the SQLite schema

use clap::{Args, ValueEnum};
use tracing::info;

use crate::config::AppConfig;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::storage::{connect, Migrator, SqliteMigrator, StorageType};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum MigrateAction {
    /// Apply pending migrations
    #[default]
    Run,
    /// Revert the most recent migration
    Revert,
    /// Print the current schema version
    Version,
}

#[derive(Debug, Args)]
pub struct MigrateArgs {
    #[arg(value_enum, default_value_t = MigrateAction::Run)]
    pub action: MigrateAction,

    /// Database URL; overrides `storage.database_url`
    #[arg(long)]
    pub database_url: Option<String>,
}

pub async fn run(args: MigrateArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    init_logging(&config.logging);

    if args.database_url.is_none()
        && StorageType::from_str(&config.storage.backend) != Some(StorageType::Sqlite)
    {
        anyhow::bail!(
            "Storage backend '{}' has no schema to migrate",
            config.storage.backend
        );
    }

    let database_url = args
        .database_url
        .unwrap_or_else(|| config.storage.database_url.clone());
    let pool = connect(&database_url, config.storage.max_connections).await?;

    execute(&SqliteMigrator::new(pool), args.action).await
}

async fn execute(migrator: &dyn Migrator, action: MigrateAction) -> anyhow::Result<()> {
    match action {
        MigrateAction::Run => {
            migrator.run().await?;
            info!("Migrations applied");
        }
        MigrateAction::Revert => {
            migrator.revert().await?;
            info!("Last migration reverted");
        }
        MigrateAction::Version => match migrator.version().await? {
            Some(version) => println!("{}", version),
            None => println!("no migrations applied"),
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::connect_in_memory;

    #[tokio::test]
    async fn test_run_then_revert() {
        let pool = connect_in_memory().await.unwrap();
        let migrator = SqliteMigrator::new(pool);

        execute(&migrator, MigrateAction::Run).await.unwrap();
        let applied = migrator.version().await.unwrap();
        assert!(applied.is_some());

        execute(&migrator, MigrateAction::Revert).await.unwrap();
        assert!(migrator.version().await.unwrap() < applied);
    }

    #[test]
    fn test_default_action_is_run() {
        assert_eq!(MigrateAction::default(), MigrateAction::Run);
    }
}
