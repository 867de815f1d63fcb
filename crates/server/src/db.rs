use anyhow::Context;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use selfstudy_migration::{Migrator, MigratorTrait};
use tracing::info;

pub async fn connect_and_migrate(
    options: impl Into<ConnectOptions>,
) -> anyhow::Result<DatabaseConnection> {
    let db = Database::connect(options)
        .await
        .context("failed to connect to database")?;

    Migrator::up(&db, None)
        .await
        .context("failed to apply migrations")?;
    info!("database migrations applied");

    Ok(db)
}
