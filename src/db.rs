use crate::config::AppConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Shared database handle passed to every service.
pub type DbPool = DatabaseConnection;

/// Open a connection pool against the configured database.
pub async fn establish_connection(config: &AppConfig) -> Result<DbPool, DbErr> {
    let mut opts = ConnectOptions::new(config.database_url.clone());
    opts.max_connections(config.db_max_connections)
        .min_connections(config.db_min_connections)
        .connect_timeout(Duration::from_secs(config.db_connect_timeout_secs))
        .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout_secs))
        .sqlx_logging(config.is_development());

    let conn = Database::connect(opts).await?;
    info!("Database connection established");
    Ok(conn)
}

/// Apply any pending migrations.
pub async fn run_migrations(conn: &DbPool) -> Result<(), DbErr> {
    crate::migrator::Migrator::up(conn, None).await?;
    info!("Database migrations applied");
    Ok(())
}

/// Convenience wrapper used at startup and by the test harness.
pub async fn connect_and_migrate(config: &AppConfig) -> Result<Arc<DbPool>, DbErr> {
    let conn = establish_connection(config).await?;
    run_migrations(&conn).await?;
    Ok(Arc::new(conn))
}
