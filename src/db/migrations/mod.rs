//! Embedded schema migrations, one script per supported backend.

use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, DbErr, TransactionTrait};
use tracing::{error, info};

const POSTGRES_MIGRATIONS: &str = include_str!("postgres/0001_create_tagging_tables.sql");
const SQLITE_MIGRATIONS: &str = include_str!("sqlite/0001_create_tagging_tables.sql");

/// Applies the schema for the connected backend. Every statement is idempotent
/// (`IF NOT EXISTS`), so this runs on each startup.
pub async fn run(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let script = match backend {
        DbBackend::Postgres => POSTGRES_MIGRATIONS,
        DbBackend::Sqlite => SQLITE_MIGRATIONS,
        other => {
            return Err(DbErr::Custom(format!(
                "unsupported database backend: {other:?}"
            )))
        }
    };

    info!(?backend, "Running database migrations...");
    let txn = db.begin().await?;
    // Unprepared execution takes the whole multi-statement script at once.
    txn.execute_unprepared(script).await.map_err(|e| {
        error!(error = %e, "Failed to apply migration script");
        e
    })?;
    txn.commit().await?;
    info!("Database migrations completed successfully.");
    Ok(())
}
