use sqlx::{Executor, PgPool};
use tracing::info;

const MIGRATION_001_INITIAL: &str = include_str!("../migrations/001_initial.sql");

/// Applies the embedded schema. Every statement is idempotent.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    info!("Running database migrations...");

    info!("Running migration 001: Initial schema");
    pool.execute(MIGRATION_001_INITIAL).await?;

    info!("All migrations completed successfully");
    Ok(())
}
