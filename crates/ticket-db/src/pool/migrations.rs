//! Schema migrations
//!
//! Migrations are read from disk at startup; the `migrate!` macro needs the
//! sqlx macros feature, which this workspace leaves off.

use std::path::Path;

use sqlx::migrate::{MigrateError, Migrator};
use sqlx::PgPool;
use tracing::info;

/// Directory used when `MIGRATIONS_DIR` is unset
pub const DEFAULT_MIGRATIONS_DIR: &str = "./migrations";

/// Apply all pending migrations in `dir`
pub async fn run_migrations(pool: &PgPool, dir: impl AsRef<Path>) -> Result<(), MigrateError> {
    let dir = dir.as_ref();
    let migrator = Migrator::new(dir).await?;
    migrator.run(pool).await?;
    info!(dir = %dir.display(), count = migrator.iter().count(), "Migrations applied");
    Ok(())
}
