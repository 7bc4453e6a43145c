//! SQLite pool setup and schema migration.

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

use crate::ports::StoreError;

/// Open (creating if needed) the database at `db_path` and apply the schema.
///
/// Pass `:memory:` for an in-memory database; keep `max_connections` at 1 in
/// that case since each connection would otherwise see its own database.
pub async fn open_pool(db_path: &str, max_connections: u32) -> Result<SqlitePool, StoreError> {
    if let Some(parent) = Path::new(db_path).parent() {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::Backend(e.to_string()))?;
    }

    let db_url = format!("sqlite:{db_path}?mode=rwc");
    info!("Connecting to database: {}", db_path);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(&db_url)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Split migration SQL into executable statements.
///
/// Comment lines are stripped from the whole file before splitting on `;`;
/// a comment can itself contain semicolons.
fn statements(sql: &str) -> Vec<String> {
    let stripped: String = sql
        .lines()
        .filter(|line| !line.trim().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");
    stripped
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

async fn run_migrations(pool: &SqlitePool) -> Result<(), StoreError> {
    let migration_sql = include_str!("../migrations/001_init.sql");

    info!("Running database migrations...");

    for statement in statements(migration_sql) {
        if let Err(e) = sqlx::query(&statement).execute(pool).await {
            // "already exists" is expected on re-runs
            if e.to_string().contains("already exists") {
                continue;
            }
            return Err(StoreError::Backend(format!("migration failed: {e}")));
        }
    }

    info!("Database migrations complete");
    Ok(())
}
