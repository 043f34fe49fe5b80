use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Create the board tables. Idempotent.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate_pool(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create the board tables on an already open pool.
///
/// `AUTOINCREMENT` keeps ids monotonic: a deleted id is never handed out
/// again. There are no foreign keys; deleting an idea leaves the
/// connections that reference it in place.
pub async fn migrate_pool(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ideas (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            text TEXT NOT NULL,
            x INTEGER NOT NULL DEFAULT 200,
            y INTEGER NOT NULL DEFAULT 200,
            z INTEGER NOT NULL DEFAULT 0,
            width INTEGER NOT NULL DEFAULT 200,
            height INTEGER NOT NULL DEFAULT 100
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS connections (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source_id INTEGER NOT NULL,
            target_id INTEGER NOT NULL,
            source_point TEXT NOT NULL,
            target_point TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_connections_source ON connections(source_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_connections_target ON connections(target_id)")
        .execute(pool)
        .await?;

    Ok(())
}
