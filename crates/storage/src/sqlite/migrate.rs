use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs a single, consolidated migration for the current schema.
///
/// Creates the full schema (reading logs, bookmark, settings, stats cache,
/// app state, and indexes).
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS reading_logs (
                    date TEXT PRIMARY KEY,
                    weekday TEXT NOT NULL,
                    mode TEXT NOT NULL CHECK (mode IN ('scheduled', 'makeup')),
                    completed INTEGER NOT NULL CHECK (completed IN (0, 1)),
                    points_earned INTEGER NOT NULL CHECK (points_earned >= 0),
                    completed_at TEXT,
                    section_ids TEXT NOT NULL DEFAULT ''
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        // Single active bookmark, kept as a fixed-id row.
        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS bookmarks (
                    id INTEGER PRIMARY KEY CHECK (id = 1),
                    date TEXT NOT NULL,
                    day_id INTEGER NOT NULL CHECK (day_id >= 0),
                    scroll_offset REAL NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS reading_settings (
                    id INTEGER PRIMARY KEY CHECK (id = 1),
                    weekly_target INTEGER NOT NULL CHECK (weekly_target BETWEEN 1 AND 7),
                    plan_start TEXT
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS stats_cache (
                    id INTEGER PRIMARY KEY CHECK (id = 1),
                    total_points INTEGER NOT NULL CHECK (total_points >= 0),
                    current_streak_days INTEGER NOT NULL CHECK (current_streak_days >= 0),
                    longest_streak_days INTEGER NOT NULL CHECK (longest_streak_days >= 0),
                    total_readings INTEGER NOT NULL CHECK (total_readings >= 0),
                    weekly_points INTEGER NOT NULL CHECK (weekly_points >= 0),
                    monthly_points INTEGER NOT NULL CHECK (monthly_points >= 0),
                    last_completed_date TEXT
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS app_state (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_reading_logs_completed_date
                    ON reading_logs (completed, date);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
