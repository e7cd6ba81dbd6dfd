use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::Row;

use plan_core::model::{ReadingSettings, UserStats};

use super::SqliteRepository;
use crate::repository::{SettingsRepository, StatsCacheRepository, StorageError};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn u32_col(row: &sqlx::sqlite::SqliteRow, name: &'static str) -> Result<u32, StorageError> {
    let value: i64 = row.try_get(name).map_err(ser)?;
    u32::try_from(value).map_err(|_| StorageError::Serialization(format!("invalid {name}: {value}")))
}

#[async_trait]
impl SettingsRepository for SqliteRepository {
    async fn save_settings(&self, settings: &ReadingSettings) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO reading_settings (id, weekly_target, plan_start)
            VALUES (1, ?1, ?2)
            ON CONFLICT(id) DO UPDATE SET
                weekly_target = excluded.weekly_target,
                plan_start = excluded.plan_start
            ",
        )
        .bind(i64::from(settings.weekly_target()))
        .bind(settings.plan_start())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(())
    }

    async fn get_settings(&self) -> Result<Option<ReadingSettings>, StorageError> {
        let row = sqlx::query("SELECT weekly_target, plan_start FROM reading_settings WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let weekly_target: i64 = row.try_get("weekly_target").map_err(ser)?;
        let weekly_target = u8::try_from(weekly_target)
            .map_err(|_| StorageError::Serialization(format!("invalid weekly_target: {weekly_target}")))?;
        let plan_start: Option<NaiveDate> = row.try_get("plan_start").map_err(ser)?;

        Ok(Some(ReadingSettings::new(weekly_target, plan_start)))
    }
}

#[async_trait]
impl StatsCacheRepository for SqliteRepository {
    async fn save_stats(&self, stats: &UserStats) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO stats_cache (
                id, total_points, current_streak_days, longest_streak_days,
                total_readings, weekly_points, monthly_points, last_completed_date
            )
            VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                total_points = excluded.total_points,
                current_streak_days = excluded.current_streak_days,
                longest_streak_days = excluded.longest_streak_days,
                total_readings = excluded.total_readings,
                weekly_points = excluded.weekly_points,
                monthly_points = excluded.monthly_points,
                last_completed_date = excluded.last_completed_date
            ",
        )
        .bind(i64::from(stats.total_points))
        .bind(i64::from(stats.current_streak_days))
        .bind(i64::from(stats.longest_streak_days))
        .bind(i64::from(stats.total_readings))
        .bind(i64::from(stats.weekly_points))
        .bind(i64::from(stats.monthly_points))
        .bind(stats.last_completed_date)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(())
    }

    async fn get_stats(&self) -> Result<Option<UserStats>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT total_points, current_streak_days, longest_streak_days,
                   total_readings, weekly_points, monthly_points, last_completed_date
            FROM stats_cache
            WHERE id = 1
            ",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(UserStats {
            total_points: u32_col(&row, "total_points")?,
            current_streak_days: u32_col(&row, "current_streak_days")?,
            longest_streak_days: u32_col(&row, "longest_streak_days")?,
            total_readings: u32_col(&row, "total_readings")?,
            weekly_points: u32_col(&row, "weekly_points")?,
            monthly_points: u32_col(&row, "monthly_points")?,
            last_completed_date: row.try_get("last_completed_date").map_err(ser)?,
        }))
    }
}
