use chrono::NaiveDate;
use plan_core::model::DayReadingLog;

use super::{
    SqliteRepository,
    mapping::{encode_section_ids, map_log_row},
};
use crate::repository::{ReadingLogRepository, StorageError};

const LOG_COLUMNS: &str = "date, weekday, mode, completed, points_earned, completed_at, section_ids";

async fn insert_log<'e, E>(executor: E, log: &DayReadingLog) -> Result<(), StorageError>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        r"
            INSERT INTO reading_logs (
                date, weekday, mode, completed, points_earned, completed_at, section_ids
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(date) DO UPDATE SET
                weekday = excluded.weekday,
                mode = excluded.mode,
                completed = excluded.completed,
                points_earned = excluded.points_earned,
                completed_at = excluded.completed_at,
                section_ids = excluded.section_ids
        ",
    )
    .bind(log.date)
    .bind(log.weekday().to_string())
    .bind(log.mode.as_str())
    .bind(i64::from(log.completed))
    .bind(i64::from(log.points_earned))
    .bind(log.completed_at)
    .bind(encode_section_ids(&log.section_ids))
    .execute(executor)
    .await
    .map_err(|e| StorageError::Connection(e.to_string()))?;
    Ok(())
}

#[async_trait::async_trait]
impl ReadingLogRepository for SqliteRepository {
    async fn upsert_log(&self, log: &DayReadingLog) -> Result<(), StorageError> {
        insert_log(&self.pool, log).await
    }

    async fn replace_logs(&self, logs: &[DayReadingLog]) -> Result<(), StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        sqlx::query("DELETE FROM reading_logs")
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        for log in logs {
            insert_log(&mut *tx, log).await?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(())
    }

    async fn list_logs(&self) -> Result<Vec<DayReadingLog>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {LOG_COLUMNS} FROM reading_logs ORDER BY date ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_log_row(&row)?);
        }
        Ok(out)
    }

    async fn get_log(&self, date: NaiveDate) -> Result<Option<DayReadingLog>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {LOG_COLUMNS} FROM reading_logs WHERE date = ?1"
        ))
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_log_row).transpose()
    }
}
