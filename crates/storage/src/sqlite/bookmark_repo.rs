use async_trait::async_trait;
use sqlx::Row;

use plan_core::model::{Bookmark, DayId};

use super::SqliteRepository;
use crate::repository::{BookmarkRepository, StorageError};

#[async_trait]
impl BookmarkRepository for SqliteRepository {
    async fn save_bookmark(&self, bookmark: &Bookmark) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO bookmarks (id, date, day_id, scroll_offset)
            VALUES (1, ?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                date = excluded.date,
                day_id = excluded.day_id,
                scroll_offset = excluded.scroll_offset
            ",
        )
        .bind(bookmark.date)
        .bind(i64::from(bookmark.day_id.value()))
        .bind(bookmark.scroll_offset)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(())
    }

    async fn get_bookmark(&self) -> Result<Option<Bookmark>, StorageError> {
        let row = sqlx::query("SELECT date, day_id, scroll_offset FROM bookmarks WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let day_id_i64: i64 = row
            .try_get("day_id")
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let day_id = u32::try_from(day_id_i64)
            .map_err(|_| StorageError::Serialization(format!("invalid day_id: {day_id_i64}")))?;

        Ok(Some(Bookmark {
            date: row
                .try_get("date")
                .map_err(|e| StorageError::Serialization(e.to_string()))?,
            day_id: DayId::new(day_id),
            scroll_offset: row
                .try_get("scroll_offset")
                .map_err(|e| StorageError::Serialization(e.to_string()))?,
        }))
    }

    async fn clear_bookmark(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM bookmarks WHERE id = 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(())
    }
}
