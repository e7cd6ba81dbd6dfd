use plan_core::model::{DayReadingLog, ReadingMode, SectionId};
use sqlx::Row;

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn parse_mode(s: &str) -> Result<ReadingMode, StorageError> {
    ReadingMode::parse(s).map_err(ser)
}

/// Section ids are stored as comma-separated decimals (informational data,
/// not worth a join table).
pub(crate) fn encode_section_ids(ids: &[SectionId]) -> String {
    ids.iter()
        .map(|id| id.value().to_string())
        .collect::<Vec<_>>()
        .join(",")
}

pub(crate) fn decode_section_ids(s: &str) -> Result<Vec<SectionId>, StorageError> {
    if s.is_empty() {
        return Ok(Vec::new());
    }
    s.split(',')
        .map(|part| {
            part.parse::<u32>()
                .map(SectionId::new)
                .map_err(|_| StorageError::Serialization(format!("invalid section id: {part}")))
        })
        .collect()
}

pub(crate) fn map_log_row(row: &sqlx::sqlite::SqliteRow) -> Result<DayReadingLog, StorageError> {
    let mode_str: String = row.try_get("mode").map_err(ser)?;
    let completed_i64: i64 = row.try_get("completed").map_err(ser)?;
    let points_i64: i64 = row.try_get("points_earned").map_err(ser)?;
    let points_earned = u32::try_from(points_i64)
        .map_err(|_| StorageError::Serialization(format!("invalid points_earned: {points_i64}")))?;
    let sections: String = row.try_get("section_ids").map_err(ser)?;

    Ok(DayReadingLog {
        date: row.try_get("date").map_err(ser)?,
        mode: parse_mode(&mode_str)?,
        completed: completed_i64 != 0,
        points_earned,
        completed_at: row.try_get("completed_at").map_err(ser)?,
        section_ids: decode_section_ids(&sections)?,
    })
}
