use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Display-facing statistics derived from the canonical log set.
///
/// Never a source of truth: recomputed from the logs on every mutation and
/// cached only so the UI has something to show before the first hydrate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub total_points: u32,
    pub current_streak_days: u32,
    pub longest_streak_days: u32,
    pub total_readings: u32,
    pub weekly_points: u32,
    pub monthly_points: u32,
    pub last_completed_date: Option<NaiveDate>,
}
