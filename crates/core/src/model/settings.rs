use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Lowest weekly target a plan can have.
pub const MIN_WEEKLY_TARGET: u8 = 1;
/// Highest weekly target a plan can have (one reading per day).
pub const MAX_WEEKLY_TARGET: u8 = 7;

/// Per-user reading plan configuration.
///
/// The weekly target is clamped to `[1, 7]` at construction so downstream
/// arithmetic never has to re-validate it. `plan_start` bounds obligations:
/// days before it never count as missed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ReadingSettingsWire")]
pub struct ReadingSettings {
    weekly_target: u8,
    plan_start: Option<NaiveDate>,
}

/// Raw wire/storage shape; deserialization funnels through it so the clamp
/// holds even for out-of-range stored values.
#[derive(Deserialize)]
struct ReadingSettingsWire {
    weekly_target: u8,
    plan_start: Option<NaiveDate>,
}

impl From<ReadingSettingsWire> for ReadingSettings {
    fn from(wire: ReadingSettingsWire) -> Self {
        Self::new(wire.weekly_target, wire.plan_start)
    }
}

impl ReadingSettings {
    /// Creates settings with the weekly target clamped to `[1, 7]`.
    #[must_use]
    pub fn new(weekly_target: u8, plan_start: Option<NaiveDate>) -> Self {
        Self {
            weekly_target: weekly_target.clamp(MIN_WEEKLY_TARGET, MAX_WEEKLY_TARGET),
            plan_start,
        }
    }

    /// Daily-reading defaults: seven readings a week, no start bound.
    #[must_use]
    pub fn daily() -> Self {
        Self::new(MAX_WEEKLY_TARGET, None)
    }

    #[must_use]
    pub fn weekly_target(&self) -> u8 {
        self.weekly_target
    }

    #[must_use]
    pub fn plan_start(&self) -> Option<NaiveDate> {
        self.plan_start
    }

    /// Returns a copy with a different weekly target (clamped).
    #[must_use]
    pub fn with_weekly_target(self, weekly_target: u8) -> Self {
        Self::new(weekly_target, self.plan_start)
    }

    /// Returns a copy with a different plan start.
    #[must_use]
    pub fn with_plan_start(self, plan_start: Option<NaiveDate>) -> Self {
        Self {
            plan_start,
            ..self
        }
    }
}

impl Default for ReadingSettings {
    fn default() -> Self {
        Self::daily()
    }
}
