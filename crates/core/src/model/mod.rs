mod ids;
mod log;
mod session;
mod settings;
mod stats;

pub use ids::{DayId, SectionId, UserId};
pub use log::{DayReadingLog, LogSet, ModeError, ReadingMode};
pub use session::{Bookmark, ReadingSession};
pub use settings::ReadingSettings;
pub use stats::UserStats;
