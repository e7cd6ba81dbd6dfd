use thiserror::Error;

use crate::calendar::CalendarError;
use crate::model::ModeError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Calendar(#[from] CalendarError),
    #[error(transparent)]
    Mode(#[from] ModeError),
}
