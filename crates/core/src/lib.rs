#![forbid(unsafe_code)]

pub mod calendar;
pub mod error;
pub mod merge;
pub mod missed;
pub mod model;
pub mod rewards;
pub mod stats;
pub mod streak;
pub mod time;

pub use error::Error;
pub use time::Clock;
