use std::fmt;

use chrono::{DateTime, Duration, Utc};
use plan_core::calendar::add_days;
use plan_core::model::{DayReadingLog, LogSet, ReadingMode, ReadingSettings, SectionId};
use plan_core::stats::compute_stats;
use storage::repository::{
    ReadingLogRepository, SettingsRepository, StatsCacheRepository, Storage,
};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    days: u32,
    weekly_target: u8,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDays { raw: String },
    InvalidTarget { raw: String },
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDays { raw } => write!(f, "invalid --days value: {raw}"),
            ArgsError::InvalidTarget { raw } => write!(f, "invalid --weekly-target value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("PLAN_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());
        let mut days = std::env::var("PLAN_SEED_DAYS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(14);
        let mut weekly_target = std::env::var("PLAN_WEEKLY_TARGET")
            .ok()
            .and_then(|value| value.parse::<u8>().ok())
            .unwrap_or(7);
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--days" => {
                    let value = require_value(&mut args, "--days")?;
                    days = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidDays { raw: value.clone() })?;
                }
                "--weekly-target" => {
                    let value = require_value(&mut args, "--weekly-target")?;
                    weekly_target = value
                        .parse::<u8>()
                        .map_err(|_| ArgsError::InvalidTarget { raw: value.clone() })?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            days,
            weekly_target,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:dev.sqlite3)");
    eprintln!("  --days <n>                Days of history to seed (default: 14)");
    eprintln!("  --weekly-target <n>       Weekly reading target, 1-7 (default: 7)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  PLAN_DB_URL, PLAN_SEED_DAYS, PLAN_WEEKLY_TARGET");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);
    let today = now.date_naive();

    let settings = ReadingSettings::new(
        args.weekly_target,
        Some(add_days(today, -i64::from(args.days))),
    );
    storage.settings.save_settings(&settings).await?;

    // Backfill completions at the weekly cadence, most recent day first, with
    // every third entry skipped so streak and missed-day views have texture.
    let mut logs = Vec::new();
    for i in 0..args.days {
        if i % 3 == 2 {
            continue;
        }
        let date = add_days(today, -i64::from(i));
        let completed_at = now - Duration::days(i64::from(i));
        logs.push(DayReadingLog::completed(
            date,
            ReadingMode::Scheduled,
            10,
            completed_at,
            vec![SectionId::new(1)],
        ));
    }
    storage.logs.replace_logs(&logs).await?;

    let stats = compute_stats(&LogSet::from_logs(logs.clone()), today);
    storage.stats_cache.save_stats(&stats).await?;

    println!(
        "Seeded {} reading logs (target {}/week) into {}; cached stats: {} points, streak {}",
        logs.len(),
        settings.weekly_target(),
        args.db_url,
        stats.total_points,
        stats.current_streak_days
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
