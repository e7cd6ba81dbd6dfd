use chrono::Duration;
use plan_core::calendar::add_days;
use plan_core::model::{Bookmark, DayId, DayReadingLog, ReadingMode, ReadingSettings, SectionId, UserStats};
use plan_core::time::{fixed_now, fixed_today};
use storage::repository::{
    AppStateRepository, BookmarkRepository, ReadingLogRepository, SettingsRepository,
    StatsCacheRepository,
};
use storage::sqlite::SqliteRepository;

fn build_log(offset: i64, points: u32) -> DayReadingLog {
    DayReadingLog::completed(
        add_days(fixed_today(), offset),
        ReadingMode::Scheduled,
        points,
        fixed_now() + Duration::days(offset),
        vec![SectionId::new(1), SectionId::new(2)],
    )
}

#[tokio::test]
async fn sqlite_roundtrip_persists_reading_logs() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_logs?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let yesterday = build_log(-1, 10);
    let today = build_log(0, 30);
    repo.upsert_log(&yesterday).await.unwrap();
    repo.upsert_log(&today).await.unwrap();

    let logs = repo.list_logs().await.expect("list");
    assert_eq!(logs, vec![yesterday.clone(), today.clone()]);

    let fetched = repo.get_log(yesterday.date).await.unwrap();
    assert_eq!(fetched, Some(yesterday.clone()));
    assert_eq!(fetched.unwrap().section_ids, vec![SectionId::new(1), SectionId::new(2)]);

    // Upserting the same date replaces, never duplicates.
    let mut makeup = yesterday.clone();
    makeup.mode = ReadingMode::Makeup;
    makeup.points_earned = 5;
    repo.upsert_log(&makeup).await.unwrap();
    let logs = repo.list_logs().await.unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].mode, ReadingMode::Makeup);

    // Post-merge rewrite replaces the whole set transactionally.
    let replacement = build_log(-3, 15);
    repo.replace_logs(std::slice::from_ref(&replacement)).await.unwrap();
    assert_eq!(repo.list_logs().await.unwrap(), vec![replacement]);
}

#[tokio::test]
async fn sqlite_persists_uncompleted_entries_too() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_uncompleted?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let draft = DayReadingLog {
        date: fixed_today(),
        mode: ReadingMode::Scheduled,
        completed: false,
        points_earned: 0,
        completed_at: None,
        section_ids: Vec::new(),
    };
    repo.upsert_log(&draft).await.unwrap();

    let fetched = repo.get_log(fixed_today()).await.unwrap().unwrap();
    assert!(!fetched.completed);
    assert!(fetched.completed_at.is_none());
    assert!(fetched.section_ids.is_empty());
}

#[tokio::test]
async fn sqlite_bookmark_settings_and_stats_round_trip() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_state?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    assert!(repo.get_bookmark().await.unwrap().is_none());
    let bookmark = Bookmark {
        date: fixed_today(),
        day_id: DayId::new(12),
        scroll_offset: 0.75,
    };
    repo.save_bookmark(&bookmark).await.unwrap();
    assert_eq!(repo.get_bookmark().await.unwrap(), Some(bookmark));
    repo.clear_bookmark().await.unwrap();
    assert!(repo.get_bookmark().await.unwrap().is_none());

    assert!(repo.get_settings().await.unwrap().is_none());
    let settings = ReadingSettings::new(3, Some(add_days(fixed_today(), -30)));
    repo.save_settings(&settings).await.unwrap();
    assert_eq!(repo.get_settings().await.unwrap(), Some(settings));

    let stats = UserStats {
        total_points: 120,
        current_streak_days: 4,
        longest_streak_days: 9,
        total_readings: 11,
        weekly_points: 40,
        monthly_points: 90,
        last_completed_date: Some(fixed_today()),
    };
    repo.save_stats(&stats).await.unwrap();
    assert_eq!(repo.get_stats().await.unwrap(), Some(stats.clone()));

    // Second save overwrites the singleton row.
    let newer = UserStats {
        total_points: 150,
        ..stats
    };
    repo.save_stats(&newer).await.unwrap();
    assert_eq!(repo.get_stats().await.unwrap(), Some(newer));
}

#[tokio::test]
async fn sqlite_app_state_stores_opaque_records() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_appstate?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    assert!(repo.get("content_version").await.unwrap().is_none());
    repo.put("content_version", "plan-2024").await.unwrap();
    repo.put("profile", r#"{"display_name":"Reader"}"#).await.unwrap();

    assert_eq!(
        repo.get("content_version").await.unwrap().as_deref(),
        Some("plan-2024")
    );

    repo.put("content_version", "plan-2025").await.unwrap();
    assert_eq!(
        repo.get("content_version").await.unwrap().as_deref(),
        Some("plan-2025")
    );
}
