use cadence_core::config::EngineConfig;
use cadence_core::error::RecurrenceError;
use cadence_core::merge::{EntryCache, MergeOptions, OccurrenceMerger};
use cadence_core::models::*;
use cadence_core::recurrence::RecurrenceManager;
use cadence_core::rule::{Frequency, RecurrenceRule, RuleUntil, WeekdayNum};
use chrono::{Datelike, Duration, NaiveDate, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use rstest::rstest;

/// Helper function to build a manager that cross-checks the fast path
fn setup_manager() -> RecurrenceManager {
    RecurrenceManager::new(EngineConfig {
        default_timezone: "UTC".to_string(),
        verify_fast_path: true,
        generic_limit: u16::MAX,
    })
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn utc_window(start: NaiveDate, stop: NaiveDate) -> QueryWindow {
    QueryWindow::dates(Tz::UTC, start, stop).unwrap()
}

#[test]
fn test_daily_start_inclusive_stop_exclusive() {
    let manager = setup_manager();
    let entry = RecurringEntry::new(date(2000, 1, 1), "FREQ=DAILY".parse().unwrap());

    let result = manager
        .occurrences_in_range(&entry, &utc_window(date(2000, 1, 1), date(2000, 1, 2)))
        .unwrap();

    assert_eq!(result, vec![Instant::Date(date(2000, 1, 1))]);
}

#[test]
fn test_weekly_with_one_excluded_monday() {
    let manager = setup_manager();
    // 2024-01-01 is a Monday
    let entry = RecurringEntry::new(date(2024, 1, 1), "FREQ=WEEKLY".parse().unwrap())
        .with_exdates(vec![Instant::Date(date(2024, 1, 8))]);

    let result = manager
        .occurrences_in_range(&entry, &utc_window(date(2024, 1, 1), date(2024, 1, 22)))
        .unwrap();

    assert_eq!(result.len(), 2);
    assert_eq!(
        result,
        vec![Instant::Date(date(2024, 1, 1)), Instant::Date(date(2024, 1, 15))]
    );
}

#[rstest]
#[case(1942, date(1942, 11, 26))]
#[case(2000, date(2000, 11, 23))]
#[case(2024, date(2024, 11, 28))]
fn test_fourth_thursday_of_november(#[case] year: i32, #[case] expected: NaiveDate) {
    let manager = setup_manager();
    let entry = RecurringEntry::new(
        date(1942, 11, 26),
        RecurrenceRule::new(Frequency::Yearly)
            .by_month(vec![11])
            .by_day(vec![WeekdayNum::nth(4, Weekday::Thu)]),
    );

    let result = manager
        .occurrences_in_range(&entry, &utc_window(date(year, 1, 1), date(year + 1, 1, 1)))
        .unwrap();

    assert_eq!(result, vec![Instant::Date(expected)]);
}

#[test]
fn test_monthly_count_seven() {
    let manager = setup_manager();
    let entry = RecurringEntry::new(date(2018, 9, 8), "FREQ=MONTHLY;COUNT=7".parse().unwrap());

    let result = manager
        .occurrences_in_range(&entry, &QueryWindow::unbounded(Tz::UTC))
        .unwrap();

    assert_eq!(result.len(), 7);
    let last = result.last().unwrap().date();
    assert_eq!((last.year(), last.month()), (2019, 3));
}

#[rstest]
#[case(date(2021, 3, 28), 23)]
#[case(date(2021, 10, 31), 25)]
#[case(date(2021, 6, 1), 24)]
fn test_hourly_across_dst(#[case] day: NaiveDate, #[case] expected: usize) {
    let manager = setup_manager();
    let tz = chrono_tz::Europe::London;
    let start = tz.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
    let entry = RecurringEntry::new(start, "FREQ=HOURLY".parse().unwrap());
    let window = QueryWindow::dates(tz, day, day.succ_opt().unwrap()).unwrap();

    let result = manager.occurrences_in_range(&entry, &window).unwrap();

    assert_eq!(result.len(), expected);
}

#[test]
fn test_timed_daily_keeps_local_time_across_dst() {
    let manager = setup_manager();
    let tz = chrono_tz::America::New_York;
    let start = tz.with_ymd_and_hms(2024, 3, 8, 7, 30, 0).unwrap();
    let entry = RecurringEntry::new(start, "FREQ=DAILY;COUNT=4".parse().unwrap());

    let result = manager
        .occurrences_in_range(&entry, &QueryWindow::unbounded(tz))
        .unwrap();

    let utc_hours: Vec<u32> = result
        .iter()
        .map(|instant| instant.sort_key(&tz).hour())
        .collect();
    // EST until 2024-03-10, EDT afterwards
    assert_eq!(utc_hours, vec![12, 12, 11, 11]);
}

#[test]
fn test_until_is_inclusive() {
    let manager = setup_manager();
    let entry = RecurringEntry::new(
        date(2024, 1, 1),
        RecurrenceRule::new(Frequency::Weekly).until(RuleUntil::Date(date(2024, 1, 15))),
    );

    let result = manager
        .occurrences_in_range(&entry, &QueryWindow::unbounded(Tz::UTC))
        .unwrap();

    assert_eq!(result.len(), 3);
    assert_eq!(result.last(), Some(&Instant::Date(date(2024, 1, 15))));
}

#[test]
fn test_output_strictly_increasing_and_unique() {
    let manager = setup_manager();
    let entries = [
        RecurringEntry::new(date(2023, 5, 2), "FREQ=WEEKLY;BYDAY=TU,TH,SA".parse().unwrap()),
        RecurringEntry::new(date(2023, 5, 31), "FREQ=MONTHLY;BYDAY=-1WE".parse().unwrap()),
        RecurringEntry::new(date(2023, 5, 29), "FREQ=MONTHLY;BYMONTHDAY=29".parse().unwrap()),
    ];
    let window = utc_window(date(2023, 1, 1), date(2025, 1, 1));

    for entry in &entries {
        let keys: Vec<_> = manager
            .occurrences_in_range(entry, &window)
            .unwrap()
            .iter()
            .map(|instant| instant.sort_key(&Tz::UTC))
            .collect();
        assert!(!keys.is_empty());
        assert!(keys.windows(2).all(|pair| pair[0] < pair[1]));
    }
}

#[test]
fn test_caller_errors_reach_caller() {
    let manager = setup_manager();
    let unbounded = RecurringEntry::new(date(2024, 1, 1), "FREQ=DAILY".parse().unwrap());

    let result = manager.occurrences_in_range(&unbounded, &QueryWindow::unbounded(Tz::UTC));
    assert!(matches!(result, Err(RecurrenceError::CallerContractViolation(_))));

    let fallback = RecurringEntry::new(date(2024, 1, 31), "FREQ=MONTHLY".parse().unwrap());
    let result = manager.occurrences_in_range(&fallback, &QueryWindow::unbounded(Tz::UTC));
    assert!(matches!(result, Err(RecurrenceError::CallerContractViolation(_))));
}

#[test]
fn test_end_to_end_display_list() {
    let manager = setup_manager();
    let merger = OccurrenceMerger::new(manager.clone());
    let tz = chrono_tz::Europe::Paris;
    let mut cache = EntryCache::new();

    let standup = RecurringEntry::new(
        tz.with_ymd_and_hms(2024, 4, 1, 9, 30, 0).unwrap(),
        "FREQ=WEEKLY;BYDAY=MO,WE,FR".parse().unwrap(),
    )
    .with_duration(Duration::minutes(15));
    let rent = RecurringEntry::new(date(2024, 1, 1), "FREQ=MONTHLY".parse().unwrap());
    let dentist = SingleEntry::new(tz.with_ymd_and_hms(2024, 4, 3, 14, 0, 0).unwrap());
    let holiday = SingleEntry::new(date(2024, 4, 1));

    cache.insert_recurring(standup.clone());
    cache.insert_recurring(rent.clone());
    cache.insert_single(dentist.clone());
    cache.insert_single(holiday.clone());

    let window = QueryWindow::dates(tz, date(2024, 4, 1), date(2024, 4, 6)).unwrap();
    let snapshot = cache.snapshot(tz);
    let list = merger.occurrence_list_from(&snapshot, &window, MergeOptions::default()).unwrap();

    let ids: Vec<_> = list.iter().map(|occurrence| occurrence.entry_id).collect();
    assert_eq!(
        ids,
        vec![holiday.id, rent.id, standup.id, standup.id, dentist.id, standup.id]
    );

    let first_standup = list.iter().find(|occurrence| occurrence.entry_id == standup.id).unwrap();
    assert_eq!(
        standup.occurrence_end(&first_standup.at),
        Some(Instant::Timed(tz.with_ymd_and_hms(2024, 4, 1, 9, 45, 0).unwrap()))
    );

    let mut resorted = list.clone();
    resorted.sort_by_key(|occurrence| occurrence.at.sort_key(&tz));
    assert_eq!(list, resorted);
}

#[test]
fn test_window_helper_uses_config_zone() {
    let manager = RecurrenceManager::new(EngineConfig {
        default_timezone: "Australia/Sydney".to_string(),
        verify_fast_path: false,
        generic_limit: u16::MAX,
    });
    let window = manager.window_for_dates(date(2024, 7, 1), date(2024, 7, 2)).unwrap();
    assert_eq!(
        window.start_utc(),
        Some(Utc.with_ymd_and_hms(2024, 6, 30, 14, 0, 0).unwrap())
    );
}

#[test]
fn test_ongoing_entries_at_start_of_day() {
    let manager = setup_manager();
    let merger = OccurrenceMerger::new(manager);
    let tz = chrono_tz::America::New_York;
    let mut cache = EntryCache::new();

    let conference = SingleEntry::new(date(2024, 5, 13)).with_duration(Duration::days(3));
    let red_eye = SingleEntry::new(tz.with_ymd_and_hms(2024, 5, 13, 23, 15, 0).unwrap())
        .with_duration(Duration::hours(5));
    let on_call = RecurringEntry::new(
        tz.with_ymd_and_hms(2024, 5, 6, 18, 0, 0).unwrap(),
        "FREQ=WEEKLY;BYDAY=MO,WE".parse().unwrap(),
    )
    .with_duration(Duration::hours(14));
    cache.insert_single(conference.clone());
    cache.insert_single(red_eye.clone());
    cache.insert_single(SingleEntry::new(date(2024, 5, 14)));
    cache.insert_recurring(on_call.clone());

    let snapshot = cache.snapshot(tz);
    let ongoing = merger.ongoing_list_from(&snapshot, date(2024, 5, 14), MergeOptions::default());
    let ids: Vec<_> = ongoing.iter().map(|occurrence| occurrence.entry_id).collect();
    assert_eq!(ids, vec![conference.id, on_call.id, red_eye.id]);

    let singles_only = merger.ongoing_list_from(&snapshot, date(2024, 5, 14), MergeOptions::singles_only());
    assert_eq!(singles_only.len(), 2);
}
