//! Merging recurring occurrences into the sorted list of single entries.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::RecurrenceError;
use crate::models::{Instant, Occurrence, QueryWindow, RecurringEntry, SingleEntry};
use crate::recurrence::RecurrenceManager;
use crate::timezone::local_midnight;

/// Entries held for display, owned by the storage layer.
///
/// Single entries are kept sorted lazily: inserts mark the list dirty and the
/// next [`snapshot`](EntryCache::snapshot) re-sorts it for the requested zone.
/// Single entries that run past local midnight are tracked in a second sorted
/// list for [`OccurrenceMerger::ongoing_list_from`].
#[derive(Debug, Clone, Default)]
pub struct EntryCache {
    singles: Vec<SingleEntry>,
    crossovers: Vec<SingleEntry>,
    recurring: Vec<RecurringEntry>,
    sorted_for: Option<Tz>,
}

impl EntryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_single(&mut self, entry: SingleEntry) {
        self.singles.push(entry);
        self.sorted_for = None;
    }

    pub fn insert_recurring(&mut self, entry: RecurringEntry) {
        self.recurring.push(entry);
    }

    /// Removes the entry with `id` from either list.
    pub fn remove(&mut self, id: Uuid) -> bool {
        let before = self.len();
        self.singles.retain(|entry| entry.id != id);
        self.crossovers.retain(|entry| entry.id != id);
        self.recurring.retain(|entry| entry.id != id);
        before != self.len()
    }

    /// Drops every cached entry after an edit in storage.
    pub fn invalidate(&mut self) {
        debug!(
            singles = self.singles.len(),
            crossovers = self.crossovers.len(),
            recurring = self.recurring.len(),
            "Invalidating entry cache"
        );
        self.singles.clear();
        self.crossovers.clear();
        self.recurring.clear();
        self.sorted_for = None;
    }

    pub fn len(&self) -> usize {
        self.singles.len() + self.recurring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.singles.is_empty() && self.recurring.is_empty()
    }

    /// Read-only view with single entries sorted for `zone`.
    pub fn snapshot(&mut self, zone: Tz) -> EntrySnapshot<'_> {
        if self.sorted_for != Some(zone) {
            self.singles.sort_by_key(|entry| entry.start.sort_key(&zone));
            self.crossovers = self
                .singles
                .iter()
                .filter(|entry| entry.crosses_midnight(&zone))
                .cloned()
                .collect();
            self.sorted_for = Some(zone);
        }
        EntrySnapshot {
            zone,
            singles: &self.singles,
            crossovers: &self.crossovers,
            recurring: &self.recurring,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EntrySnapshot<'a> {
    pub zone: Tz,
    pub singles: &'a [SingleEntry],
    /// Single entries that continue past the local day they start on
    pub crossovers: &'a [SingleEntry],
    pub recurring: &'a [RecurringEntry],
}

/// Which kinds of entries a list includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOptions {
    pub include_single: bool,
    pub include_repeated: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            include_single: true,
            include_repeated: true,
        }
    }
}

impl MergeOptions {
    pub fn singles_only() -> Self {
        Self {
            include_single: true,
            include_repeated: false,
        }
    }

    pub fn repeated_only() -> Self {
        Self {
            include_single: false,
            include_repeated: true,
        }
    }
}

/// Builds the display list for a window.
#[derive(Debug, Clone)]
pub struct OccurrenceMerger {
    manager: RecurrenceManager,
}

impl OccurrenceMerger {
    pub fn new(manager: RecurrenceManager) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &RecurrenceManager {
        &self.manager
    }

    /// Merges single entries and recurring occurrences inside `window`.
    ///
    /// # Arguments
    /// * `single_sorted` - Single entries sorted by start in the window's zone
    /// * `recurring` - Recurring entries in any order
    /// * `window` - Half-open query range
    ///
    /// # Returns
    /// * `Result<Vec<Occurrence>, RecurrenceError>` - Occurrences in non-decreasing order
    ///
    /// # Behavior
    /// - Binary search to the first single entry at or after the window start
    /// - Take single entries until the window stop
    /// - Insert each recurring entry's occurrences after any equal ones already present
    /// - Skip recurring entries that fail with a fatal error
    pub fn occurrence_list(
        &self,
        single_sorted: &[SingleEntry],
        recurring: &[RecurringEntry],
        window: &QueryWindow,
    ) -> Result<Vec<Occurrence>, RecurrenceError> {
        self.occurrence_list_with(single_sorted, recurring, window, MergeOptions::default())
    }

    /// [`occurrence_list`](Self::occurrence_list) restricted to the kinds in `options`.
    pub fn occurrence_list_with(
        &self,
        single_sorted: &[SingleEntry],
        recurring: &[RecurringEntry],
        window: &QueryWindow,
        options: MergeOptions,
    ) -> Result<Vec<Occurrence>, RecurrenceError> {
        window.validate()?;
        let zone = window.zone;
        let lower = window.start_utc();
        let upper = window.stop_utc();

        let mut merged: Vec<(DateTime<Utc>, Occurrence)> = Vec::new();
        if options.include_single {
            let first = lower.map_or(0, |lower| {
                single_sorted.partition_point(|entry| entry.start.sort_key(&zone) < lower)
            });
            merged = single_sorted[first..]
                .iter()
                .map(|entry| (entry.start.sort_key(&zone), single_occurrence(entry)))
                .take_while(|(key, _)| upper.map_or(true, |upper| *key < upper))
                .collect();
        }

        if options.include_repeated {
            for entry in recurring {
                if let Some(occurrences) = self.expand_or_skip(entry, window) {
                    merge_into(&mut merged, entry.id, occurrences, &zone);
                }
            }
        }

        Ok(merged.into_iter().map(|(_, occurrence)| occurrence).collect())
    }

    /// Same as [`occurrence_list_with`](Self::occurrence_list_with) over a cache snapshot.
    pub fn occurrence_list_from(
        &self,
        snapshot: &EntrySnapshot<'_>,
        window: &QueryWindow,
        options: MergeOptions,
    ) -> Result<Vec<Occurrence>, RecurrenceError> {
        if snapshot.zone != window.zone {
            let mut singles = snapshot.singles.to_vec();
            singles.sort_by_key(|entry| entry.start.sort_key(&window.zone));
            return self.occurrence_list_with(&singles, snapshot.recurring, window, options);
        }
        self.occurrence_list_with(snapshot.singles, snapshot.recurring, window, options)
    }

    /// Entries still in progress at the start of `day`.
    ///
    /// An entry is ongoing when it starts strictly before local midnight of
    /// `day` in `zone` and ends strictly after it. Each result carries the
    /// start of the occurrence in progress.
    ///
    /// # Arguments
    /// * `single_sorted` - Single entries sorted by start in `zone`
    /// * `recurring` - Recurring entries in any order
    ///
    /// # Behavior
    /// - Scan single entries until the first that starts at or after midnight
    /// - Query each recurring entry over a window reaching back one duration
    /// - Entries without a duration are never ongoing
    pub fn ongoing_list(
        &self,
        single_sorted: &[SingleEntry],
        recurring: &[RecurringEntry],
        day: NaiveDate,
        zone: Tz,
        options: MergeOptions,
    ) -> Vec<Occurrence> {
        let at = local_midnight(&zone, day);
        let key = at.with_timezone(&Utc);
        let is_ongoing = |end: Option<Instant>| end.is_some_and(|end| end.sort_key(&zone) > key);

        let mut ongoing: Vec<(DateTime<Utc>, Occurrence)> = Vec::new();
        if options.include_single {
            ongoing = single_sorted
                .iter()
                .map(|entry| (entry.start.sort_key(&zone), entry))
                .take_while(|(start, _)| *start < key)
                .filter(|(_, entry)| is_ongoing(entry.end()))
                .map(|(start, entry)| (start, single_occurrence(entry)))
                .collect();
        }

        if options.include_repeated {
            for entry in recurring {
                let Some(lookback) = entry.duration.and_then(lookback) else {
                    continue;
                };
                let Some(from) = at.checked_sub_signed(lookback) else {
                    continue;
                };
                let window = QueryWindow {
                    zone,
                    start: Some(from),
                    stop: Some(at),
                };
                if let Some(occurrences) = self.expand_or_skip(entry, &window) {
                    let occurrences = occurrences
                        .into_iter()
                        .filter(|occurrence| is_ongoing(entry.occurrence_end(occurrence)))
                        .collect();
                    merge_into(&mut ongoing, entry.id, occurrences, &zone);
                }
            }
        }

        ongoing.into_iter().map(|(_, occurrence)| occurrence).collect()
    }

    /// [`ongoing_list`](Self::ongoing_list) over a cache snapshot, scanning
    /// only the entries that cross midnight.
    pub fn ongoing_list_from(
        &self,
        snapshot: &EntrySnapshot<'_>,
        day: NaiveDate,
        options: MergeOptions,
    ) -> Vec<Occurrence> {
        self.ongoing_list(snapshot.crossovers, snapshot.recurring, day, snapshot.zone, options)
    }

    fn expand_or_skip(&self, entry: &RecurringEntry, window: &QueryWindow) -> Option<Vec<Instant>> {
        match self.manager.occurrences_in_range(entry, window) {
            Ok(occurrences) => Some(occurrences),
            Err(err) => {
                warn!(entry_id = %entry.id, error = %err, "Skipping entry that cannot be expanded");
                None
            }
        }
    }
}

fn single_occurrence(entry: &SingleEntry) -> Occurrence {
    Occurrence {
        entry_id: entry.id,
        at: entry.start,
    }
}

/// Inserts increasing `occurrences` after any equal keys already in `merged`.
fn merge_into(
    merged: &mut Vec<(DateTime<Utc>, Occurrence)>,
    entry_id: Uuid,
    occurrences: Vec<Instant>,
    zone: &Tz,
) {
    let mut position = 0;
    for at in occurrences {
        let key = at.sort_key(zone);
        while position < merged.len() && merged[position].0 <= key {
            position += 1;
        }
        merged.insert(position, (key, Occurrence { entry_id, at }));
        position += 1;
    }
}

/// How far back an occurrence can start and still be in progress.
///
/// Date durations are rounded up to whole days; two hours cover a DST shift.
fn lookback(duration: Duration) -> Option<Duration> {
    if duration <= Duration::zero() {
        return None;
    }
    let mut days = duration.num_days();
    if duration > Duration::try_days(days)? {
        days += 1;
    }
    Duration::try_days(days)?.checked_add(&Duration::hours(2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn merger() -> OccurrenceMerger {
        OccurrenceMerger::new(RecurrenceManager::new(EngineConfig {
            default_timezone: "UTC".to_string(),
            verify_fast_path: false,
            generic_limit: u16::MAX,
        }))
    }

    fn january() -> QueryWindow {
        QueryWindow::dates(Tz::UTC, date(2024, 1, 1), date(2024, 2, 1)).unwrap()
    }

    mod merge_tests {
        use super::*;

        #[test]
        fn test_singles_outside_window_are_dropped() {
            let singles = vec![
                SingleEntry::new(date(2023, 12, 31)),
                SingleEntry::new(date(2024, 1, 5)),
                SingleEntry::new(date(2024, 2, 1)),
            ];
            let result = merger().occurrence_list(&singles, &[], &january()).unwrap();
            assert_eq!(result.len(), 1);
            assert_eq!(result[0].entry_id, singles[1].id);
        }

        #[test]
        fn test_recurring_interleaves_with_singles() {
            let singles = vec![
                SingleEntry::new(date(2024, 1, 3)),
                SingleEntry::new(date(2024, 1, 10)),
            ];
            // Mondays: 1, 8, 15, 22, 29
            let weekly = RecurringEntry::new(date(2024, 1, 1), "FREQ=WEEKLY".parse().unwrap());
            let result = merger()
                .occurrence_list(&singles, std::slice::from_ref(&weekly), &january())
                .unwrap();
            let days: Vec<u32> = result
                .iter()
                .map(|occurrence| chrono::Datelike::day(&occurrence.at.date()))
                .collect();
            assert_eq!(days, vec![1, 3, 8, 10, 15, 22, 29]);
        }

        #[test]
        fn test_equal_instants_keep_insertion_order() {
            let single = SingleEntry::new(date(2024, 1, 8));
            let first = RecurringEntry::new(date(2024, 1, 1), "FREQ=WEEKLY".parse().unwrap());
            let second = RecurringEntry::new(date(2024, 1, 8), "FREQ=DAILY;COUNT=1".parse().unwrap());
            let result = merger()
                .occurrence_list(
                    std::slice::from_ref(&single),
                    &[first.clone(), second.clone()],
                    &january(),
                )
                .unwrap();
            let on_eighth: Vec<Uuid> = result
                .iter()
                .filter(|occurrence| occurrence.at == Instant::Date(date(2024, 1, 8)))
                .map(|occurrence| occurrence.entry_id)
                .collect();
            assert_eq!(on_eighth, vec![single.id, first.id, second.id]);
        }

        #[test]
        fn test_timed_and_date_entries_order_by_local_midnight() {
            let tz = chrono_tz::Europe::Berlin;
            let window = QueryWindow::dates(tz, date(2024, 1, 1), date(2024, 1, 3)).unwrap();
            let morning = SingleEntry::new(tz.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).unwrap());
            let day = RecurringEntry::new(date(2024, 1, 1), "FREQ=DAILY".parse().unwrap());
            let result = merger()
                .occurrence_list(std::slice::from_ref(&morning), std::slice::from_ref(&day), &window)
                .unwrap();
            let ids: Vec<Uuid> = result.iter().map(|occurrence| occurrence.entry_id).collect();
            assert_eq!(ids, vec![day.id, day.id, morning.id]);
        }

        #[test]
        fn test_resorting_result_changes_nothing() {
            let singles = vec![
                SingleEntry::new(date(2024, 1, 2)),
                SingleEntry::new(date(2024, 1, 9)),
                SingleEntry::new(date(2024, 1, 20)),
            ];
            let recurring = vec![
                RecurringEntry::new(date(2024, 1, 1), "FREQ=WEEKLY;BYDAY=MO,FR".parse().unwrap()),
                RecurringEntry::new(date(2023, 11, 9), "FREQ=MONTHLY;BYDAY=2TU".parse().unwrap()),
                RecurringEntry::new(date(2024, 1, 31), "FREQ=MONTHLY".parse().unwrap()),
            ];
            let result = merger().occurrence_list(&singles, &recurring, &january()).unwrap();
            let mut resorted = result.clone();
            resorted.sort_by_key(|occurrence| occurrence.at.sort_key(&Tz::UTC));
            assert_eq!(result, resorted);
        }

        #[test_log::test]
        fn test_fatal_entry_is_skipped() {
            let broken = RecurringEntry::new(date(2024, 1, 1), "FREQ=DAILY;INTERVAL=0".parse().unwrap());
            let fine = RecurringEntry::new(date(2024, 1, 1), "FREQ=WEEKLY".parse().unwrap());
            let result = merger().occurrence_list(&[], &[broken, fine.clone()], &january()).unwrap();
            assert_eq!(result.len(), 5);
            assert!(result.iter().all(|occurrence| occurrence.entry_id == fine.id));
        }

        #[test]
        fn test_inverted_window_fails() {
            let window = QueryWindow {
                zone: Tz::UTC,
                start: Some(Tz::UTC.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()),
                stop: Some(Tz::UTC.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            };
            assert!(merger().occurrence_list(&[], &[], &window).is_err());
        }
    }

    mod options_tests {
        use super::*;

        fn fixture() -> (Vec<SingleEntry>, Vec<RecurringEntry>) {
            let singles = vec![SingleEntry::new(date(2024, 1, 3))];
            let recurring = vec![RecurringEntry::new(date(2024, 1, 1), "FREQ=WEEKLY".parse().unwrap())];
            (singles, recurring)
        }

        #[test]
        fn test_singles_only() {
            let (singles, recurring) = fixture();
            let result = merger()
                .occurrence_list_with(&singles, &recurring, &january(), MergeOptions::singles_only())
                .unwrap();
            assert_eq!(result.len(), 1);
            assert_eq!(result[0].entry_id, singles[0].id);
        }

        #[test]
        fn test_repeated_only() {
            let (singles, recurring) = fixture();
            let result = merger()
                .occurrence_list_with(&singles, &recurring, &january(), MergeOptions::repeated_only())
                .unwrap();
            assert_eq!(result.len(), 5);
            assert!(result.iter().all(|occurrence| occurrence.entry_id == recurring[0].id));
        }

        #[test]
        fn test_default_includes_both() {
            let (singles, recurring) = fixture();
            let all = merger().occurrence_list(&singles, &recurring, &january()).unwrap();
            assert_eq!(all.len(), 6);
        }
    }

    mod ongoing_tests {
        use super::*;

        #[test]
        fn test_multi_day_single_is_ongoing() {
            let trip = SingleEntry::new(date(2024, 1, 5)).with_duration(Duration::days(3));
            let ongoing = merger().ongoing_list(
                std::slice::from_ref(&trip),
                &[],
                date(2024, 1, 7),
                Tz::UTC,
                MergeOptions::default(),
            );
            assert_eq!(
                ongoing,
                vec![Occurrence {
                    entry_id: trip.id,
                    at: Instant::Date(date(2024, 1, 5)),
                }]
            );
        }

        #[test]
        fn test_single_is_not_ongoing_on_its_first_or_end_day() {
            let trip = SingleEntry::new(date(2024, 1, 5)).with_duration(Duration::days(3));
            let singles = std::slice::from_ref(&trip);
            for day in [date(2024, 1, 5), date(2024, 1, 8)] {
                assert!(merger()
                    .ongoing_list(singles, &[], day, Tz::UTC, MergeOptions::default())
                    .is_empty());
            }
        }

        #[test]
        fn test_overnight_timed_single() {
            let tz = chrono_tz::Europe::Berlin;
            let party = SingleEntry::new(tz.with_ymd_and_hms(2024, 3, 1, 21, 0, 0).unwrap())
                .with_duration(Duration::hours(5));
            let ongoing = merger().ongoing_list(
                std::slice::from_ref(&party),
                &[],
                date(2024, 3, 2),
                tz,
                MergeOptions::default(),
            );
            assert_eq!(ongoing.len(), 1);
        }

        #[test]
        fn test_recurring_occurrence_in_progress() {
            let tz = chrono_tz::Europe::Berlin;
            // Night shift every Friday 22:00 for eight hours
            let shift = RecurringEntry::new(
                tz.with_ymd_and_hms(2024, 3, 1, 22, 0, 0).unwrap(),
                "FREQ=WEEKLY".parse().unwrap(),
            )
            .with_duration(Duration::hours(8));
            let on_saturday = merger().ongoing_list(
                &[],
                std::slice::from_ref(&shift),
                date(2024, 3, 9),
                tz,
                MergeOptions::default(),
            );
            assert_eq!(
                on_saturday,
                vec![Occurrence {
                    entry_id: shift.id,
                    at: Instant::Timed(tz.with_ymd_and_hms(2024, 3, 8, 22, 0, 0).unwrap()),
                }]
            );

            let on_sunday = merger().ongoing_list(
                &[],
                std::slice::from_ref(&shift),
                date(2024, 3, 10),
                tz,
                MergeOptions::default(),
            );
            assert!(on_sunday.is_empty());
        }

        #[test]
        fn test_recurring_without_duration_is_never_ongoing() {
            let weekly = RecurringEntry::new(date(2024, 1, 1), "FREQ=WEEKLY".parse().unwrap());
            assert!(merger()
                .ongoing_list(&[], &[weekly], date(2024, 1, 2), Tz::UTC, MergeOptions::default())
                .is_empty());
        }

        #[test]
        fn test_options_filter_ongoing() {
            let trip = SingleEntry::new(date(2024, 1, 5)).with_duration(Duration::days(3));
            let retreat = RecurringEntry::new(date(2024, 1, 5), "FREQ=MONTHLY".parse().unwrap())
                .with_duration(Duration::days(3));
            let singles = std::slice::from_ref(&trip);
            let recurring = std::slice::from_ref(&retreat);
            let day = date(2024, 1, 6);

            let both = merger().ongoing_list(singles, recurring, day, Tz::UTC, MergeOptions::default());
            let ids: Vec<Uuid> = both.iter().map(|occurrence| occurrence.entry_id).collect();
            assert_eq!(ids, vec![trip.id, retreat.id]);

            let only_single = merger().ongoing_list(singles, recurring, day, Tz::UTC, MergeOptions::singles_only());
            assert_eq!(only_single.len(), 1);
            assert_eq!(only_single[0].entry_id, trip.id);

            let only_repeated =
                merger().ongoing_list(singles, recurring, day, Tz::UTC, MergeOptions::repeated_only());
            assert_eq!(only_repeated.len(), 1);
            assert_eq!(only_repeated[0].entry_id, retreat.id);
        }
    }

    mod cache_tests {
        use super::*;

        #[test]
        fn test_snapshot_sorts_singles() {
            let mut cache = EntryCache::new();
            cache.insert_single(SingleEntry::new(date(2024, 1, 20)));
            cache.insert_single(SingleEntry::new(date(2024, 1, 2)));
            let snapshot = cache.snapshot(Tz::UTC);
            assert_eq!(snapshot.singles[0].start, Instant::Date(date(2024, 1, 2)));
            assert_eq!(snapshot.singles[1].start, Instant::Date(date(2024, 1, 20)));
        }

        #[test]
        fn test_remove_and_invalidate() {
            let mut cache = EntryCache::new();
            let single = SingleEntry::new(date(2024, 1, 2));
            let recurring = RecurringEntry::new(date(2024, 1, 1), "FREQ=DAILY".parse().unwrap());
            cache.insert_single(single.clone());
            cache.insert_recurring(recurring.clone());
            assert_eq!(cache.len(), 2);

            assert!(cache.remove(recurring.id));
            assert!(!cache.remove(recurring.id));
            assert_eq!(cache.len(), 1);

            cache.invalidate();
            assert!(cache.is_empty());
        }

        #[test]
        fn test_snapshot_tracks_crossovers() {
            let mut cache = EntryCache::new();
            let trip = SingleEntry::new(date(2024, 1, 5)).with_duration(Duration::days(3));
            let lunch = SingleEntry::new(Tz::UTC.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap())
                .with_duration(Duration::hours(1));
            let late = SingleEntry::new(Tz::UTC.with_ymd_and_hms(2024, 1, 1, 23, 0, 0).unwrap())
                .with_duration(Duration::hours(2));
            cache.insert_single(trip.clone());
            cache.insert_single(lunch);
            cache.insert_single(late.clone());

            let snapshot = cache.snapshot(Tz::UTC);
            let ids: Vec<Uuid> = snapshot.crossovers.iter().map(|entry| entry.id).collect();
            assert_eq!(ids, vec![late.id, trip.id]);

            assert!(cache.remove(late.id));
            let snapshot = cache.snapshot(Tz::UTC);
            assert_eq!(snapshot.crossovers.len(), 1);
        }

        #[test]
        fn test_ongoing_from_snapshot() {
            let mut cache = EntryCache::new();
            let trip = SingleEntry::new(date(2024, 1, 5)).with_duration(Duration::days(3));
            cache.insert_single(SingleEntry::new(date(2024, 1, 4)));
            cache.insert_single(trip.clone());
            let snapshot = cache.snapshot(Tz::UTC);
            let ongoing = merger().ongoing_list_from(&snapshot, date(2024, 1, 7), MergeOptions::default());
            assert_eq!(ongoing.len(), 1);
            assert_eq!(ongoing[0].entry_id, trip.id);
        }

        #[test]
        fn test_merge_from_snapshot() {
            let mut cache = EntryCache::new();
            cache.insert_single(SingleEntry::new(date(2024, 1, 4)));
            cache.insert_recurring(RecurringEntry::new(date(2024, 1, 1), "FREQ=WEEKLY".parse().unwrap()));
            let snapshot = cache.snapshot(Tz::UTC);
            let result = merger().occurrence_list_from(&snapshot, &january(), MergeOptions::default()).unwrap();
            assert_eq!(result.len(), 6);
        }
    }
}
