//! Merge policies for datasets that keep history across runs.

use std::{
    collections::{BTreeMap, HashSet},
    hash::Hash,
};

use crate::{
    records::{CommitEntry, DailyCount, Release},
    util::{date_key, parse_timestamp},
};

/// Watchers: stored entries for `today` are incomplete and always discarded.
/// The rest is keyed by day; a fresh entry overwrites a stored one.
pub fn merge_watchers(
    stored: Vec<DailyCount>,
    fresh: Vec<DailyCount>,
    today: &str,
) -> Vec<DailyCount> {
    let mut by_day = BTreeMap::<String, DailyCount>::new();
    for entry in stored.into_iter().filter(|entry| date_key(&entry.date) != today).chain(fresh) {
        by_day.insert(date_key(&entry.date).to_string(), entry);
    }
    by_day.into_values().collect()
}

pub struct TrafficMerge {
    pub list: Vec<DailyCount>,
    /// The most recent stored entry, discarded before merging.
    pub dropped: Option<DailyCount>,
}

impl TrafficMerge {
    /// Whether the dropped entry's day was absent from the fresh window, i.e.
    /// a stored count was lost rather than superseded.
    pub fn dropped_uncovered(&self) -> Option<&DailyCount> {
        let dropped = self.dropped.as_ref()?;
        let key = date_key(&dropped.date);
        (!self.list.iter().any(|entry| date_key(&entry.date) == key)).then_some(dropped)
    }
}

/// Clones and views: the last stored day may still have been counting when it
/// was saved, so it is always discarded. Remaining entries are keyed by day;
/// a fresh entry overwrites a stored one for the same day.
pub fn merge_traffic(mut stored: Vec<DailyCount>, mut fresh: Vec<DailyCount>) -> TrafficMerge {
    stored.sort_by(|a, b| compare_dates(&a.date, &b.date));
    fresh.sort_by(|a, b| compare_dates(&a.date, &b.date));
    let dropped = stored.pop();
    let mut by_day = BTreeMap::<String, DailyCount>::new();
    for entry in stored.into_iter().chain(fresh) {
        by_day.insert(date_key(&entry.date).to_string(), entry);
    }
    TrafficMerge { list: by_day.into_values().collect(), dropped }
}

/// Releases: like watchers, then keyed by release id so the full release
/// listing returned on every run does not accumulate duplicates.
pub fn merge_releases(stored: Vec<Release>, fresh: Vec<Release>, today: &str) -> Vec<Release> {
    let fresh_ids: HashSet<u64> = fresh.iter().map(|release| release.id).collect();
    let mut list: Vec<Release> = stored
        .into_iter()
        .filter(|release| date_key(&release.date) != today && !fresh_ids.contains(&release.id))
        .collect();
    list.extend(fresh);
    list
}

/// Concatenate and drop exact duplicates, keeping the first occurrence.
pub fn merge_events<T>(stored: Vec<T>, fresh: Vec<T>) -> Vec<T>
where T: Clone + Eq + Hash {
    let mut seen = HashSet::with_capacity(stored.len() + fresh.len());
    stored.into_iter().chain(fresh).filter(|event| seen.insert(event.clone())).collect()
}

/// Most recent commit by date. Ties resolve to the earliest entry in the list.
pub fn latest_commit(commits: &[CommitEntry]) -> Option<&CommitEntry> {
    commits.iter().reduce(|latest, commit| {
        if compare_dates(&commit.date, &latest.date).is_gt() { commit } else { latest }
    })
}

fn compare_dates(a: &str, b: &str) -> std::cmp::Ordering {
    match (parse_timestamp(a), parse_timestamp(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}
