use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};

/// Consecutive-day streak ending at `today`. A streak survives the current
/// day not being journaled yet: the anchor is today when present, otherwise
/// yesterday. Any older gap means the streak is already broken and the
/// result is 0. Duplicate dates collapse before counting.
///
/// `today` is a parameter rather than the wall clock so callers and tests
/// control the reference day.
pub fn current_streak(dates: &[NaiveDate], today: NaiveDate) -> u32 {
    let set: BTreeSet<NaiveDate> = dates.iter().copied().collect();
    if set.is_empty() {
        return 0;
    }

    let anchor = if set.contains(&today) {
        today
    } else {
        match today.pred_opt() {
            Some(yesterday) if set.contains(&yesterday) => yesterday,
            _ => return 0,
        }
    };

    let mut streak = 0;
    let mut cursor = Some(anchor);
    while let Some(day) = cursor {
        if !set.contains(&day) {
            break;
        }
        streak += 1;
        cursor = day.pred_opt();
    }
    streak
}

/// Longest run of consecutive calendar days anywhere in the history.
/// Empty input yields 0, a single date yields 1.
pub fn longest_streak(dates: &[NaiveDate]) -> u32 {
    let set: BTreeSet<NaiveDate> = dates.iter().copied().collect();

    let mut longest = 0;
    let mut run = 0;
    let mut prev: Option<NaiveDate> = None;
    for date in set {
        run = match prev {
            Some(p) if p.succ_opt() == Some(date) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        prev = Some(date);
    }
    longest
}

/// Entry counts per `YYYY-MM` month, duplicates collapsed.
pub fn monthly_counts(dates: &[NaiveDate]) -> BTreeMap<String, u32> {
    let set: BTreeSet<NaiveDate> = dates.iter().copied().collect();

    let mut counts = BTreeMap::new();
    for date in set {
        *counts
            .entry(format!("{:04}-{:02}", date.year(), date.month()))
            .or_insert(0) += 1;
    }
    counts
}

/// How many distinct days in `today`'s month have an entry.
pub fn entries_in_month(dates: &[NaiveDate], today: NaiveDate) -> u32 {
    let set: BTreeSet<NaiveDate> = dates.iter().copied().collect();
    set.iter()
        .filter(|d| d.year() == today.year() && d.month() == today.month())
        .count() as u32
}
