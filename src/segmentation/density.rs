//! Density-window segmentation for the RiO and SystmOne export formats.
//!
//! Admissions in these exports show up as bursts of note activity: ward
//! staff write several notes a day, community teams a few a month. For each
//! distinct note date we count notes in a forward-looking window and run a
//! two-threshold state machine over the counts.

use chrono::{Days, NaiveDate};
use tracing::debug;

/// Count below which an open admission closes. Shared by both formats.
const END_THRESHOLD: usize = 10;

/// Per-format density parameters. The start comparison is deliberately
/// asymmetric between formats (`>` for RiO, `>=` for SystmOne) and must not
/// be unified; the thresholds were tuned against each export's note volume.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DensityParams {
    /// Forward window length in days. The window is `[d, d + window_days]`,
    /// both ends inclusive.
    pub window_days: u64,
    pub start_threshold: usize,
    /// When true the state machine enters at `count >= start_threshold`,
    /// otherwise at `count > start_threshold`.
    pub start_inclusive: bool,
}

/// RiO: 5-day window, enter above 30.
pub(crate) const RIO_PARAMS: DensityParams = DensityParams {
    window_days: 5,
    start_threshold: 30,
    start_inclusive: false,
};

/// SystmOne: 15-day window, enter at 40.
pub(crate) const SYSTM_ONE_PARAMS: DensityParams = DensityParams {
    window_days: 15,
    start_threshold: 40,
    start_inclusive: true,
};

/// Compute raw inpatient date intervals from the sorted per-note dates.
///
/// `dates` must be ascending and carries one entry per note (duplicates
/// expected -- several notes on one day is exactly the signal). Returns
/// sorted, non-overlapping intervals with inclusive ends. An open admission
/// also closes when the gap to the next note-date exceeds the window (every
/// count taken inside the silence would be zero), and an admission still
/// open at the last date closes at the last date.
pub(crate) fn density_intervals(
    dates: &[NaiveDate],
    params: DensityParams,
) -> Vec<(NaiveDate, NaiveDate)> {
    let Some(&last_date) = dates.last() else {
        return Vec::new();
    };
    let mut raw: Vec<(NaiveDate, NaiveDate)> = Vec::new();
    let mut open_start: Option<NaiveDate> = None;

    let mut i = 0;
    while i < dates.len() {
        let date = dates[i];
        // Skip over the remaining notes on the same day.
        let mut next = i;
        while next < dates.len() && dates[next] == date {
            next += 1;
        }

        let count = window_count(dates, i, date, params.window_days);
        let starts = if params.start_inclusive {
            count >= params.start_threshold
        } else {
            count > params.start_threshold
        };

        match open_start {
            None if starts => {
                debug!(%date, count, "density: admission opened");
                open_start = Some(date);
            }
            Some(start) if count < END_THRESHOLD => {
                debug!(%date, count, "density: admission closed");
                raw.push((start, date));
                open_start = None;
            }
            _ => {}
        }

        // A note-free stretch longer than the window ends the admission at
        // its last note-date; the count never recovers inside the silence.
        if let Some(start) = open_start {
            let silent = dates
                .get(next)
                .is_some_and(|nd| (*nd - date).num_days() > params.window_days as i64);
            if silent {
                debug!(%date, count, "density: admission closed by silence");
                raw.push((start, date));
                open_start = None;
            }
        }

        i = next;
    }

    if let Some(start) = open_start {
        // Still open at the end of the record.
        raw.push((start, last_date));
    }

    merge_overlapping(raw)
}

/// Number of notes dated within `[date, date + window_days]`, starting the
/// scan at `from` (the first note on `date`).
fn window_count(dates: &[NaiveDate], from: usize, date: NaiveDate, window_days: u64) -> usize {
    let window_end = date
        .checked_add_days(Days::new(window_days))
        .unwrap_or(NaiveDate::MAX);
    dates[from..]
        .iter()
        .take_while(|d| **d <= window_end)
        .count()
}

/// Merge intervals that overlap or touch. Input intervals are produced in
/// ascending start order but are sorted again before merging.
pub(crate) fn merge_overlapping(
    mut intervals: Vec<(NaiveDate, NaiveDate)>,
) -> Vec<(NaiveDate, NaiveDate)> {
    intervals.sort_by_key(|(start, _)| *start);
    let mut merged: Vec<(NaiveDate, NaiveDate)> = Vec::new();
    for (start, end) in intervals {
        match merged.last_mut() {
            Some((_, prev_end)) if start <= *prev_end => {
                if end > *prev_end {
                    *prev_end = end;
                }
            }
            _ => merged.push((start, end)),
        }
    }
    merged
}
