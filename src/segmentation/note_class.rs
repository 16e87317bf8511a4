//! Per-note inpatient classification for the Carenotes export format.
//!
//! Carenotes exports carry usable type labels per note, so instead of note
//! density we classify each note as inpatient evidence or not, group the
//! flagged dates into segments with a gap tolerance, and let the gap
//! evidence classifier decide which gaps are real discharges.

use chrono::{Days, NaiveDate};
use tracing::debug;

use crate::models::ClinicalNote;
use crate::segmentation::gap_evidence;

/// Notes dated before this are treated as data-entry errors and excluded
/// from this segmenter entirely (the density segmenters keep them).
pub(crate) const MIN_VALID_DATE: NaiveDate = match NaiveDate::from_ymd_opt(1990, 1, 1) {
    Some(d) => d,
    None => unreachable!(),
};

/// A gap of up to this many days between inpatient-flagged dates keeps
/// extending the current segment.
const GROUPING_GAP_DAYS: i64 = 30;

/// After merging, segment ends are extended through trailing notes (discharge
/// summaries and the like) within this many days.
const TRAILING_EXTENSION_DAYS: u64 = 7;

/// Sub-type keywords that veto inpatient classification outright.
const COMMUNITY_SUBTYPE_KEYWORDS: &[&str] = &[
    "community",
    "cmht",
    "crisis",
    "home treatment",
    "outreach",
    "care coordinator",
    "outpatient",
];

/// Sub-type keywords that confirm inpatient classification.
const INPATIENT_SUBTYPE_KEYWORDS: &[&str] = &["ward", "inpatient", "picu"];

/// Keywords matched against the first 500 characters of the body as a last
/// resort. All unambiguous ward-context phrasing.
const INPATIENT_CONTEXT_KEYWORDS: &[&str] = &[
    "ward round",
    "on the ward",
    "admitted to the ward",
    "named nurse",
    "observation level",
    "1:1 observation",
    "nursing shift",
    "seclusion",
    "section 17 leave",
    "leave from the ward",
];

const BODY_CONTEXT_CHARS: usize = 500;

/// Classify one note as inpatient evidence. Checks run in priority order;
/// a community sub-type in the raw label vetoes everything below it.
pub(crate) fn is_inpatient_note(note: &ClinicalNote) -> bool {
    if let Some(subtype) = raw_subtype(&note.raw_type) {
        let subtype = subtype.to_lowercase();
        if COMMUNITY_SUBTYPE_KEYWORDS.iter().any(|k| subtype.contains(k)) {
            return false;
        }
        if INPATIENT_SUBTYPE_KEYWORDS.iter().any(|k| subtype.contains(k)) {
            return true;
        }
    }

    if note.note_type.to_lowercase().contains("inpatient") {
        return true;
    }

    // A line starting with "inpatient" in the first three lines of the body
    // (some exports push the ward context into the note header).
    if note
        .body
        .lines()
        .take(3)
        .any(|line| line.trim_start().to_lowercase().starts_with("inpatient"))
    {
        return true;
    }

    let head: String = note.body.chars().take(BODY_CONTEXT_CHARS).collect();
    let head = head.to_lowercase();
    INPATIENT_CONTEXT_KEYWORDS.iter().any(|k| head.contains(k))
}

/// Extract the sub-type from a raw type label: the bracketed part if any,
/// otherwise the part after " - " (e.g. "Nursing - Ward Nurse" -> "Ward
/// Nurse").
fn raw_subtype(raw_type: &str) -> Option<&str> {
    if let Some(open) = raw_type.find('(') {
        if let Some(close) = raw_type[open..].find(')') {
            return Some(raw_type[open + 1..open + close].trim());
        }
    }
    raw_type.split_once(" - ").map(|(_, rest)| rest.trim())
}

/// Full Carenotes segmentation: classify, group, gap-merge, extend.
///
/// `notes` must be sorted by timestamp. Returns sorted, non-overlapping
/// inpatient intervals with inclusive ends.
pub(crate) fn classified_intervals(notes: &[ClinicalNote]) -> Vec<(NaiveDate, NaiveDate)> {
    // Exclude pre-1990 dates before any computation.
    let valid: Vec<&ClinicalNote> = notes.iter().filter(|n| n.date() >= MIN_VALID_DATE).collect();

    let flagged_dates: Vec<NaiveDate> = valid
        .iter()
        .filter(|n| is_inpatient_note(n))
        .map(|n| n.date())
        .collect();

    let mut segments = group_dates(&flagged_dates);
    debug!(raw_segments = segments.len(), "carenotes: grouped inpatient dates");

    // The gap classifier must see the raw segment boundaries, so it runs
    // before the trailing-note extension.
    segments = gap_evidence::merge_unconfirmed_gaps(segments, &valid);

    extend_trailing(&mut segments, &valid);
    segments
}

/// Group ascending flagged dates into segments, tolerating gaps of up to 30
/// days inside one segment. Input may carry duplicates.
fn group_dates(dates: &[NaiveDate]) -> Vec<(NaiveDate, NaiveDate)> {
    let mut segments = Vec::new();
    let mut current: Option<(NaiveDate, NaiveDate)> = None;
    for &date in dates {
        match current {
            Some((start, end)) if (date - end).num_days() <= GROUPING_GAP_DAYS => {
                current = Some((start, end.max(date)));
            }
            Some(done) => {
                segments.push(done);
                current = Some((date, date));
            }
            None => current = Some((date, date)),
        }
    }
    if let Some(done) = current {
        segments.push(done);
    }
    segments
}

/// Extend each segment's end through notes within 7 days of it that are not
/// inside the next segment. Discharge summaries and ward round write-ups
/// often land a few days after the last classified inpatient note. The
/// 7-day limit is anchored at the raw segment end and applied once; it does
/// not re-anchor on the extended end, or a run of weekly community
/// follow-ups would chain the admission forward indefinitely.
fn extend_trailing(segments: &mut [(NaiveDate, NaiveDate)], notes: &[&ClinicalNote]) {
    for i in 0..segments.len() {
        let next_start = segments.get(i + 1).map(|(start, _)| *start);
        let (_, end) = segments[i];
        let limit = end
            .checked_add_days(Days::new(TRAILING_EXTENSION_DAYS))
            .unwrap_or(NaiveDate::MAX);
        let candidate = notes
            .iter()
            .map(|n| n.date())
            .filter(|d| *d > end && *d <= limit)
            .filter(|d| next_start.map_or(true, |ns| *d < ns))
            .max();
        if let Some(new_end) = candidate {
            segments[i].1 = new_end;
        }
    }
}
