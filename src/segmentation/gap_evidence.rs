//! Transfer-vs-discharge disambiguation for Carenotes segmentation.
//!
//! Two adjacent inpatient segments may be one continuous admission with an
//! inter-ward transfer in the middle (the receiving ward's notes just start
//! late), or a genuine discharge and readmission. The decider is whether the
//! notes inside the gap carry confirmed community activity: each indicator
//! rule contributes a weighted score, and only a gap scoring at least the
//! acceptance threshold is kept as a real discharge.

use chrono::NaiveDate;
use tracing::debug;

use crate::models::ClinicalNote;

/// Minimum accumulated community score for a gap to count as a discharge.
pub(crate) const ACCEPT_THRESHOLD: u32 = 5;

/// Explicit discharge-notification phrasing. Strongest single indicator.
const DISCHARGE_NOTIFICATION_PHRASES: &[&str] = &[
    "discharge notification",
    "notification of discharge",
    "discharge summary sent",
    "discharged from the ward",
];

/// Outpatient / clinic phrasing.
const OUTPATIENT_PHRASES: &[&str] = &["outpatient", "out-patient", "clinic appointment", "opd"];

/// Weaker community-contact phrasing, one point per category.
const CONTACT_PHRASES: &[&[&str]] = &[
    &["home visit", "visited at home"],
    &["telephone", "phone call", "phoned"],
    &["support worker"],
    &["crisis team", "home treatment team"],
];

/// Merge adjacent segments whose separating gap lacks community evidence.
///
/// `segments` must be sorted and non-overlapping; `notes` sorted by
/// timestamp. Runs before the trailing-note extension so that the extension
/// operates on the merged boundaries.
pub(crate) fn merge_unconfirmed_gaps(
    segments: Vec<(NaiveDate, NaiveDate)>,
    notes: &[&ClinicalNote],
) -> Vec<(NaiveDate, NaiveDate)> {
    let mut merged: Vec<(NaiveDate, NaiveDate)> = Vec::new();
    for segment in segments {
        match merged.last_mut() {
            Some(prev) => {
                let score = gap_score(notes, prev.1, segment.0);
                if score >= ACCEPT_THRESHOLD {
                    debug!(
                        gap_start = %prev.1,
                        gap_end = %segment.0,
                        score,
                        "gap confirmed as discharge, keeping split"
                    );
                    merged.push(segment);
                } else {
                    debug!(
                        gap_start = %prev.1,
                        gap_end = %segment.0,
                        score,
                        "gap unconfirmed, merging segments (likely transfer)"
                    );
                    prev.1 = segment.1;
                }
            }
            None => merged.push(segment),
        }
    }
    merged
}

/// Accumulated community score over all notes strictly between the two
/// segment boundaries.
pub(crate) fn gap_score(notes: &[&ClinicalNote], gap_start: NaiveDate, gap_end: NaiveDate) -> u32 {
    notes
        .iter()
        .filter(|n| n.date() > gap_start && n.date() < gap_end)
        .map(|n| note_score(n))
        .sum()
}

/// Community score for a single note. Each rule fires at most once per note.
fn note_score(note: &ClinicalNote) -> u32 {
    let mut score = 0;
    let body = note.body.to_lowercase();

    if note.raw_type.to_lowercase().contains("community") {
        score += 3;
    }
    if DISCHARGE_NOTIFICATION_PHRASES.iter().any(|p| body.contains(p)) {
        score += 5;
    }
    if body.contains("discharged") && (body.contains("home") || body.contains("community")) {
        score += 3;
    }
    if let Some(first_line) = note.body.lines().next() {
        let first_line = first_line.trim_start().to_lowercase();
        // "cc" must stand alone as the first word ("CC attempted contact",
        // "cc: GP"), not merely prefix a longer one ("CCTV reviewed").
        let cc_token = first_line
            .split(|c: char| !c.is_alphanumeric())
            .next()
            .is_some_and(|word| word == "cc");
        if cc_token || first_line.starts_with("community") {
            score += 2;
        }
    }
    if OUTPATIENT_PHRASES.iter().any(|p| body.contains(p)) {
        score += 2;
    }
    for category in CONTACT_PHRASES {
        if category.iter().any(|p| body.contains(p)) {
            score += 1;
        }
    }
    score
}
