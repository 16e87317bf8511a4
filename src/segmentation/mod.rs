//! Episode segmentation: partitions a patient's note timeline into
//! alternating inpatient and community episodes.
//!
//! Three source-specific algorithms produce raw inpatient date intervals
//! (density windows for RiO and SystmOne, per-note classification for
//! Carenotes); this module turns those intervals into the final contiguous,
//! alternating episode list by synthesizing community episodes into every
//! gap.

mod density;
mod gap_evidence;
mod note_class;

use chrono::{Days, NaiveDate};
use tracing::{debug, info};

use crate::models::{ClinicalNote, Episode, EpisodeKind, SourceFormat};
use crate::narrative::grammar::ordinal;

/// Segment a patient's notes into episodes. `notes` must be sorted by
/// timestamp (the pipeline sorts before calling). Empty input yields an
/// empty episode list.
pub fn segment_notes(notes: &[ClinicalNote], format: SourceFormat) -> Vec<Episode> {
    let (Some(first_note), Some(last_note)) = (notes.first(), notes.last()) else {
        return Vec::new();
    };

    let intervals = match format {
        SourceFormat::Rio => density::density_intervals(&note_dates(notes), density::RIO_PARAMS),
        SourceFormat::SystmOne => {
            density::density_intervals(&note_dates(notes), density::SYSTM_ONE_PARAMS)
        }
        SourceFormat::Carenotes => note_class::classified_intervals(notes),
    };

    let first = first_note.date();
    let last = last_note.date();
    // Classified intervals can sit inside the raw span even when the span's
    // endpoints were filtered out; clamp so gap fill stays well-formed.
    let first = intervals.first().map_or(first, |(s, _)| first.min(*s));
    let last = intervals.last().map_or(last, |(_, e)| last.max(*e));

    info!(
        format = format.display_name(),
        inpatient_intervals = intervals.len(),
        span_start = %first,
        span_end = %last,
        "segmentation complete"
    );

    build_episodes(&intervals, first, last)
}

fn note_dates(notes: &[ClinicalNote]) -> Vec<NaiveDate> {
    notes.iter().map(|n| n.date()).collect()
}

/// Fill the gaps before, between, and after the inpatient intervals with
/// community episodes and label everything. With no intervals the whole
/// span is one community episode.
fn build_episodes(
    intervals: &[(NaiveDate, NaiveDate)],
    first: NaiveDate,
    last: NaiveDate,
) -> Vec<Episode> {
    let mut episodes = Vec::new();

    if intervals.is_empty() {
        episodes.push(community_episode(first, last));
        return episodes;
    }

    let mut cursor = first;
    let mut admissions = 0usize;
    for &(start, end) in intervals {
        if cursor < start {
            // Community gap ends the day before the admission starts.
            let gap_end = start.pred_opt().unwrap_or(start);
            if cursor <= gap_end {
                episodes.push(community_episode(cursor, gap_end));
            }
        }
        match episodes.last_mut() {
            // Intervals that touch day-to-day leave no room for a community
            // gap; fold them into one admission so kinds keep alternating.
            Some(prev) if prev.kind == EpisodeKind::Inpatient => {
                prev.end = end;
            }
            _ => {
                admissions += 1;
                episodes.push(Episode {
                    kind: EpisodeKind::Inpatient,
                    start,
                    end,
                    label: format!("{} admission", ordinal(admissions)),
                    evidence: None,
                });
            }
        }
        cursor = end.checked_add_days(Days::new(1)).unwrap_or(end);
    }

    if cursor <= last {
        episodes.push(community_episode(cursor, last));
    }

    debug!(episodes = episodes.len(), "episode list built");
    episodes
}

fn community_episode(start: NaiveDate, end: NaiveDate) -> Episode {
    Episode {
        kind: EpisodeKind::Community,
        start,
        end,
        label: "Community period".to_string(),
        evidence: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn note_on(id: &str, date: NaiveDate) -> ClinicalNote {
        let ts = format!("{} 09:00:00", date.format("%Y-%m-%d"));
        ClinicalNote {
            id: id.to_string(),
            timestamp: NaiveDateTime::parse_from_str(&ts, "%Y-%m-%d %H:%M:%S")
                .unwrap()
                .and_utc(),
            body: "Routine review.".to_string(),
            note_type: "Progress".to_string(),
            raw_type: "Progress".to_string(),
            author: "Test".to_string(),
            source: SourceFormat::Rio,
        }
    }

    fn notes_per_day(start: NaiveDate, days: u64, per_day: usize) -> Vec<ClinicalNote> {
        let mut out = Vec::new();
        for offset in 0..days {
            let date = start.checked_add_days(Days::new(offset)).unwrap();
            for k in 0..per_day {
                out.push(note_on(&format!("n{}-{}", offset, k), date));
            }
        }
        out
    }

    fn assert_episode_invariants(episodes: &[Episode], first: NaiveDate, last: NaiveDate) {
        assert!(!episodes.is_empty());
        assert_eq!(episodes.first().unwrap().start, first);
        assert_eq!(episodes.last().unwrap().end, last);
        for pair in episodes.windows(2) {
            // Contiguous and non-overlapping.
            assert_eq!(pair[1].start, pair[0].end.succ_opt().unwrap());
            // Alternating kind.
            assert_ne!(pair[0].kind, pair[1].kind);
        }
    }

    #[test]
    fn test_empty_notes_empty_episodes() {
        assert!(segment_notes(&[], SourceFormat::Rio).is_empty());
    }

    #[test]
    fn test_no_qualifying_notes_single_community_episode() {
        let notes: Vec<ClinicalNote> = (0..10)
            .map(|i| note_on(&format!("n{}", i), d(2015, 1, 1 + i)))
            .collect();
        let episodes = segment_notes(&notes, SourceFormat::Rio);
        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].kind, EpisodeKind::Community);
        assert_eq!(episodes[0].start, d(2015, 1, 1));
        assert_eq!(episodes[0].end, d(2015, 1, 10));
    }

    #[test]
    fn test_dense_run_produces_inpatient_with_community_either_side() {
        // Sparse lead-in, dense admission, sparse tail.
        let mut notes = Vec::new();
        for week in 0..8u64 {
            notes.push(note_on(
                &format!("pre{}", week),
                d(2015, 1, 1).checked_add_days(Days::new(week * 7)).unwrap(),
            ));
        }
        notes.extend(notes_per_day(d(2015, 4, 1), 40, 8));
        for week in 0..8u64 {
            notes.push(note_on(
                &format!("post{}", week),
                d(2015, 6, 1).checked_add_days(Days::new(week * 7)).unwrap(),
            ));
        }
        notes.sort_by_key(|n| n.timestamp);

        let episodes = segment_notes(&notes, SourceFormat::Rio);
        assert_eq!(episodes.len(), 3);
        assert_eq!(episodes[0].kind, EpisodeKind::Community);
        assert_eq!(episodes[1].kind, EpisodeKind::Inpatient);
        assert_eq!(episodes[1].start, d(2015, 4, 1));
        assert_eq!(episodes[2].kind, EpisodeKind::Community);
        assert_episode_invariants(&episodes, d(2015, 1, 1), d(2015, 7, 20));
    }

    #[test]
    fn test_admission_labels_are_ordinal() {
        let mut notes = notes_per_day(d(2015, 1, 1), 20, 10);
        notes.extend(notes_per_day(d(2015, 6, 1), 20, 10));
        notes.sort_by_key(|n| n.timestamp);
        let episodes = segment_notes(&notes, SourceFormat::Rio);
        let labels: Vec<&str> = episodes
            .iter()
            .filter(|e| e.kind == EpisodeKind::Inpatient)
            .map(|e| e.label.as_str())
            .collect();
        assert_eq!(labels, vec!["1st admission", "2nd admission"]);
    }

    #[test]
    fn test_build_episodes_touching_intervals_fold_into_one_admission() {
        // Day-adjacent inpatient intervals leave no room for a community
        // gap; they become one admission so kinds keep alternating.
        let intervals = vec![(d(2015, 1, 1), d(2015, 1, 10)), (d(2015, 1, 11), d(2015, 1, 20))];
        let episodes = build_episodes(&intervals, d(2015, 1, 1), d(2015, 1, 20));
        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].kind, EpisodeKind::Inpatient);
        assert_eq!(episodes[0].end, d(2015, 1, 20));
        assert_eq!(episodes[0].label, "1st admission");
    }

    #[test]
    fn test_build_episodes_full_gap_fill() {
        let intervals = vec![(d(2015, 2, 1), d(2015, 2, 20)), (d(2015, 5, 1), d(2015, 5, 10))];
        let episodes = build_episodes(&intervals, d(2015, 1, 1), d(2015, 6, 30));
        assert_eq!(episodes.len(), 5);
        assert_episode_invariants(&episodes, d(2015, 1, 1), d(2015, 6, 30));
        assert_eq!(episodes[1].label, "1st admission");
        assert_eq!(episodes[3].label, "2nd admission");
    }
}
