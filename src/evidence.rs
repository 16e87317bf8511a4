//! Evidence attachment: pick the single most representative note for each
//! episode so the presentation layer has something concrete to cite.
//!
//! Inpatient episodes get their admission clerking note (first note in a
//! bounded window whose body carries admission phrasing, falling back to
//! the first note in the window); community episodes simply get their first
//! note. Attachment never changes episode boundaries.

use chrono::{Days, NaiveDate};
use tracing::debug;

use crate::extract::patterns::ADMISSION_INDICATORS;
use crate::extract::{first_valid_match, snippet};
use crate::models::{ClinicalNote, Episode, EpisodeEvidence, EpisodeKind};

/// How far past the episode start the clerking-note search looks.
const CLERKING_WINDOW_DAYS: u64 = 14;

/// Attach evidence notes to every episode in place.
pub fn attach_evidence(episodes: &mut [Episode], notes: &[ClinicalNote]) {
    for episode in episodes.iter_mut() {
        episode.evidence = match episode.kind {
            EpisodeKind::Inpatient => find_clerking_note(notes, episode),
            EpisodeKind::Community => first_note_in_bounds(notes, episode),
        };
        if episode.evidence.is_none() {
            debug!(label = %episode.label, start = %episode.start, "no evidence note found");
        }
    }
}

/// First note in the 14-day window from episode start whose body carries an
/// admission indicator phrase; otherwise the first note in the window.
fn find_clerking_note(notes: &[ClinicalNote], episode: &Episode) -> Option<EpisodeEvidence> {
    let window_end = clamp(
        episode.start.checked_add_days(Days::new(CLERKING_WINDOW_DAYS)),
        episode.end,
    );
    let in_window: Vec<&ClinicalNote> = notes
        .iter()
        .filter(|n| n.date() >= episode.start && n.date() <= window_end)
        .collect();

    for note in &in_window {
        if let Some(m) = first_valid_match(&note.body, ADMISSION_INDICATORS, false) {
            return Some(EpisodeEvidence {
                note_id: note.id.clone(),
                snippet: Some(snippet(&note.body, &m)),
            });
        }
    }

    in_window.first().map(|note| EpisodeEvidence {
        note_id: note.id.clone(),
        snippet: None,
    })
}

fn clamp(date: Option<NaiveDate>, end: NaiveDate) -> NaiveDate {
    date.map_or(end, |d| d.min(end))
}

/// First note (by date order) within the episode's bounds, no keyword
/// filter.
fn first_note_in_bounds(notes: &[ClinicalNote], episode: &Episode) -> Option<EpisodeEvidence> {
    notes
        .iter()
        .find(|n| episode.contains(n.date()))
        .map(|note| EpisodeEvidence {
            note_id: note.id.clone(),
            snippet: None,
        })
}
