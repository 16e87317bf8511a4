//! Per-community-episode extraction. Simpler than the admission extractor:
//! one pass over the episode's notes for medications, engagement activity,
//! crisis events, and concern flags. Notes dated inside any known inpatient
//! interval are excluded so ward activity never leaks into a community
//! paragraph.

use chrono::NaiveDate;
use tracing::debug;

use crate::extract::admission::extract_medications;
use crate::extract::patterns::{self, PhraseRule};
use crate::extract::{first_valid_match, snippet};
use crate::models::{ClinicalNote, CommunityDetails, Episode, SourcedItem};

pub(crate) fn extract_community_details(
    notes: &[ClinicalNote],
    episode: &Episode,
    inpatient_intervals: &[(NaiveDate, NaiveDate)],
) -> CommunityDetails {
    let in_period: Vec<&ClinicalNote> = notes
        .iter()
        .filter(|n| episode.contains(n.date()))
        .filter(|n| {
            !inpatient_intervals
                .iter()
                .any(|(start, end)| n.date() >= *start && n.date() <= *end)
        })
        .collect();

    let details = CommunityDetails {
        medications: extract_medications(&in_period),
        engagement: extract_rules(&in_period, patterns::COMMUNITY_ENGAGEMENT),
        crises: extract_rules(&in_period, patterns::COMMUNITY_CRISES),
        concerns: extract_rules(&in_period, patterns::COMMUNITY_CONCERNS),
    };

    debug!(
        start = %episode.start,
        notes = in_period.len(),
        medications = details.medications.len(),
        crises = details.crises.len(),
        concerns = details.concerns.len(),
        "community extraction complete"
    );
    details
}

/// One item per rule label, first surviving match in date order.
fn extract_rules(notes: &[&ClinicalNote], rules: &[PhraseRule]) -> Vec<SourcedItem> {
    let mut items = Vec::new();
    for rule in rules {
        for note in notes {
            if let Some(m) = first_valid_match(&note.body, rule.phrases, false) {
                items.push(SourcedItem {
                    text: rule.label.to_string(),
                    note_id: note.id.clone(),
                    snippet: snippet(&note.body, &m),
                    date: note.date(),
                });
                break;
            }
        }
    }
    items.sort_by_key(|i| i.date);
    items
}
