//! Narrative assembly: turns the episode list and per-episode extraction
//! results into the final section/paragraph/segment structure.
//!
//! The one rule that matters: any clause stating a fact sourced from a
//! specific note is emitted as a referenced segment carrying that note's id
//! and the extracted snippet verbatim. Computed facts (counts, durations,
//! gap phrasing) stay plain.

use chrono::NaiveDate;
use tracing::debug;

use crate::models::{AdmissionDetails, CommunityDetails, Episode, EpisodeKind, IncidentItem, IncidentKind, SourcedItem};
use crate::narrative::grammar::{count_noun, duration_phrase, format_date};
use crate::narrative::{
    Formatting, NarrativeParagraph, NarrativeSection, NarrativeSegment, NoteReference,
};

/// One episode plus whatever the structured extractor produced for it.
#[derive(Debug, Clone)]
pub(crate) struct EpisodeData {
    pub episode: Episode,
    pub admission: Option<AdmissionDetails>,
    pub community: Option<CommunityDetails>,
}

/// Prefix length used when de-duplicating incident-log entries.
const INCIDENT_DEDUP_PREFIX_CHARS: usize = 40;

/// Compose the full ordered section list.
pub(crate) fn compose_sections(
    note_count: usize,
    span: Option<(NaiveDate, NaiveDate)>,
    episodes: &[EpisodeData],
) -> Vec<NarrativeSection> {
    let (first, last) = match span {
        Some(span) if note_count > 0 => span,
        _ => return vec![insufficient_data_section()],
    };

    let sections = vec![
        header_section(note_count, first, last),
        overview_section(episodes, first, last),
        admission_history_section(episodes),
        narrative_section(episodes),
        incident_log_section(episodes),
    ];
    debug!(sections = sections.len(), "narrative composed");
    sections
}

fn plain(text: impl Into<String>) -> NarrativeSegment {
    NarrativeSegment::Plain {
        text: text.into(),
        formatting: Formatting::Normal,
    }
}

fn emphasis(text: impl Into<String>) -> NarrativeSegment {
    NarrativeSegment::Plain {
        text: text.into(),
        formatting: Formatting::Emphasis,
    }
}

fn referenced(text: impl Into<String>, note_id: &str, highlight: &str) -> NarrativeSegment {
    NarrativeSegment::Referenced {
        text: text.into(),
        reference: NoteReference {
            note_id: note_id.to_string(),
            highlight: highlight.to_string(),
        },
        formatting: Formatting::Normal,
    }
}

fn paragraph(segments: Vec<NarrativeSegment>) -> NarrativeParagraph {
    NarrativeParagraph { segments }
}

/// Append referenced segments joined "a, b and c" style, matching the
/// plain-list grammar.
fn push_joined_refs(segments: &mut Vec<NarrativeSegment>, items: &[(String, String, String)]) {
    for (index, (text, note_id, highlight)) in items.iter().enumerate() {
        if index > 0 {
            if index + 1 == items.len() {
                segments.push(plain(" and "));
            } else {
                segments.push(plain(", "));
            }
        }
        segments.push(referenced(text.clone(), note_id, highlight));
    }
}

fn sourced_ref_items(items: &[SourcedItem]) -> Vec<(String, String, String)> {
    items
        .iter()
        .map(|i| (i.text.clone(), i.note_id.clone(), i.snippet.clone()))
        .collect()
}

fn insufficient_data_section() -> NarrativeSection {
    NarrativeSection {
        title: Some("Clinical record summary".to_string()),
        paragraphs: vec![paragraph(vec![plain(
            "Insufficient data: no clinical notes were available for this patient.",
        )])],
    }
}

fn header_section(note_count: usize, first: NaiveDate, last: NaiveDate) -> NarrativeSection {
    NarrativeSection {
        title: Some("Clinical record summary".to_string()),
        paragraphs: vec![paragraph(vec![plain(format!(
            "Reconstructed from {} spanning {} to {}.",
            count_noun(note_count, "clinical note"),
            format_date(first),
            format_date(last),
        ))])],
    }
}

fn overview_section(episodes: &[EpisodeData], first: NaiveDate, last: NaiveDate) -> NarrativeSection {
    let admissions: Vec<&EpisodeData> = episodes
        .iter()
        .filter(|e| e.episode.kind == EpisodeKind::Inpatient)
        .collect();
    let community_count = episodes.len() - admissions.len();
    let inpatient_days: i64 = admissions.iter().map(|e| e.episode.duration_days()).sum();

    let mut text = format!(
        "{} and {} identified between {} and {}.",
        count_noun(admissions.len(), "admission"),
        count_noun(community_count, "community period"),
        format_date(first),
        format_date(last),
    );
    if inpatient_days > 0 {
        text.push_str(&format!(
            " Total time as an inpatient: {}.",
            duration_phrase(inpatient_days)
        ));
    }

    NarrativeSection {
        title: Some("Overview".to_string()),
        paragraphs: vec![paragraph(vec![plain(text)])],
    }
}

fn admission_history_section(episodes: &[EpisodeData]) -> NarrativeSection {
    let mut paragraphs = Vec::new();
    for data in episodes.iter().filter(|e| e.episode.kind == EpisodeKind::Inpatient) {
        let episode = &data.episode;
        let mut segments = vec![plain(format!(
            "{}: {} to {} ({})",
            episode.label,
            format_date(episode.start),
            format_date(episode.end),
            duration_phrase(episode.duration_days()),
        ))];
        match &episode.evidence {
            Some(evidence) => {
                if let Some(snippet) = &evidence.snippet {
                    segments.push(plain(", "));
                    segments.push(referenced("admission note on file", &evidence.note_id, snippet));
                }
                segments.push(plain("."));
            }
            None => segments.push(plain(". No admission note found.")),
        }
        paragraphs.push(paragraph(segments));
    }

    if paragraphs.is_empty() {
        paragraphs.push(paragraph(vec![plain("No admissions identified.")]));
    }

    NarrativeSection {
        title: Some("Admission history".to_string()),
        paragraphs,
    }
}

fn narrative_section(episodes: &[EpisodeData]) -> NarrativeSection {
    let mut paragraphs = Vec::new();
    let first_admission = episodes
        .iter()
        .find(|e| e.episode.kind == EpisodeKind::Inpatient)
        .map(|e| e.episode.clone());

    for (index, data) in episodes.iter().enumerate() {
        match data.episode.kind {
            EpisodeKind::Community if index == 0 => {
                paragraphs.push(opening_community_paragraph(data, first_admission.as_ref()));
            }
            EpisodeKind::Community => paragraphs.push(community_paragraph(data)),
            EpisodeKind::Inpatient => paragraphs.push(admission_paragraph(data)),
        }
    }

    NarrativeSection {
        title: Some("Narrative".to_string()),
        paragraphs,
    }
}

/// The period before the first admission (or the whole record when there
/// were no admissions).
fn opening_community_paragraph(
    data: &EpisodeData,
    first_admission: Option<&Episode>,
) -> NarrativeParagraph {
    let episode = &data.episode;
    let mut segments = match first_admission {
        Some(admission) => vec![plain(format!(
            "The patient was known to services in the community from {} until the {} on {}.",
            format_date(episode.start),
            admission.label,
            format_date(admission.start),
        ))],
        None => vec![plain(format!(
            "The patient was known to services in the community from {} to {}, with no inpatient admissions identified.",
            format_date(episode.start),
            format_date(episode.end),
        ))],
    };
    if let Some(details) = &data.community {
        push_community_details(&mut segments, details);
    }
    paragraph(segments)
}

fn community_paragraph(data: &EpisodeData) -> NarrativeParagraph {
    let episode = &data.episode;
    let mut segments = vec![plain(format!(
        "The patient then remained in the community for {}, from {} to {}.",
        duration_phrase(episode.duration_days()),
        format_date(episode.start),
        format_date(episode.end),
    ))];
    if let Some(details) = &data.community {
        push_community_details(&mut segments, details);
    }
    paragraph(segments)
}

fn push_community_details(segments: &mut Vec<NarrativeSegment>, details: &CommunityDetails) {
    if !details.medications.is_empty() {
        segments.push(plain(" Medication in the community included "));
        push_joined_refs(segments, &sourced_ref_items(&details.medications));
        segments.push(plain("."));
    }
    if !details.engagement.is_empty() {
        segments.push(plain(" The patient engaged with "));
        push_joined_refs(segments, &sourced_ref_items(&details.engagement));
        segments.push(plain("."));
    }
    if !details.crises.is_empty() {
        segments.push(plain(" Crisis contacts during this period included "));
        push_joined_refs(segments, &sourced_ref_items(&details.crises));
        segments.push(plain("."));
    }
    if !details.concerns.is_empty() {
        segments.push(plain(" Concerns were recorded around "));
        push_joined_refs(segments, &sourced_ref_items(&details.concerns));
        segments.push(plain("."));
    }
}

fn admission_paragraph(data: &EpisodeData) -> NarrativeParagraph {
    let episode = &data.episode;
    let mut segments = Vec::new();

    // Opening sentence: start date, then source and legal status where known.
    segments.push(plain(format!(
        "The {} began on {}",
        episode.label,
        format_date(episode.start)
    )));
    if let Some(details) = &data.admission {
        if let Some(source) = &details.admission_source {
            segments.push(plain(", "));
            segments.push(referenced(source.text.clone(), &source.note_id, &source.snippet));
        }
        if let Some(status) = &details.legal_status {
            segments.push(plain(", "));
            segments.push(referenced(status.text.clone(), &status.note_id, &status.snippet));
        }
    }
    segments.push(plain("."));

    if let Some(details) = &data.admission {
        if !details.triggers.is_empty() {
            segments.push(plain(" The admission followed "));
            push_joined_refs(&mut segments, &sourced_ref_items(&details.triggers));
            segments.push(plain("."));
        }
        if !details.complaints.is_empty() {
            segments.push(plain(" On admission the patient presented with "));
            push_joined_refs(&mut segments, &sourced_ref_items(&details.complaints));
            segments.push(plain("."));
        }
        if !details.medications_before.is_empty() {
            segments.push(plain(" Medication prior to admission included "));
            push_joined_refs(&mut segments, &sourced_ref_items(&details.medications_before));
            segments.push(plain("."));
        }
        let continued: Vec<SourcedItem> = details
            .medications_during
            .iter()
            .filter(|m| !details.medication_changes.iter().any(|c| c.text == m.text))
            .cloned()
            .collect();
        if !continued.is_empty() {
            segments.push(plain(" Medication during the admission included "));
            push_joined_refs(&mut segments, &sourced_ref_items(&continued));
            segments.push(plain("."));
        }
        if !details.medication_changes.is_empty() {
            segments.push(plain(" During the stay "));
            push_joined_refs(&mut segments, &sourced_ref_items(&details.medication_changes));
            if details.medication_changes.len() == 1 {
                segments.push(plain(" was commenced."));
            } else {
                segments.push(plain(" were commenced."));
            }
        }
        if !details.incidents.is_empty() {
            segments.push(plain(" Notable incidents included "));
            push_joined_refs(&mut segments, &incident_ref_items(&details.incidents));
            segments.push(plain("."));
        }
        if !details.improvement_factors.is_empty() {
            segments.push(plain(" Prior to discharge, improvement was noted: "));
            push_joined_refs(&mut segments, &sourced_ref_items(&details.improvement_factors));
            segments.push(plain("."));
        }
    }

    segments.push(plain(format!(
        " The admission ended on {} after {}.",
        format_date(episode.end),
        duration_phrase(episode.duration_days()),
    )));

    paragraph(segments)
}

fn incident_ref_items(incidents: &[IncidentItem]) -> Vec<(String, String, String)> {
    incidents
        .iter()
        .map(|i| {
            (
                format!("{} ({})", i.kind.display_name(), format_date(i.date)),
                i.note_id.clone(),
                i.snippet.clone(),
            )
        })
        .collect()
}

/// Final section: all incidents across all admissions, grouped by category
/// and de-duplicated by day plus normalized snippet prefix.
fn incident_log_section(episodes: &[EpisodeData]) -> NarrativeSection {
    let mut all: Vec<&IncidentItem> = episodes
        .iter()
        .filter_map(|e| e.admission.as_ref())
        .flat_map(|a| a.incidents.iter())
        .collect();
    all.sort_by_key(|i| i.date);

    const KIND_ORDER: [IncidentKind; 6] = [
        IncidentKind::Seclusion,
        IncidentKind::ResponseTeam,
        IncidentKind::Restraint,
        IncidentKind::SelfHarm,
        IncidentKind::Assault,
        IncidentKind::Absconding,
    ];

    let mut paragraphs = Vec::new();
    for kind in KIND_ORDER {
        let mut seen: Vec<(NaiveDate, String)> = Vec::new();
        let mut items: Vec<(String, String, String)> = Vec::new();
        for incident in all.iter().filter(|i| i.kind == kind) {
            let key = (incident.date, dedup_key(&incident.snippet));
            if seen.contains(&key) {
                continue;
            }
            seen.push(key);
            items.push((
                format_date(incident.date),
                incident.note_id.clone(),
                incident.snippet.clone(),
            ));
        }
        if items.is_empty() {
            continue;
        }
        let mut segments = vec![emphasis(format!("{}: ", capitalize(kind.display_name())))];
        push_joined_refs(&mut segments, &items);
        segments.push(plain("."));
        paragraphs.push(paragraph(segments));
    }

    if paragraphs.is_empty() {
        paragraphs.push(paragraph(vec![plain("No notable incidents recorded.")]));
    }

    NarrativeSection {
        title: Some("Incident log".to_string()),
        paragraphs,
    }
}

fn dedup_key(snippet: &str) -> String {
    snippet
        .trim()
        .to_lowercase()
        .chars()
        .take(INCIDENT_DEDUP_PREFIX_CHARS)
        .collect()
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
