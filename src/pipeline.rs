//! End-to-end report pipeline: sort the imported notes, segment them into
//! episodes, attach clerking evidence, run the per-episode extractors, and
//! compose the narrative with its citation map.
//!
//! Every stage is a pure function of the note set, so the same notes always
//! produce a byte-identical report.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::cache::Fingerprint;
use crate::evidence;
use crate::extract::{admission, community};
use crate::models::{ClinicalNote, Episode, EpisodeKind, SourceFormat};
use crate::narrative::compose::{self, EpisodeData};
use crate::narrative::{NarrativeSection, NarrativeSegment, ReferenceMap};
use crate::segmentation;
use crate::worker::CancelHandle;

/// Pipeline failure modes.
#[derive(Debug, Error)]
pub enum NarrativeError {
    /// A note carried an id that another note in the same set already uses.
    #[error("duplicate note id: {0}")]
    DuplicateNoteId(String),

    /// The run was cancelled before the report was finished.
    #[error("report generation cancelled")]
    Cancelled,
}

/// The finished report: narrative sections plus everything needed to audit
/// them back to source notes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NarrativeReport {
    /// Fingerprint of the note set this report was built from.
    pub fingerprint: Fingerprint,
    /// Format the notes were judged to come from.
    pub source_format: SourceFormat,
    /// Episode timeline, chronological and contiguous.
    pub episodes: Vec<Episode>,
    /// Ordered narrative sections.
    pub sections: Vec<NarrativeSection>,
    /// Citation numbering, in order of first appearance.
    pub references: ReferenceMap,
}

/// Build a report from an unordered note set.
pub fn build_report(notes: &[ClinicalNote]) -> Result<NarrativeReport, NarrativeError> {
    build_report_with_cancel(notes, &CancelHandle::new())
}

/// [`build_report`] with a cancellation checkpoint between stages. A
/// cancelled run returns [`NarrativeError::Cancelled`] and nothing else.
pub fn build_report_with_cancel(
    notes: &[ClinicalNote],
    cancel: &CancelHandle,
) -> Result<NarrativeReport, NarrativeError> {
    let fingerprint = Fingerprint::of_notes(notes);
    let mut sorted = notes.to_vec();
    check_unique_ids(&sorted)?;
    sorted.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));

    let source_format = infer_source_format(&sorted);
    checkpoint(cancel)?;

    let mut episodes = segmentation::segment_notes(&sorted, source_format);
    evidence::attach_evidence(&mut episodes, &sorted);
    checkpoint(cancel)?;

    let inpatient_intervals: Vec<(NaiveDate, NaiveDate)> = episodes
        .iter()
        .filter(|e| e.kind == EpisodeKind::Inpatient)
        .map(|e| (e.start, e.end))
        .collect();

    let mut episode_data = Vec::with_capacity(episodes.len());
    for episode in &episodes {
        let data = match episode.kind {
            EpisodeKind::Inpatient => EpisodeData {
                episode: episode.clone(),
                admission: Some(admission::extract_admission_details(&sorted, episode)),
                community: None,
            },
            EpisodeKind::Community => EpisodeData {
                episode: episode.clone(),
                admission: None,
                community: Some(community::extract_community_details(
                    &sorted,
                    episode,
                    &inpatient_intervals,
                )),
            },
        };
        episode_data.push(data);
    }
    checkpoint(cancel)?;

    let span = match (sorted.first(), sorted.last()) {
        (Some(first), Some(last)) => Some((first.date(), last.date())),
        _ => None,
    };
    let sections = compose::compose_sections(sorted.len(), span, &episode_data);
    let references = ReferenceMap::from_sections(&sections);

    info!(
        notes = sorted.len(),
        format = source_format.display_name(),
        episodes = episodes.len(),
        citations = references.len(),
        "report built"
    );

    Ok(NarrativeReport {
        fingerprint,
        source_format,
        episodes,
        sections,
        references,
    })
}

fn checkpoint(cancel: &CancelHandle) -> Result<(), NarrativeError> {
    if cancel.is_cancelled() {
        debug!("report generation cancelled mid-pipeline");
        return Err(NarrativeError::Cancelled);
    }
    Ok(())
}

fn check_unique_ids(notes: &[ClinicalNote]) -> Result<(), NarrativeError> {
    let mut ids: Vec<&str> = notes.iter().map(|n| n.id.as_str()).collect();
    ids.sort_unstable();
    for pair in ids.windows(2) {
        if pair[0] == pair[1] {
            return Err(NarrativeError::DuplicateNoteId(pair[0].to_string()));
        }
    }
    Ok(())
}

/// Majority vote over the per-note source tags. Ties break toward the
/// earliest [`SourceFormat`] variant, which orders Rio first.
pub fn infer_source_format(notes: &[ClinicalNote]) -> SourceFormat {
    let candidates = [
        SourceFormat::Rio,
        SourceFormat::SystmOne,
        SourceFormat::Carenotes,
    ];
    let mut best = SourceFormat::Rio;
    let mut best_count = 0usize;
    for candidate in candidates {
        let count = notes.iter().filter(|n| n.source == candidate).count();
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }
    best
}

/// Flatten a report to plain text: titles in caps, one blank line between
/// paragraphs, citation markers inline, and the numbered source table at the
/// end.
pub fn render_text(report: &NarrativeReport) -> String {
    let mut out = String::new();
    for section in &report.sections {
        if let Some(title) = &section.title {
            out.push_str(&title.to_uppercase());
            out.push_str("\n\n");
        }
        for paragraph in &section.paragraphs {
            for segment in &paragraph.segments {
                out.push_str(segment.text());
                if let NarrativeSegment::Referenced { reference, .. } = segment {
                    if let Some(number) = report.references.number_for(&reference.note_id) {
                        out.push_str(&format!(" [{}]", number));
                    }
                }
            }
            out.push_str("\n\n");
        }
    }
    if !report.references.is_empty() {
        out.push_str("SOURCES\n\n");
        for (index, note_id) in report.references.cited_ids().iter().enumerate() {
            out.push_str(&format!("[{}] note {}\n", index + 1, note_id));
        }
    }
    out
}
