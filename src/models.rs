//! Core data model: imported clinical notes, derived episodes, and the
//! per-episode extraction aggregates.
//!
//! Notes are created once at import time and never mutated; everything
//! downstream holds the note id, not the note itself.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The closed set of clinical-records systems notes are imported from.
/// Each format gets its own segmentation algorithm; see the segmentation
/// module for the per-format constants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// RiO export. Density segmentation, 5-day window.
    Rio,
    /// SystmOne export. Density segmentation, 15-day window.
    SystmOne,
    /// Carenotes export. Per-note type classification with gap merge.
    Carenotes,
}

impl SourceFormat {
    pub fn display_name(&self) -> &'static str {
        match self {
            SourceFormat::Rio => "RiO",
            SourceFormat::SystmOne => "SystmOne",
            SourceFormat::Carenotes => "Carenotes",
        }
    }
}

/// A single imported clinical note. Immutable after import.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClinicalNote {
    /// Opaque stable identifier assigned by the importer.
    pub id: String,
    pub timestamp: DateTime<Utc>,
    /// Free-text body exactly as imported (case preserved).
    pub body: String,
    /// Declared note type, normalized by the importer (e.g. "Nursing").
    pub note_type: String,
    /// Raw type label from the source system; may carry a sub-type,
    /// e.g. "Nursing - Ward Nurse" or "Progress (Community)".
    pub raw_type: String,
    pub author: String,
    /// Which exporting system this note came from.
    pub source: SourceFormat,
}

impl ClinicalNote {
    /// Calendar date of the note (UTC). All episode arithmetic is date-based.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// Whether an episode is time spent on a ward or in the community.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeKind {
    Inpatient,
    Community,
}

/// The note attached to an episode as its representative citation.
/// For inpatient episodes this is the admission clerking note (or the first
/// note in the search window as fallback); for community episodes the first
/// note in the period. Advisory only -- never affects episode boundaries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EpisodeEvidence {
    pub note_id: String,
    /// Sentence-bounded snippet around the admission phrase that matched,
    /// None when the note was a fallback pick with no matching phrase.
    pub snippet: Option<String>,
}

/// A maximal contiguous date range classified as inpatient or community.
///
/// Episodes for one patient, sorted by start, are contiguous, non-overlapping,
/// span the full note date range, and alternate kind. Built fresh on every
/// pipeline run; never updated in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Episode {
    pub kind: EpisodeKind,
    pub start: NaiveDate,
    /// Inclusive.
    pub end: NaiveDate,
    /// Human label, e.g. "1st admission" or "Community period".
    pub label: String,
    pub evidence: Option<EpisodeEvidence>,
}

impl Episode {
    /// Inclusive length of the episode in days.
    pub fn duration_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// One extracted fact with its citation: the note it came from and the
/// verbatim snippet of that note's body that supports it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourcedItem {
    /// Display text (pattern label or medication name), not the raw match.
    pub text: String,
    pub note_id: String,
    /// Contiguous, case-preserved substring of the source note body.
    pub snippet: String,
    pub date: NaiveDate,
}

/// Categories of notable ward incident. Seclusion and response-team callouts
/// are the priority kinds when the incident list is capped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IncidentKind {
    Seclusion,
    ResponseTeam,
    Restraint,
    SelfHarm,
    Assault,
    Absconding,
}

impl IncidentKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            IncidentKind::Seclusion => "seclusion",
            IncidentKind::ResponseTeam => "response team callout",
            IncidentKind::Restraint => "restraint",
            IncidentKind::SelfHarm => "self-harm",
            IncidentKind::Assault => "assault",
            IncidentKind::Absconding => "absconding",
        }
    }

    /// Kinds kept first when capping the incident list for an admission.
    pub fn is_priority(&self) -> bool {
        matches!(self, IncidentKind::Seclusion | IncidentKind::ResponseTeam)
    }
}

/// A notable incident during an admission, with its citation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IncidentItem {
    pub kind: IncidentKind,
    pub note_id: String,
    pub snippet: String,
    pub date: NaiveDate,
}

/// Everything extracted for one inpatient episode.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AdmissionDetails {
    /// What led to the admission (30 days pre-admission + first 3 days).
    pub triggers: Vec<SourcedItem>,
    /// Presenting complaints around admission.
    pub complaints: Vec<SourcedItem>,
    /// Legal status at admission (first match wins).
    pub legal_status: Option<SourcedItem>,
    /// Where the patient was admitted from (first match wins).
    pub admission_source: Option<SourcedItem>,
    /// Medications mentioned in the 30 days before admission.
    pub medications_before: Vec<SourcedItem>,
    /// Medications mentioned at any point during the stay.
    pub medications_during: Vec<SourcedItem>,
    /// Medications newly introduced during the stay.
    pub medication_changes: Vec<SourcedItem>,
    /// Capped, de-duplicated ward incidents, sorted by date.
    pub incidents: Vec<IncidentItem>,
    /// Improvement factors noted in the final 14 days before discharge.
    pub improvement_factors: Vec<SourcedItem>,
}

/// Everything extracted for one community episode.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CommunityDetails {
    pub medications: Vec<SourcedItem>,
    /// Therapy / clinic / social engagement activity.
    pub engagement: Vec<SourcedItem>,
    /// Crisis contacts, A&E presentations, overdoses, self-harm.
    pub crises: Vec<SourcedItem>,
    /// Early-warning concerns (disengagement, non-compliance, relapse signs).
    pub concerns: Vec<SourcedItem>,
}
