//! Reconstructs a patient's psychiatric care history from raw electronic
//! case notes. Notes exported from Rio, SystmOne, or Carenotes are segmented
//! into alternating inpatient and community episodes, mined for structured
//! clinical details, and rendered as a cited narrative where every sourced
//! claim links back to the note it came from.

pub mod cache;
pub mod evidence;
pub mod extract;
pub mod models;
pub mod narrative;
pub mod pipeline;
pub mod segmentation;
pub mod worker;

#[cfg(test)]
mod pipeline_tests;

pub use cache::{Fingerprint, MemoryReportCache, ReportCache};
pub use models::{
    AdmissionDetails, ClinicalNote, CommunityDetails, Episode, EpisodeEvidence, EpisodeKind,
    IncidentItem, IncidentKind, SourceFormat, SourcedItem,
};
pub use narrative::{
    Formatting, NarrativeParagraph, NarrativeSection, NarrativeSegment, NoteReference,
    ReferenceMap,
};
pub use pipeline::{
    build_report, build_report_with_cancel, infer_source_format, render_text, NarrativeError,
    NarrativeReport,
};
pub use worker::{CancelHandle, NarrativeWorker};
