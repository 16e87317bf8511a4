//! Per-admission structured extraction.
//!
//! Scans three rolling windows around an inpatient episode -- 30 days
//! pre-admission, the first 3 days, and the full stay -- against the phrase
//! tables, plus the final 14 days for improvement factors. Every surviving
//! match carries its source note id and a verbatim snippet.

use chrono::{Days, NaiveDate};
use tracing::debug;

use crate::extract::patterns::{self, MedicationRule, PhraseRule};
use crate::extract::{find_ci, first_valid_match, snippet};
use crate::models::{AdmissionDetails, ClinicalNote, Episode, IncidentItem, SourcedItem};

/// Days before admission scanned for triggers, complaints, and prior
/// medication.
const PRE_ADMISSION_DAYS: u64 = 30;

/// Days from admission start treated as the clerking period.
const EARLY_DAYS: u64 = 3;

/// Days before discharge scanned for improvement factors.
const IMPROVEMENT_WINDOW_DAYS: u64 = 14;

/// Maximum incidents reported per admission.
const MAX_INCIDENTS: usize = 4;

/// Maximum priority-kind (seclusion / response team) incidents kept before
/// other kinds fill the remainder.
const MAX_PRIORITY_INCIDENTS: usize = 3;

pub(crate) fn extract_admission_details(
    notes: &[ClinicalNote],
    episode: &Episode,
) -> AdmissionDetails {
    let pre_start = episode
        .start
        .checked_sub_days(Days::new(PRE_ADMISSION_DAYS))
        .unwrap_or(episode.start);
    let pre_end = episode.start.pred_opt().unwrap_or(episode.start);
    let early_end = clamp_to_end(
        episode.start.checked_add_days(Days::new(EARLY_DAYS)),
        episode.end,
    );
    let improvement_start = episode
        .end
        .checked_sub_days(Days::new(IMPROVEMENT_WINDOW_DAYS))
        .unwrap_or(episode.end)
        .max(episode.start);

    let pre: Vec<&ClinicalNote> = in_window(notes, pre_start, pre_end);
    let early: Vec<&ClinicalNote> = in_window(notes, episode.start, early_end);
    let stay: Vec<&ClinicalNote> = in_window(notes, episode.start, episode.end);
    let late: Vec<&ClinicalNote> = in_window(notes, improvement_start, episode.end);

    let mut around_admission: Vec<&ClinicalNote> = pre.clone();
    around_admission.extend(early.iter().copied());

    let medications_before = extract_medications(&pre);
    let medications_during = extract_medications(&stay);
    let early_medications = extract_medications(&early);
    let medication_changes = medication_changes(
        &medications_during,
        &early_medications,
        &pre,
        &stay,
    );

    let details = AdmissionDetails {
        triggers: extract_rules(&around_admission, patterns::ADMISSION_TRIGGERS),
        complaints: extract_rules(&around_admission, patterns::PRESENTING_COMPLAINTS),
        legal_status: first_rule_match(&around_admission, patterns::LEGAL_STATUS),
        admission_source: first_rule_match(&early, patterns::ADMISSION_SOURCES),
        medications_before,
        medications_during,
        medication_changes,
        incidents: extract_incidents(&stay),
        improvement_factors: extract_improvement(&late),
    };

    debug!(
        label = %episode.label,
        triggers = details.triggers.len(),
        complaints = details.complaints.len(),
        incidents = details.incidents.len(),
        med_changes = details.medication_changes.len(),
        "admission extraction complete"
    );
    details
}

fn clamp_to_end(date: Option<NaiveDate>, end: NaiveDate) -> NaiveDate {
    date.map_or(end, |d| d.min(end))
}

fn in_window(notes: &[ClinicalNote], start: NaiveDate, end: NaiveDate) -> Vec<&ClinicalNote> {
    notes
        .iter()
        .filter(|n| n.date() >= start && n.date() <= end)
        .collect()
}

/// One item per rule label: the first note (in date order) with a surviving
/// match wins.
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

/// First surviving match across all rules, scanning notes in date order and
/// rules in table order within each note.
fn first_rule_match(notes: &[&ClinicalNote], rules: &[PhraseRule]) -> Option<SourcedItem> {
    for note in notes {
        for rule in rules {
            if let Some(m) = first_valid_match(&note.body, rule.phrases, false) {
                return Some(SourcedItem {
                    text: rule.label.to_string(),
                    note_id: note.id.clone(),
                    snippet: snippet(&note.body, &m),
                    date: note.date(),
                });
            }
        }
    }
    None
}

/// All medications mentioned in the window, de-duplicated by name (first
/// mention kept), with the adverse-reaction filter applied.
pub(crate) fn extract_medications(notes: &[&ClinicalNote]) -> Vec<SourcedItem> {
    let mut items: Vec<SourcedItem> = Vec::new();
    for rule in patterns::MEDICATIONS {
        for note in notes {
            if let Some(m) = first_valid_match(&note.body, &medication_phrases(rule), true) {
                items.push(SourcedItem {
                    text: rule.name.to_string(),
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

fn medication_phrases(rule: &MedicationRule) -> Vec<&'static str> {
    let mut phrases = vec![rule.name];
    phrases.extend_from_slice(rule.aliases);
    phrases
}

/// Medications newly introduced during the stay: seen during, absent from
/// the clerking notes, and either carrying explicit start phrasing in the
/// matched sentence or genuinely absent from every pre-admission note.
fn medication_changes(
    during: &[SourcedItem],
    early: &[SourcedItem],
    pre_notes: &[&ClinicalNote],
    stay_notes: &[&ClinicalNote],
) -> Vec<SourcedItem> {
    during
        .iter()
        .filter(|med| !early.iter().any(|e| e.text == med.text))
        .filter(|med| {
            has_start_phrase(stay_notes, &med.text) || !mentioned_anywhere(pre_notes, &med.text)
        })
        .cloned()
        .collect()
}

/// Does any stay note pair the medication with explicit start phrasing in
/// the same sentence?
fn has_start_phrase(notes: &[&ClinicalNote], med_name: &str) -> bool {
    let rule = patterns::MEDICATIONS.iter().find(|r| r.name == med_name);
    let phrases = match rule {
        Some(rule) => medication_phrases(rule),
        None => vec![],
    };
    notes.iter().any(|note| {
        if let Some(m) = first_valid_match(&note.body, &phrases, true) {
            let sentence = note.body[m.sentence.clone()].to_lowercase();
            patterns::MEDICATION_START_PHRASES.iter().any(|p| sentence.contains(p))
        } else {
            false
        }
    })
}

/// Raw mention check, no filters: used for the "true absence" arm of the
/// medication-change rule.
fn mentioned_anywhere(notes: &[&ClinicalNote], med_name: &str) -> bool {
    let rule = patterns::MEDICATIONS.iter().find(|r| r.name == med_name);
    let phrases = match rule {
        Some(rule) => medication_phrases(rule),
        None => vec![],
    };
    notes
        .iter()
        .any(|note| phrases.iter().any(|p| find_ci(&note.body, p, 0).is_some()))
}

/// Notable incidents across the stay: at most one per note per kind,
/// de-duplicated to one per day per kind, priority kinds first (up to 3),
/// filled to 4 with other kinds, final list sorted by date.
fn extract_incidents(notes: &[&ClinicalNote]) -> Vec<IncidentItem> {
    let mut found: Vec<IncidentItem> = Vec::new();
    for rule in patterns::INCIDENTS {
        for note in notes {
            if let Some(m) = first_valid_match(&note.body, rule.phrases, false) {
                found.push(IncidentItem {
                    kind: rule.kind,
                    note_id: note.id.clone(),
                    snippet: snippet(&note.body, &m),
                    date: note.date(),
                });
            }
        }
    }

    // Same-day same-kind collapse, keeping the first.
    found.sort_by_key(|i| (i.date, i.note_id.clone()));
    let mut deduped: Vec<IncidentItem> = Vec::new();
    for item in found {
        if !deduped.iter().any(|d| d.kind == item.kind && d.date == item.date) {
            deduped.push(item);
        }
    }

    let mut selected: Vec<IncidentItem> = deduped
        .iter()
        .filter(|i| i.kind.is_priority())
        .take(MAX_PRIORITY_INCIDENTS)
        .cloned()
        .collect();
    for item in deduped.iter().filter(|i| !i.kind.is_priority()) {
        if selected.len() >= MAX_INCIDENTS {
            break;
        }
        selected.push(item.clone());
    }

    selected.sort_by_key(|i| i.date);
    selected
}

/// Improvement factors from the final 14 days, requiring a generic
/// improvement-context phrase somewhere in the same note.
fn extract_improvement(notes: &[&ClinicalNote]) -> Vec<SourcedItem> {
    let mut items = Vec::new();
    for rule in patterns::IMPROVEMENT_FACTORS {
        for note in notes {
            let has_context = patterns::IMPROVEMENT_CONTEXT
                .iter()
                .any(|p| find_ci(&note.body, p, 0).is_some());
            if !has_context {
                continue;
            }
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
