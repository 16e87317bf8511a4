//! All phrase tables for structured extraction, as compiled-in constant
//! data.
//!
//! The negation, historicity, and adverse-reaction lists were tuned against
//! real clinical phrasing; keep them literal rather than generalizing --
//! subtle rewording changes clinical meaning. All phrases are lowercase
//! (matching is case-insensitive against the note body).

use crate::models::IncidentKind;

/// A named extraction rule: any of `phrases` in a note body produces an
/// item labelled `label`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PhraseRule {
    pub label: &'static str,
    pub phrases: &'static [&'static str],
}

/// A medication and the trade names it appears under in notes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MedicationRule {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
}

/// A notable-incident rule with its category.
#[derive(Debug, Clone, Copy)]
pub(crate) struct IncidentRule {
    pub kind: IncidentKind,
    pub phrases: &'static [&'static str],
}

/// Negation cues checked in the text immediately before a match.
pub(crate) const NEGATION_PREFIXES: &[&str] = &[
    "no ",
    "not ",
    "nil ",
    "denies ",
    "denied ",
    "without ",
    "no evidence of ",
    "no sign of ",
    "no signs of ",
    "no need for ",
    "no further ",
    "no thoughts of ",
];

/// Negation cues checked anywhere in the enclosing sentence
/// (e.g. "did not want to be secluded", "refused seclusion").
pub(crate) const NEGATION_SENTENCE_CUES: &[&str] = &[
    "denied",
    "denies",
    "did not want",
    "did not require",
    "does not require",
    "no need for",
    "no evidence of",
    "no thoughts of",
    "refused",
    "declined",
    "not required",
    "was not",
    "were not",
    "never been",
];

/// Backward-reference markers: a sentence carrying one of these describes
/// history or context, not a current event.
pub(crate) const HISTORY_MARKERS: &[&str] = &[
    "history of",
    "h/o",
    "years ago",
    "months ago",
    "prior to",
    "previously",
    "in the past",
    "last admission",
    "previous admission",
    "when in seclusion",
    "known history",
    "longstanding",
];

/// Adverse-reaction context for medication matches; a medication named in
/// one of these sentences is not a medication the patient is taking.
pub(crate) const ADVERSE_REACTION_MARKERS: &[&str] = &[
    "allergic to",
    "allergy",
    "cannot tolerate",
    "could not tolerate",
    "unable to tolerate",
    "intolerant",
    "adverse reaction",
    "sensitivity to",
    "side effects from",
    "stopped due to",
];

/// Explicit start-of-treatment phrasing used to confirm a medication change.
pub(crate) const MEDICATION_START_PHRASES: &[&str] =
    &["commenced", "started", "titrat", "initiated", "switched to"];

/// Phrases identifying an admission clerking note, searched in the 14-day
/// evidence window at the start of an inpatient episode.
pub(crate) const ADMISSION_INDICATORS: &[&str] = &[
    "admitted to the ward",
    "admitted to",
    "admission to",
    "was admitted",
    "clerked",
    "clerking",
    "admission assessment",
    "nursing admission",
    "accepted onto the ward",
    "detained under",
];

/// What led to the admission.
pub(crate) const ADMISSION_TRIGGERS: &[PhraseRule] = &[
    PhraseRule {
        label: "non-compliance with medication",
        phrases: &[
            "non-compliance",
            "non compliant",
            "non-compliant",
            "not taking medication",
            "stopped taking",
            "non-adherence",
        ],
    },
    PhraseRule {
        label: "relapse",
        phrases: &["relapse", "relapsing", "deterioration in mental state", "deteriorated"],
    },
    PhraseRule {
        label: "police involvement",
        phrases: &["police"],
    },
    PhraseRule {
        label: "overdose",
        phrases: &["overdose", "took an od"],
    },
    PhraseRule {
        label: "self-harm",
        phrases: &["self-harm", "self harm", "lacerations"],
    },
    PhraseRule {
        label: "suicidal ideation",
        phrases: &["suicidal", "suicide attempt", "end his life", "end her life", "end their life"],
    },
    PhraseRule {
        label: "aggression",
        phrases: &["aggressive", "aggression", "threatening behaviour"],
    },
];

/// Presenting complaints around admission.
pub(crate) const PRESENTING_COMPLAINTS: &[PhraseRule] = &[
    PhraseRule {
        label: "low mood",
        phrases: &["low mood", "low in mood", "depressed mood", "tearful"],
    },
    PhraseRule {
        label: "psychotic symptoms",
        phrases: &[
            "psychotic",
            "hallucination",
            "hearing voices",
            "responding to unseen stimuli",
            "delusion",
            "paranoid",
            "thought disorder",
        ],
    },
    PhraseRule {
        label: "elevated mood",
        phrases: &["elevated mood", "manic", "pressure of speech", "grandiose"],
    },
    PhraseRule {
        label: "agitation",
        phrases: &["agitated", "agitation"],
    },
    PhraseRule {
        label: "confusion",
        phrases: &["confused", "disorientated"],
    },
    PhraseRule {
        label: "anxiety",
        phrases: &["anxious", "panic attack"],
    },
];

/// Legal status at admission. Order matters: the more specific section
/// phrasing sits above the generic Mental Health Act phrasing.
pub(crate) const LEGAL_STATUS: &[PhraseRule] = &[
    PhraseRule {
        label: "detained under Section 136",
        phrases: &["section 136", "136 suite"],
    },
    PhraseRule {
        label: "detained under Section 2",
        phrases: &["section 2"],
    },
    PhraseRule {
        label: "detained under Section 3",
        phrases: &["section 3"],
    },
    PhraseRule {
        label: "detained under the Mental Health Act",
        phrases: &["detained under the mental health act", "mha assessment"],
    },
    PhraseRule {
        label: "informal admission",
        phrases: &["informal", "voluntary admission"],
    },
];

/// Where the patient was admitted from.
pub(crate) const ADMISSION_SOURCES: &[PhraseRule] = &[
    PhraseRule {
        label: "via A&E",
        phrases: &["a&e", "accident and emergency", "emergency department"],
    },
    PhraseRule {
        label: "via the police",
        phrases: &["brought in by police", "police custody", "136 suite"],
    },
    PhraseRule {
        label: "transferred from another ward",
        phrases: &["transferred from"],
    },
    PhraseRule {
        label: "referred by the crisis team",
        phrases: &["crisis team", "home treatment team"],
    },
    PhraseRule {
        label: "from home",
        phrases: &["from home", "from the community"],
    },
];

/// Medication names and trade-name aliases seen in UK mental health notes.
pub(crate) const MEDICATIONS: &[MedicationRule] = &[
    MedicationRule { name: "olanzapine", aliases: &["zyprexa"] },
    MedicationRule { name: "risperidone", aliases: &["risperdal"] },
    MedicationRule { name: "quetiapine", aliases: &["seroquel"] },
    MedicationRule { name: "clozapine", aliases: &["clozaril"] },
    MedicationRule { name: "aripiprazole", aliases: &["abilify"] },
    MedicationRule { name: "haloperidol", aliases: &["haldol", "serenace"] },
    MedicationRule { name: "zuclopenthixol", aliases: &["clopixol"] },
    MedicationRule { name: "flupentixol", aliases: &["depixol"] },
    MedicationRule { name: "lithium", aliases: &["priadel", "camcolit"] },
    MedicationRule { name: "sodium valproate", aliases: &["valproate", "depakote", "epilim"] },
    MedicationRule { name: "lamotrigine", aliases: &["lamictal"] },
    MedicationRule { name: "sertraline", aliases: &["lustral"] },
    MedicationRule { name: "fluoxetine", aliases: &["prozac"] },
    MedicationRule { name: "citalopram", aliases: &["cipramil"] },
    MedicationRule { name: "mirtazapine", aliases: &["zispin"] },
    MedicationRule { name: "venlafaxine", aliases: &["efexor"] },
    MedicationRule { name: "diazepam", aliases: &["valium"] },
    MedicationRule { name: "lorazepam", aliases: &["ativan"] },
    MedicationRule { name: "promethazine", aliases: &["phenergan"] },
    MedicationRule { name: "procyclidine", aliases: &["kemadrin"] },
];

/// Notable ward incidents.
pub(crate) const INCIDENTS: &[IncidentRule] = &[
    IncidentRule {
        kind: IncidentKind::Seclusion,
        phrases: &["seclusion", "secluded"],
    },
    IncidentRule {
        kind: IncidentKind::ResponseTeam,
        phrases: &[
            "response team",
            "rapid tranquilisation",
            "rapid tranquillisation",
            "emergency team called",
        ],
    },
    IncidentRule {
        kind: IncidentKind::Restraint,
        phrases: &["restrained", "restraint", "physical intervention"],
    },
    IncidentRule {
        kind: IncidentKind::SelfHarm,
        phrases: &["self-harm", "self harm", "ligature", "superficial cuts"],
    },
    IncidentRule {
        kind: IncidentKind::Assault,
        phrases: &["assaulted", "assault on", "punched", "struck out at"],
    },
    IncidentRule {
        kind: IncidentKind::Absconding,
        phrases: &["absconded", "awol", "failed to return from leave"],
    },
];

/// Improvement factors, scanned only in the final 14 days before discharge.
pub(crate) const IMPROVEMENT_FACTORS: &[PhraseRule] = &[
    PhraseRule {
        label: "improved mental state",
        phrases: &[
            "mental state settled",
            "settled on the ward",
            "much brighter",
            "brighter in mood",
            "improvement in mental state",
        ],
    },
    PhraseRule {
        label: "engagement with treatment",
        phrases: &[
            "engaging well",
            "compliant with medication",
            "accepting medication",
            "attending groups",
        ],
    },
    PhraseRule {
        label: "reduced risk",
        phrases: &["no further incidents", "risk reduced", "de-escalated", "risks reduced"],
    },
];

/// Generic improvement context; an improvement factor only counts when one
/// of these also appears somewhere in the same note.
pub(crate) const IMPROVEMENT_CONTEXT: &[&str] =
    &["improve", "progress", "settled", "better", "recovery"];

/// Community engagement activity (therapy, clinics, social).
pub(crate) const COMMUNITY_ENGAGEMENT: &[PhraseRule] = &[
    PhraseRule {
        label: "attending therapy",
        phrases: &["cbt", "therapy session", "psychology session", "psychotherapy"],
    },
    PhraseRule {
        label: "clinic attendance",
        phrases: &["depot clinic", "outpatient appointment", "attended clinic", "seen in clinic"],
    },
    PhraseRule {
        label: "social engagement",
        phrases: &["day centre", "support group", "voluntary work", "attending college"],
    },
];

/// Community crisis events.
pub(crate) const COMMUNITY_CRISES: &[PhraseRule] = &[
    PhraseRule {
        label: "crisis team contact",
        phrases: &["crisis team", "crisis line", "out of hours contact"],
    },
    PhraseRule {
        label: "A&E presentation",
        phrases: &["a&e", "emergency department"],
    },
    PhraseRule {
        label: "overdose",
        phrases: &["overdose"],
    },
    PhraseRule {
        label: "self-harm",
        phrases: &["self-harm", "self harm"],
    },
];

/// Community concern flags (early-warning signs).
pub(crate) const COMMUNITY_CONCERNS: &[PhraseRule] = &[
    PhraseRule {
        label: "disengagement from services",
        phrases: &["dna", "did not attend", "not answering the door", "failed to attend"],
    },
    PhraseRule {
        label: "non-compliance with medication",
        phrases: &["not taking medication", "stopped medication", "non-compliant", "non compliant"],
    },
    PhraseRule {
        label: "relapse indicators",
        phrases: &["deteriorat", "relapse", "unkempt", "voices returned"],
    },
];
