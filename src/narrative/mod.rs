//! Narrative model: formatted sections of paragraphs whose segments are
//! either plain text or text bound to a source note and highlight snippet,
//! plus the sequential reference numbering over cited notes.

pub(crate) mod compose;
pub mod grammar;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Presentation hint for a segment. Rendering is the presentation layer's
/// job; this core only tags intent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Formatting {
    #[default]
    Normal,
    Heading,
    Emphasis,
}

/// A citation: the note a claim came from and the verbatim snippet to
/// highlight in it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NoteReference {
    pub note_id: String,
    pub highlight: String,
}

/// One run of text in a paragraph: plain, or referenced back to a note.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NarrativeSegment {
    Plain {
        text: String,
        formatting: Formatting,
    },
    Referenced {
        text: String,
        reference: NoteReference,
        formatting: Formatting,
    },
}

impl NarrativeSegment {
    pub fn text(&self) -> &str {
        match self {
            NarrativeSegment::Plain { text, .. } => text,
            NarrativeSegment::Referenced { text, .. } => text,
        }
    }

    pub fn reference(&self) -> Option<&NoteReference> {
        match self {
            NarrativeSegment::Plain { .. } => None,
            NarrativeSegment::Referenced { reference, .. } => Some(reference),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NarrativeParagraph {
    pub segments: Vec<NarrativeSegment>,
}

impl NarrativeParagraph {
    /// Concatenated text of all segments.
    pub fn full_text(&self) -> String {
        self.segments.iter().map(|s| s.text()).collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NarrativeSection {
    pub title: Option<String>,
    pub paragraphs: Vec<NarrativeParagraph>,
}

/// Sequential reference numbers for cited notes: the first time a note id
/// appears in a referenced segment (walking sections, paragraphs, and
/// segments in emission order) it gets the next integer, starting at 1.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(from = "ReferenceMapWire")]
pub struct ReferenceMap {
    /// Note ids in first-occurrence order; index + 1 is the number.
    order: Vec<String>,
    #[serde(skip)]
    numbers: HashMap<String, u32>,
}

/// Serialized form: only the order is stored, the lookup table is derived.
#[derive(Deserialize)]
struct ReferenceMapWire {
    order: Vec<String>,
}

impl From<ReferenceMapWire> for ReferenceMap {
    fn from(wire: ReferenceMapWire) -> Self {
        let numbers = wire
            .order
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i as u32 + 1))
            .collect();
        ReferenceMap { order: wire.order, numbers }
    }
}

impl ReferenceMap {
    /// Build the numbering by walking the sections in emission order.
    pub fn from_sections(sections: &[NarrativeSection]) -> Self {
        let mut map = ReferenceMap::default();
        for section in sections {
            for paragraph in &section.paragraphs {
                for segment in &paragraph.segments {
                    if let Some(reference) = segment.reference() {
                        map.assign(&reference.note_id);
                    }
                }
            }
        }
        map
    }

    fn assign(&mut self, note_id: &str) {
        if !self.numbers.contains_key(note_id) {
            self.order.push(note_id.to_string());
            self.numbers
                .insert(note_id.to_string(), self.order.len() as u32);
        }
    }

    pub fn number_for(&self, note_id: &str) -> Option<u32> {
        self.numbers.get(note_id).copied()
    }

    /// Note ids in numbering order (number 1 first).
    pub fn cited_ids(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
