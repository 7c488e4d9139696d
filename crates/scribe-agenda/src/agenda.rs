//! Agenda model
//!
//! The agenda is the fixed, ordered list of sections and fields a document
//! must eventually cover. It is configuration, not session state: every
//! session of a running system shares the same agenda.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Position of a field within the agenda
///
/// Serialized with the `sectionIndex` / `fieldIndex` names used on the
/// adapter wire protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct FieldPos {
    /// Section index
    #[serde(rename = "sectionIndex")]
    pub section: usize,
    /// Field index within the section
    #[serde(rename = "fieldIndex")]
    pub field: usize,
}

impl FieldPos {
    /// Create new position
    #[inline]
    #[must_use]
    pub const fn new(section: usize, field: usize) -> Self {
        Self { section, field }
    }
}

impl Display for FieldPos {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.section, self.field)
    }
}

/// One agenda section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Section name, matched against document headings
    pub name: String,
    /// Ordered field labels, matched against `label: value` lines
    pub fields: Vec<String>,
}

impl Section {
    /// Create new section
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

/// Errors raised when building an agenda
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AgendaError {
    /// No sections at all
    #[error("agenda has no sections")]
    Empty,

    /// Section declared without fields
    #[error("section '{0}' has no fields")]
    EmptySection(String),

    /// Blank section or field name
    #[error("blank name in section {section}")]
    BlankName {
        /// Index of the offending section
        section: usize,
    },

    /// Two sections resolve to the same heading
    #[error("duplicate section name: '{0}'")]
    DuplicateSection(String),

    /// Two fields of one section resolve to the same label
    #[error("duplicate field '{field}' in section '{section}'")]
    DuplicateField {
        /// Section holding the duplicate
        section: String,
        /// Repeated field label
        field: String,
    },
}

/// Ordered, validated agenda
///
/// Deserializes from a plain list of sections and rejects invalid shapes
/// at load time, so every other component can index it freely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Section>", into = "Vec<Section>")]
pub struct Agenda {
    sections: Vec<Section>,
}

impl Agenda {
    /// Create validated agenda
    ///
    /// # Errors
    /// Returns error if the agenda is empty, a section has no fields, a
    /// name is blank, or two names collide after normalization.
    pub fn new(sections: Vec<Section>) -> Result<Self, AgendaError> {
        if sections.is_empty() {
            return Err(AgendaError::Empty);
        }

        let mut seen_sections = Vec::with_capacity(sections.len());
        for (idx, section) in sections.iter().enumerate() {
            let key = label_key(&section.name);
            if key.is_empty() {
                return Err(AgendaError::BlankName { section: idx });
            }
            if seen_sections.contains(&key) {
                return Err(AgendaError::DuplicateSection(section.name.clone()));
            }
            seen_sections.push(key);

            if section.fields.is_empty() {
                return Err(AgendaError::EmptySection(section.name.clone()));
            }
            let mut seen_fields = Vec::with_capacity(section.fields.len());
            for field in &section.fields {
                let field_key = label_key(field);
                if field_key.is_empty() {
                    return Err(AgendaError::BlankName { section: idx });
                }
                if seen_fields.contains(&field_key) {
                    return Err(AgendaError::DuplicateField {
                        section: section.name.clone(),
                        field: field.clone(),
                    });
                }
                seen_fields.push(field_key);
            }
        }

        Ok(Self { sections })
    }

    /// Default product-requirements agenda
    #[must_use]
    pub fn prd() -> Self {
        Self {
            sections: vec![
                Section::new("Overview", ["Summary", "Problem", "Target Users"]),
                Section::new("Objectives", ["Objectives", "Success Metrics"]),
                Section::new("Requirements", ["Functional", "Non-Functional"]),
                Section::new("Scope", ["In Scope", "Out of Scope"]),
                Section::new("Risks", ["Risks", "Assumptions"]),
            ],
        }
    }

    /// All sections in order
    #[inline]
    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Section by index
    #[inline]
    #[must_use]
    pub fn section(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }

    /// Label of the field at `pos`
    #[must_use]
    pub fn field_label(&self, pos: FieldPos) -> Option<&str> {
        self.sections
            .get(pos.section)
            .and_then(|s| s.fields.get(pos.field))
            .map(String::as_str)
    }

    /// Check whether `pos` addresses a field of this agenda
    #[inline]
    #[must_use]
    pub fn contains(&self, pos: FieldPos) -> bool {
        self.field_label(pos).is_some()
    }

    /// Number of fields per section, in order
    #[must_use]
    pub fn shape(&self) -> Vec<usize> {
        self.sections.iter().map(|s| s.fields.len()).collect()
    }

    /// Total number of fields
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.sections.iter().map(|s| s.fields.len()).sum()
    }

    /// Every field position in agenda order
    pub fn positions(&self) -> impl Iterator<Item = FieldPos> + '_ {
        self.sections.iter().enumerate().flat_map(|(section, s)| {
            (0..s.fields.len()).map(move |field| FieldPos::new(section, field))
        })
    }

    /// Find section by heading text
    #[must_use]
    pub fn find_section(&self, heading: &str) -> Option<usize> {
        let key = label_key(heading);
        self.sections.iter().position(|s| label_key(&s.name) == key)
    }

    /// Find field within a section by label
    #[must_use]
    pub fn find_field(&self, section: usize, label: &str) -> Option<usize> {
        let key = label_key(label);
        self.sections
            .get(section)?
            .fields
            .iter()
            .position(|f| label_key(f) == key)
    }
}

impl Default for Agenda {
    fn default() -> Self {
        Self::prd()
    }
}

impl TryFrom<Vec<Section>> for Agenda {
    type Error = AgendaError;

    fn try_from(sections: Vec<Section>) -> Result<Self, Self::Error> {
        Self::new(sections)
    }
}

impl From<Agenda> for Vec<Section> {
    fn from(agenda: Agenda) -> Self {
        agenda.sections
    }
}

/// Iterate positions for a section shape (field counts per section)
pub(crate) fn positions_of(shape: &[usize]) -> impl Iterator<Item = FieldPos> + '_ {
    shape
        .iter()
        .enumerate()
        .flat_map(|(section, &count)| (0..count).map(move |field| FieldPos::new(section, field)))
}

/// Comparison key for headings and labels: lowercase, single-spaced
pub(crate) fn label_key(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
