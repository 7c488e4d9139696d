//! Markdown coverage analyzer
//!
//! Uses pulldown-cmark to locate headings (and to skip fenced code), then
//! reads `label: value` field lines inside each recognized section.
//!
//! Analysis never fails: anything it cannot pair with an agenda section and
//! field is ignored, so a malformed document simply reports missing fields.

use crate::agenda::{Agenda, FieldPos};
use crate::coverage::{CoverageMap, CoverageStatus, FieldCoverage};
use pulldown_cmark::{Event, Parser as MdParser, Tag, TagEnd};
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

/// Default minimum length (in characters) of a covered value
pub const DEFAULT_MIN_CONTENT_CHARS: usize = 16;

/// Values treated as "nothing written yet"
pub const DEFAULT_PLACEHOLDERS: &[&str] = &[
    "", "tbd", "todo", "none", "n/a", "na", "-", "...", "?", "pending", "placeholder",
];

static FIELD_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*+]\s+)?(?:\*\*|__)?([^:*_\r\n]+?)(?:\*\*|__)?\s*:\s*(?:\*\*|__)?\s*(.*?)\s*$")
        .unwrap()
});

static HEADING_ORDINAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+(?:\.\d+)*[.)]?\s+").unwrap());

/// Heading found in the document body
#[derive(Debug, Clone)]
struct HeadingMark {
    range: Range<usize>,
    level: u8,
    title: String,
}

/// Structural outline of a markdown body
#[derive(Debug, Default)]
struct Outline {
    headings: Vec<HeadingMark>,
    /// Byte ranges whose lines never hold fields (headings, code blocks)
    opaque: Vec<Range<usize>>,
}

/// Coverage analyzer
#[derive(Debug, Clone)]
pub struct CoverageAnalyzer {
    min_content_chars: usize,
    placeholders: Vec<String>,
}

impl CoverageAnalyzer {
    /// Create analyzer with default threshold and placeholders
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With minimum content length
    #[inline]
    #[must_use]
    pub fn with_min_content(mut self, chars: usize) -> Self {
        self.min_content_chars = chars;
        self
    }

    /// With custom placeholder vocabulary (compared case-insensitively)
    #[must_use]
    pub fn with_placeholders<I, S>(mut self, placeholders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.placeholders = placeholders
            .into_iter()
            .map(|p| p.as_ref().trim().to_lowercase())
            .collect();
        self
    }

    /// Minimum content length
    #[inline]
    #[must_use]
    pub fn min_content_chars(&self) -> usize {
        self.min_content_chars
    }

    /// Analyze document text against the agenda
    #[must_use]
    pub fn analyze(&self, text: &str, agenda: &Agenda) -> CoverageMap {
        let body = strip_front_matter(text);
        let outline = Outline::parse(body);

        let mut map = CoverageMap::empty(agenda);
        let mut active: Option<(usize, u8)> = None;
        let mut next_heading = 0;
        let mut offset = 0;

        for line in body.split_inclusive('\n') {
            let start = offset;
            offset += line.len();

            while let Some(heading) = outline.headings.get(next_heading) {
                if heading.range.start >= offset {
                    break;
                }
                active = Self::enter_heading(agenda, active, heading);
                next_heading += 1;
            }

            if outline.opaque.iter().any(|r| r.contains(&start)) {
                continue;
            }
            let Some((section, _)) = active else {
                continue;
            };
            let Some((label, value)) = parse_field_line(line) else {
                continue;
            };
            if let Some(field) = agenda.find_field(section, label) {
                let status = self.classify_value(value);
                map.record(FieldPos::new(section, field), FieldCoverage::new(status, value));
            }
        }

        map
    }

    /// Status of a single raw value
    #[must_use]
    pub fn classify_value(&self, raw: &str) -> CoverageStatus {
        let stripped = strip_decoration(raw);
        let key = stripped.to_lowercase();
        if self.placeholders.iter().any(|p| *p == key) {
            CoverageStatus::Missing
        } else if stripped.chars().count() < self.min_content_chars {
            CoverageStatus::Weak
        } else {
            CoverageStatus::Covered
        }
    }

    /// Apply a heading to the active-section state
    fn enter_heading(
        agenda: &Agenda,
        active: Option<(usize, u8)>,
        heading: &HeadingMark,
    ) -> Option<(usize, u8)> {
        let title = HEADING_ORDINAL.replace(&heading.title, "");
        let title = title.trim().trim_end_matches(':');

        if let Some(section) = agenda.find_section(title) {
            return Some((section, heading.level));
        }
        match active {
            Some((_, level)) if heading.level > level => active,
            _ => None,
        }
    }
}

impl Default for CoverageAnalyzer {
    fn default() -> Self {
        Self {
            min_content_chars: DEFAULT_MIN_CONTENT_CHARS,
            placeholders: DEFAULT_PLACEHOLDERS.iter().map(|p| (*p).to_string()).collect(),
        }
    }
}

/// Analyze with default settings
#[must_use]
pub fn analyze(text: &str, agenda: &Agenda) -> CoverageMap {
    CoverageAnalyzer::default().analyze(text, agenda)
}

impl Outline {
    fn parse(body: &str) -> Self {
        let mut outline = Self::default();
        let mut current: Option<HeadingMark> = None;

        for (event, range) in MdParser::new(body).into_offset_iter() {
            match event {
                Event::Start(Tag::Heading { level, .. }) => {
                    current = Some(HeadingMark {
                        range: range.clone(),
                        level: level as u8,
                        title: String::new(),
                    });
                    outline.opaque.push(range);
                }
                Event::End(TagEnd::Heading(_)) => {
                    if let Some(heading) = current.take() {
                        outline.headings.push(heading);
                    }
                }
                Event::Text(text) | Event::Code(text) => {
                    if let Some(ref mut heading) = current {
                        heading.title.push_str(&text);
                    }
                }
                Event::Start(Tag::CodeBlock(_)) => outline.opaque.push(range),
                _ => {}
            }
        }

        outline
    }
}

/// Split a `label: value` line
fn parse_field_line(line: &str) -> Option<(&str, &str)> {
    let caps = FIELD_LINE.captures(line)?;
    let label = caps.get(1)?.as_str().trim();
    let value = caps.get(2).map_or("", |m| m.as_str());
    if label.is_empty() {
        return None;
    }
    Some((label, value))
}

/// Strip emphasis markers, brackets and trailing periods around a value
fn strip_decoration(raw: &str) -> &str {
    raw.trim()
        .trim_matches(|c: char| matches!(c, '*' | '_' | '`' | '[' | ']' | '(' | ')'))
        .trim()
        .trim_end_matches('.')
        .trim()
}

/// Skip a leading `---` delimited front-matter block
fn strip_front_matter(text: &str) -> &str {
    let mut lines = text.split_inclusive('\n');
    match lines.next() {
        Some(first) if first.trim_end() == "---" => {}
        _ => return text,
    }

    let mut offset = text.split_inclusive('\n').next().map_or(0, str::len);
    for line in lines {
        offset += line.len();
        if line.trim_end() == "---" {
            return &text[offset..];
        }
    }
    text
}
