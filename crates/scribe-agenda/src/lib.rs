//! Scribe Agenda
//!
//! The fixed agenda a document is written against, and the analyzer that
//! measures how much of it a markdown document already covers.
//!
//! # Core Concepts
//!
//! - [`Agenda`]: Ordered sections, each with ordered field labels
//! - [`FieldPos`]: `(section, field)` address of one agenda field
//! - [`CoverageAnalyzer`]: Markdown → [`CoverageMap`], never fails
//! - [`CoverageStatus`]: `missing`, `weak` or `covered`
//!
//! # Example
//!
//! ```rust
//! use scribe_agenda::{analyze, Agenda, CoverageStatus, FieldPos};
//!
//! let doc = "## Objectives\n- **Objectives:** Reduce onboarding time by 30%\n";
//! let map = analyze(doc, &Agenda::prd());
//! assert_eq!(map.status(FieldPos::new(1, 0)), CoverageStatus::Covered);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod agenda;
mod analyzer;
mod coverage;

pub use agenda::{Agenda, AgendaError, FieldPos, Section};
pub use analyzer::{analyze, CoverageAnalyzer, DEFAULT_MIN_CONTENT_CHARS, DEFAULT_PLACEHOLDERS};
pub use coverage::{CoverageCounts, CoverageMap, CoverageStatus, FieldCoverage, FieldReport};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
