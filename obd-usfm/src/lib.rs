//! # obd-usfm - USFM rendering for Open Bible Data
//!
//! Turns the tokenised marker stream of one Bible book, chapter, section,
//! verse or passage into the html fragments that make up the pages of the
//! Open Bible Data site, with footnotes and cross-references pulled out into
//! numbered lists and every scripture reference turned into a link.
//!
//! ## Quick Start
//!
//! ```rust
//! use obd_usfm::{
//!   BookTable,
//!   Lookups,
//!   MarkerEntry,
//!   NoteCounters,
//!   RefTuple,
//!   RenderOptions,
//!   Renderer,
//!   SectionIndex,
//!   Segment,
//!   SegmentKind,
//! };
//!
//! let books = BookTable::load().unwrap();
//! let sections = SectionIndex::default();
//! let renderer =
//!   Renderer::new(Lookups::new(&books, &sections), RenderOptions::default());
//!
//! let segment = Segment::new(
//!   SegmentKind::Chapter,
//!   "BSB",
//!   RefTuple::chapter("JHN".parse().unwrap(), 3),
//! )
//! .at_level(2);
//! let entries = [
//!   MarkerEntry::with_text("c", "3"),
//!   MarkerEntry::new("p"),
//!   MarkerEntry::with_text("v", "16"),
//!   MarkerEntry::with_text(
//!     "v~",
//!     "For God so loved the world\\f + \\fr 3:16 \\ft Or only\\f*",
//!   ),
//!   MarkerEntry::new("¬p"),
//! ];
//! let mut counters = NoteCounters::default();
//! let unit = renderer.convert(&segment, &entries, &mut counters).unwrap();
//!
//! assert!(unit.html.contains("id=\"C3V16\""));
//! assert!(unit.footnotes_html.contains("id=\"fn1\""));
//! ```
//!
//! ## Features
//!
//! - **Marker dispatch** over a typed [`Marker`] enum, keeping paragraphs,
//!   sections, lists, tables and book containers balanced
//! - **Verse anchors** linking to the parallel-verse or chapter page
//! - **Footnotes and cross-references** numbered across a whole page, with
//!   every reference resolved to the right kind of page
//! - **Reference parsing** of free text such as `1 Sam 16:1–1 Ki 2:11`
//! - **Post-processors** for early English spelling, German glosses, Latin
//!   respelling, the OET literal and readers' versions and SR Greek colouring
//! - **Html checking** of tag balance and nesting
pub mod collaborators;
pub mod customise;
pub mod error;
pub mod html_check;
pub mod language;
pub mod markers;
pub mod notes;
pub mod reference;
pub mod render;
mod types;
pub mod utils;

pub use crate::{
  collaborators::{
    BookLookup,
    BookTable,
    Lookups,
    SectionIndex,
    SectionLookup,
    SectionSpan,
    Versification,
  },
  customise::{customise_oet_lv, customise_oet_rv},
  error::{ReferenceError, TableError, UsfmError, UsfmResult},
  html_check::{check_html, find_html_problem},
  language::{
    LanguageTables,
    WordSubstitutionTable,
    adjust_latin,
    brighten::{Brightened, GreekClass, brighten_sr_gnt},
  },
  markers::Marker,
  notes::{NoteContext, extract_notes},
  reference::{
    LinkMode,
    ReferenceRange,
    VerseRef,
    parse_reference,
    reference_href,
  },
  render::{RenderOptions, Renderer, convert_character_formatting},
  types::{
    BookCode,
    Extra,
    MarkerEntry,
    NoteCounters,
    RefTuple,
    RenderedUnit,
    Segment,
    SegmentKind,
  },
};
