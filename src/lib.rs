//! # dapis
//!
//! Parallel regex search across text, spreadsheet, PDF and office documents.
//!
//! A caller submits a *session* (an id plus an ordered list of file paths)
//! and then runs ad-hoc regex queries against it. Every query scans the files
//! fresh: each target is classified by extension, handed to its format's
//! [`Extractor`] on a fixed worker pool, and the matches come back in
//! submission order with format-specific location data (line, row/column and
//! sheet, or page with on-page position). Every match is also appended to the
//! session's durable result store.
//!
//! dapis owns the dispatch engine, the extractors, and the result store. It
//! does **not** own the transport: HTTP endpoints, session-id generation and
//! clients belong to the caller.
//!
//! # Quick Start
//!
//! ```rust
//! # fn main() -> Result<(), dapis::DapisError> {
//! let dir = tempfile::tempdir().unwrap();
//! let notes = dir.path().join("notes.txt");
//! std::fs::write(&notes, "alpha\ninvoice 1042\nomega\n").unwrap();
//!
//! let searcher = dapis::searcher()
//!     .results_dir(dir.path().join("results"))
//!     .build()?;
//!
//! searcher.submit("session-1", vec![notes]);
//! let results = searcher.query("session-1", r"invoice \d+", false)?;
//!
//! assert_eq!(results.matches.len(), 1);
//! assert_eq!(results.matches[0].line.as_deref(), Some("2"));
//! assert_eq!(searcher.stored_count("session-1")?, 1);
//! # Ok(())
//! # }
//! ```
//!
//! # Custom Formats
//!
//! Implement [`Extractor`] to search something dapis does not understand:
//!
//! ```rust
//! use std::path::Path;
//! use dapis::{DapisError, Extractor, Match, Matches, Pattern};
//!
//! /// Treats the whole file name as the searchable text.
//! struct FileNameExtractor;
//!
//! impl Extractor for FileNameExtractor {
//!     fn extract(&self, path: &Path, pattern: &Pattern) -> Result<Matches, DapisError> {
//!         let name = path.file_name().unwrap_or_default().to_string_lossy().into_owned();
//!         let hit = pattern.is_match(&name).then(|| Match {
//!             query:  pattern.as_str().to_string(),
//!             path:   path.to_string_lossy().into_owned(),
//!             sheet:  None,
//!             line:   None,
//!             column: None,
//!             page:   None,
//!             value:  name,
//!             x_pct:  None,
//!             y_pct:  None,
//!         });
//!         Ok(Box::new(hit.into_iter()))
//!     }
//! }
//! ```
//!
//! Register it with
//! [`SearcherBuilder::extractor`]`(Format::Unsupported, FileNameExtractor)`.

#![forbid(unsafe_code)]

pub mod extract;

mod builder;
mod config;
mod convert;
mod engine;
mod error;
mod format;
mod pattern;
mod record;
mod results;
mod session;
mod store;
mod traits;

// ── Public re-exports ─────────────────────────────────────────────────────────

pub use builder::{Searcher, SearcherBuilder};
pub use config::Config;
pub use convert::OfficeConverter;
pub use error::DapisError;
pub use format::Format;
pub use pattern::Pattern;
pub use record::{Match, StoredMatch};
pub use results::{QueryResults, QueryStats, TargetReport, PROGRAM, VERSION};
pub use session::{display_targets, MemoryRegistry};
pub use store::ResultStore;
pub use traits::{Converter, Extractor, Matches, SessionRegistry};

// ── Entry point ───────────────────────────────────────────────────────────────

/// Create a new [`SearcherBuilder`] to configure a [`Searcher`].
pub fn searcher() -> SearcherBuilder {
    SearcherBuilder::default()
}
