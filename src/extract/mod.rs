//! Format-specific extraction handlers.

pub mod document;
pub mod pdf;
pub mod spreadsheet;
pub mod text;

pub use document::DocumentExtractor;
pub use pdf::PdfExtractor;
pub use spreadsheet::SpreadsheetExtractor;
pub use text::TextExtractor;
