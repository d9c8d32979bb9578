//! Office documents, searched through a PDF rendering.

use std::path::Path;
use std::sync::Arc;

use crate::error::DapisError;
use crate::extract::pdf::PdfExtractor;
use crate::pattern::Pattern;
use crate::traits::{Converter, Extractor, Matches};

/// Converts a document to PDF, then searches the PDF.
///
/// Every match reports the original document path, never the intermediate
/// PDF. A conversion failure is returned like any other extraction error.
pub struct DocumentExtractor {
    converter: Arc<dyn Converter>,
    pdf:       PdfExtractor,
}

impl DocumentExtractor {
    pub fn new(converter: Arc<dyn Converter>) -> Self {
        Self {
            converter,
            pdf: PdfExtractor::new(),
        }
    }
}

impl Extractor for DocumentExtractor {
    fn extract(&self, path: &Path, pattern: &Pattern) -> Result<Matches, DapisError> {
        let rendered = self.converter.convert_to_pdf(path)?;
        self.pdf.extract_as(&rendered, Some(path), pattern)
    }
}
