use std::fmt;
use std::path::Path;

use serde::Serialize;

/// The content format of a target, derived from its file extension.
///
/// Classification is purely name-based: the file is never opened here, so a
/// missing or unreadable file still classifies and fails later in its handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    /// Plain text, Python source, Markdown and CSV.
    Text,

    /// Modern and legacy spreadsheet workbooks.
    Spreadsheet,

    /// PDF documents.
    Pdf,

    /// Word-processor and presentation files, searched through a PDF rendering.
    Document,

    /// Anything else. Yields no matches and no error.
    Unsupported,
}

impl Format {
    /// Classify `path` by its extension, ignoring case.
    pub fn classify(path: &Path) -> Self {
        let ext = match path.extension().and_then(|e| e.to_str()) {
            Some(e) => e.to_ascii_lowercase(),
            None    => return Self::Unsupported,
        };

        match ext.as_str() {
            "txt" | "py" | "md" | "csv"              => Self::Text,
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Self::Spreadsheet,
            "pdf"                                    => Self::Pdf,
            "docx" | "doc" | "pptx" | "ppt" | "odt" | "odp" => Self::Document,
            _                                        => Self::Unsupported,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text        => "text",
            Self::Spreadsheet => "spreadsheet",
            Self::Pdf         => "pdf",
            Self::Document    => "document",
            Self::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}
