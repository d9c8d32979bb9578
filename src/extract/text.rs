//! Line-oriented search for plain text files.

use std::path::Path;

use crate::error::DapisError;
use crate::pattern::Pattern;
use crate::record::Match;
use crate::traits::{Extractor, Matches};

/// Searches a file line by line.
///
/// Bytes that are not valid UTF-8 are dropped, so a stray Latin-1 byte never
/// hides the rest of the file.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextExtractor;

impl TextExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extractor for TextExtractor {
    fn extract(&self, path: &Path, pattern: &Pattern) -> Result<Matches, DapisError> {
        let bytes = std::fs::read(path).map_err(|source| DapisError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        // Universal newlines: "\r\n" and a lone "\r" both end a line.
        let content = decode_dropping_invalid(&bytes)
            .replace("\r\n", "\n")
            .replace('\r', "\n");

        Ok(Box::new(match_lines(&content, path, pattern).into_iter()))
    }
}

/// UTF-8 decode that skips invalid sequences instead of substituting them.
fn decode_dropping_invalid(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text
}

fn match_lines(content: &str, path: &Path, pattern: &Pattern) -> Vec<Match> {
    let reported = path.to_string_lossy();

    // split_terminator: a final "\n" does not open an empty last line.
    content
        .split_terminator('\n')
        .enumerate()
        .filter(|(_, line)| pattern.is_match(line))
        .map(|(i, line)| Match {
            query:  pattern.as_str().to_string(),
            path:   reported.to_string(),
            sheet:  None,
            line:   Some((i + 1).to_string()),
            column: None,
            page:   None,
            value:  line.to_string(),
            x_pct:  None,
            y_pct:  None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_numbers_are_one_based() {
        let p = Pattern::new("needle", false).unwrap();
        let out = match_lines("hay\nneedle\nhay\nhay\nneedle here\n", Path::new("f.txt"), &p);

        let lines: Vec<_> = out.iter().map(|m| m.line.as_deref().unwrap()).collect();
        assert_eq!(lines, vec!["2", "5"]);
        assert_eq!(out[1].value, "needle here");
        assert!(out.iter().all(|m| m.sheet.is_none() && m.column.is_none() && m.page.is_none()));
    }

    #[test]
    fn crlf_files_report_clean_values() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("dos.txt");
        std::fs::write(&file, "one\r\ntwo x\r\nthree\rfour x").unwrap();

        let p = Pattern::new("x", false).unwrap();
        let out: Vec<_> = TextExtractor.extract(&file, &p).unwrap().collect();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].value, "two x");
        assert_eq!(out[1].line.as_deref(), Some("4"));
    }

    #[test]
    fn invalid_utf8_bytes_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("latin1.txt");
        std::fs::write(&file, b"caf\xe9 menu\nplain\n").unwrap();

        let p = Pattern::new("caf menu", false).unwrap();
        let out: Vec<_> = TextExtractor.extract(&file, &p).unwrap().collect();
        assert_eq!(out.len(), 1, "pattern spans the dropped byte");
        assert_eq!(out[0].line.as_deref(), Some("1"));
        assert_eq!(out[0].value, "caf menu");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let p = Pattern::new("x", false).unwrap();
        let err = TextExtractor.extract(Path::new("/no/such/file.txt"), &p).err().unwrap();
        assert!(matches!(err, DapisError::Io { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn last_line_without_newline_is_searched() {
        let p = Pattern::new("tail", false).unwrap();
        let out = match_lines("head\ntail", Path::new("f.txt"), &p);
        assert_eq!(out[0].line.as_deref(), Some("2"));
    }
}
