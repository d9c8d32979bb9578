//! Word-level search for PDF documents.
//!
//! Pages are laid out glyph by glyph through `pdf_extract`'s [`OutputDev`]
//! hook, grouped into words, and each word is tested on its own. A match
//! carries the page number, the page-local line index and the word's top-left
//! corner as a percentage of the page size.

use std::path::{Path, PathBuf};

use pdf_extract::{output_doc, Document, MediaBox, OutputDev, OutputError, Transform};

use crate::error::DapisError;
use crate::pattern::Pattern;
use crate::record::Match;
use crate::traits::{Extractor, Matches};

// ---------------------------------------------------------------------------
// Layout model
// ---------------------------------------------------------------------------

/// A word with its bounding box in top-left-origin page units.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    pub x0:   f64,
    pub y0:   f64,
    pub x1:   f64,
    pub y1:   f64,
    /// Line index within the page, starting at 0.
    pub line: usize,
}

/// One laid-out page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    /// 1-based page number.
    pub number: u32,
    pub width:  f64,
    pub height: f64,
    pub words:  Vec<Word>,
}

// ---------------------------------------------------------------------------
// PdfExtractor
// ---------------------------------------------------------------------------

/// Searches a PDF word by word.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

impl PdfExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Search `path`, reporting `alias` as the match path when given.
    ///
    /// Converted documents use this so results point at the original file
    /// rather than the intermediate PDF.
    pub fn extract_as(
        &self,
        path:    &Path,
        alias:   Option<&Path>,
        pattern: &Pattern,
    ) -> Result<Matches, DapisError> {
        let pages = read_layout(path)?;
        let reported = alias.unwrap_or(path).to_string_lossy().into_owned();
        Ok(Box::new(match_words(&pages, &reported, pattern).into_iter()))
    }
}

impl Extractor for PdfExtractor {
    fn extract(&self, path: &Path, pattern: &Pattern) -> Result<Matches, DapisError> {
        self.extract_as(path, None, pattern)
    }
}

/// Load `path` and lay out every page into words.
pub fn read_layout(path: &Path) -> Result<Vec<PageLayout>, DapisError> {
    let fail = |message: String| DapisError::Pdf {
        path: PathBuf::from(path),
        message,
    };

    let doc = Document::load(path).map_err(|e| fail(e.to_string()))?;
    let mut collector = WordCollector::default();
    output_doc(&doc, &mut collector).map_err(|e| fail(e.to_string()))?;

    Ok(collector.pages)
}

/// Test every word of every page, pages in order then words in reading order.
pub fn match_words(pages: &[PageLayout], path: &str, pattern: &Pattern) -> Vec<Match> {
    let mut out = Vec::new();
    for page in pages {
        for word in &page.words {
            if !pattern.is_match(&word.text) {
                continue;
            }
            out.push(Match {
                query:  pattern.as_str().to_string(),
                path:   path.to_string(),
                sheet:  None,
                line:   Some(word.line.to_string()),
                column: None,
                page:   Some(page.number.to_string()),
                value:  word.text.clone(),
                x_pct:  Some(percent(word.x0, page.width)),
                y_pct:  Some(percent(word.y0, page.height)),
            });
        }
    }
    out
}

/// `100 * offset / extent`, rounded to one decimal place. A degenerate page
/// reports 0.0.
fn percent(offset: f64, extent: f64) -> f64 {
    if extent <= 0.0 {
        return 0.0;
    }
    (offset / extent * 1000.0).round() / 10.0
}

// ---------------------------------------------------------------------------
// Glyph grouping
// ---------------------------------------------------------------------------

/// An [`OutputDev`] that groups positioned glyphs into words and lines.
///
/// A word ends at a whitespace glyph, at a horizontal gap wider than a quarter
/// of the glyph size, or when the baseline moves. A baseline move also starts
/// a new line.
#[derive(Default)]
struct WordCollector {
    pages:    Vec<PageLayout>,
    /// Top-left corner of the current media box, in PDF user space.
    origin:   (f64, f64),
    page:     Option<PageLayout>,
    current:  Option<Word>,
    baseline: Option<f64>,
    last_end: f64,
    line:     usize,
}

impl WordCollector {
    fn flush_word(&mut self) {
        if let (Some(word), Some(page)) = (self.current.take(), self.page.as_mut()) {
            if !word.text.is_empty() {
                page.words.push(word);
            }
        }
    }

    /// Feed one glyph. `x` and `baseline` are in top-left-origin page units,
    /// `advance` is the glyph's horizontal extent and `size` its height.
    fn push_glyph(&mut self, text: &str, x: f64, baseline: f64, advance: f64, size: f64) {
        let new_line = match self.baseline {
            Some(prev) => (baseline - prev).abs() > size * 0.5,
            None       => false,
        };
        if new_line {
            self.flush_word();
            self.line += 1;
        }
        self.baseline = Some(baseline);

        if text.trim().is_empty() {
            self.flush_word();
            self.last_end = x + advance;
            return;
        }

        let gap = x - self.last_end;
        if self.current.is_some() && (gap > size * 0.25 || gap < -size) {
            self.flush_word();
        }

        let top = baseline - size;
        match self.current.as_mut() {
            Some(word) => {
                word.text.push_str(text);
                word.x1 = word.x1.max(x + advance);
                word.y0 = word.y0.min(top);
                word.y1 = word.y1.max(baseline);
            }
            None => {
                self.current = Some(Word {
                    text: text.to_string(),
                    x0:   x,
                    y0:   top,
                    x1:   x + advance,
                    y1:   baseline,
                    line: self.line,
                });
            }
        }
        self.last_end = x + advance;
    }
}

impl OutputDev for WordCollector {
    fn begin_page(
        &mut self,
        page_num:  u32,
        media_box: &MediaBox,
        _art_box:  Option<(f64, f64, f64, f64)>,
    ) -> Result<(), OutputError> {
        self.origin = (media_box.llx, media_box.ury);
        self.page = Some(PageLayout {
            number: page_num,
            width:  media_box.urx - media_box.llx,
            height: media_box.ury - media_box.lly,
            words:  Vec::new(),
        });
        self.current = None;
        self.baseline = None;
        self.last_end = 0.0;
        self.line = 0;
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), OutputError> {
        self.flush_word();
        if let Some(page) = self.page.take() {
            self.pages.push(page);
        }
        Ok(())
    }

    fn output_character(
        &mut self,
        trm:       &Transform,
        width:     f64,
        _spacing:  f64,
        font_size: f64,
        char:      &str,
    ) -> Result<(), OutputError> {
        if self.page.is_none() {
            return Ok(());
        }

        // Glyph size in device space: side of the square with the same area
        // as the transformed font-size box.
        let sx = font_size * (trm.m11 + trm.m21);
        let sy = font_size * (trm.m12 + trm.m22);
        let size = (sx * sy).abs().sqrt();

        let (left, top) = self.origin;
        let x = trm.m31 - left;
        let baseline = top - trm.m32;
        self.push_glyph(char, x, baseline, width * size, size);
        Ok(())
    }

    fn begin_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_line(&mut self) -> Result<(), OutputError> {
        Ok(())
    }
}
