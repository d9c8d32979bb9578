//! Cell-by-cell search for spreadsheet workbooks.

use std::path::Path;

use calamine::{open_workbook_auto, Data, DataType, Range, Reader};

use crate::error::DapisError;
use crate::pattern::Pattern;
use crate::record::Match;
use crate::traits::{Extractor, Matches};

/// Searches every cell of every sheet.
///
/// Cells are read as cached values, never as formulas. Row and column numbers
/// are 1-based and absolute (A1 is row 1, column 1).
///
/// Every sheet is scanned from A1 to the bottom-right corner of its used
/// range. Cells above or left of the used range are tested as empty strings,
/// so a pattern like `^$` also matches them.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpreadsheetExtractor;

impl SpreadsheetExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extractor for SpreadsheetExtractor {
    fn extract(&self, path: &Path, pattern: &Pattern) -> Result<Matches, DapisError> {
        let fail = |e: calamine::Error| DapisError::Spreadsheet {
            path:    path.to_path_buf(),
            message: e.to_string(),
        };

        let mut workbook = open_workbook_auto(path).map_err(fail)?;
        let reported = path.to_string_lossy();

        let mut out = Vec::new();
        for sheet in workbook.sheet_names() {
            let range = workbook.worksheet_range(&sheet).map_err(fail)?;
            out.extend(match_range(&range, &sheet, &reported, pattern));
        }

        Ok(Box::new(out.into_iter()))
    }
}

/// Match every cell of one sheet from A1, rows top-to-bottom then cells
/// left-to-right.
pub(crate) fn match_range(
    range:   &Range<Data>,
    sheet:   &str,
    path:    &str,
    pattern: &Pattern,
) -> Vec<Match> {
    let Some((last_row, last_col)) = range.end() else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for row in 0..=last_row {
        for col in 0..=last_col {
            let value = range.get_value((row, col)).map(cell_text).unwrap_or_default();
            if !pattern.is_match(&value) {
                continue;
            }
            out.push(Match {
                query:  pattern.as_str().to_string(),
                path:   path.to_string(),
                sheet:  Some(sheet.to_string()),
                line:   Some((row as usize + 1).to_string()),
                column: Some((col as usize + 1).to_string()),
                page:   None,
                value,
                x_pct:  None,
                y_pct:  None,
            });
        }
    }
    out
}

/// Render a cell the way a user reading the sheet would expect.
///
/// Numeric cells are stored as floats, so whole values print as integers
/// (`12`, not `12.0`). Empty cells become `""` and are still tested.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty       => String::new(),
        Data::String(s)   => s.clone(),
        Data::Int(i)      => i.to_string(),
        Data::Float(f)    => float_text(*f),
        Data::Bool(true)  => "True".to_string(),
        Data::Bool(false) => "False".to_string(),
        Data::DateTime(_) | Data::DateTimeIso(_) => match cell.as_datetime() {
            Some(dt) => dt.to_string(),
            None     => cell.to_string(),
        },
        Data::DurationIso(s) => s.clone(),
        Data::Error(e)    => e.to_string(),
    }
}

fn float_text(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 {
        (f as i64).to_string()
    } else {
        f.to_string()
    }
}
