use serde::{Deserialize, Serialize};

/// One located occurrence of a pattern inside a target.
///
/// Which optional fields are set depends on the source format:
///
/// | Format      | `sheet` | `line`          | `column` | `page` | `x_pct`/`y_pct` |
/// |-------------|---------|-----------------|----------|--------|-----------------|
/// | text        | -       | line number     | -        | -      | -               |
/// | spreadsheet | name    | row number      | column   | -      | -               |
/// | pdf/document| -       | page-local line | -        | page   | position        |
///
/// Positional fields are strings so that rows read back from the result store
/// compare equal to freshly produced matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    /// The pattern text that produced this match.
    pub query: String,

    /// Path of the file the match was found in. For converted documents this
    /// is the original document, not the intermediate PDF.
    pub path: String,

    pub sheet: Option<String>,

    pub line: Option<String>,

    pub column: Option<String>,

    pub page: Option<String>,

    /// The matched line, cell or word.
    pub value: String,

    /// Horizontal position as a percentage of page width, one decimal place.
    #[serde(rename = "x%", default, skip_serializing_if = "Option::is_none")]
    pub x_pct: Option<f64>,

    /// Vertical position as a percentage of page height, one decimal place.
    #[serde(rename = "y%", default, skip_serializing_if = "Option::is_none")]
    pub y_pct: Option<f64>,
}

/// A [`Match`] as persisted in a session's result store.
///
/// The store does not keep page positions, so `x_pct`/`y_pct` are always `None`
/// on `matched`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredMatch {
    /// Store-unique, monotonically increasing row id.
    pub id: i64,

    pub session_id: String,

    #[serde(flatten)]
    pub matched: Match,
}
