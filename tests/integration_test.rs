use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dapis::{
    searcher, Converter, DapisError, Extractor, Format, Match, Matches, MemoryRegistry, Pattern,
    Searcher, SessionRegistry,
};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Create a temporary directory of search targets.
///
/// Structure:
/// ```
/// tmp/
///   invoices.txt     "invoice" on lines 2 and 5
///   notes.md         "Invoice" (capitalized) on line 1
///   image.png        unsupported
///   results/         result store root (created lazily)
/// ```
fn setup_test_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    fs::write(
        root.join("invoices.txt"),
        "header\ninvoice 1001\nnothing\nstill nothing\ninvoice 1002\n",
    )
    .unwrap();
    fs::write(root.join("notes.md"), "Invoice totals\nmisc\n").unwrap();
    fs::write(root.join("image.png"), [0x89, b'P', b'N', b'G']).unwrap();

    dir
}

/// Route `tracing` output through the test harness. Set `RUST_LOG=dapis=debug`
/// to see dispatch and store events.
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn build(dir: &Path) -> Searcher {
    init_logging();
    searcher()
        .results_dir(dir.join("results"))
        .build()
        .unwrap()
}

/// Write a one-font PDF. Each page is 200x100 points; each entry draws `text`
/// with its baseline origin at (x, y) in PDF user space.
fn pdf_bytes(pages: &[&[(f64, f64, &str)]]) -> Vec<u8> {
    let mut objects: Vec<String> = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            (0..pages.len()).map(|i| format!("{} 0 R", 4 + 2 * i)).collect::<Vec<_>>().join(" "),
            pages.len()
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>".to_string(),
    ];

    for (i, page) in pages.iter().enumerate() {
        let content: String = page
            .iter()
            .map(|(x, y, text)| format!("BT /F1 24 Tf {x} {y} Td ({text}) Tj ET\n"))
            .collect();
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 200 100] \
             /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
            5 + 2 * i
        ));
        objects.push(format!("<< /Length {} >>\nstream\n{content}endstream", content.len()));
    }

    let mut out = String::from("%PDF-1.4\n");
    let mut offsets = Vec::new();
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.push_str(&format!("{} 0 obj\n{body}\nendobj\n", i + 1));
    }

    let xref = out.len();
    out.push_str(&format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1));
    for off in offsets {
        out.push_str(&format!("{off:010} 00000 n \n"));
    }
    out.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n",
        objects.len() + 1
    ));
    out.into_bytes()
}

/// Pretends to convert a document by writing a fixed PDF next to it.
struct FakeConverter {
    pdf:   Vec<u8>,
    calls: Arc<AtomicUsize>,
}

impl Converter for FakeConverter {
    fn convert_to_pdf(&self, input: &Path) -> Result<PathBuf, DapisError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let out = input.with_extension("rendered.pdf");
        fs::write(&out, &self.pdf).map_err(|source| DapisError::Io { path: out.clone(), source })?;
        Ok(out)
    }
}

struct BrokenConverter;

impl Converter for BrokenConverter {
    fn convert_to_pdf(&self, input: &Path) -> Result<PathBuf, DapisError> {
        Err(DapisError::Conversion {
            path:    input.to_path_buf(),
            message: "office suite not installed".into(),
        })
    }
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

#[test]
fn text_matches_report_line_numbers() {
    let dir = setup_test_dir();
    let s = build(dir.path());
    s.submit("s1", vec![dir.path().join("invoices.txt")]);

    let results = s.query("s1", "invoice", false).unwrap();

    let lines: Vec<_> = results.matches.iter().map(|m| m.line.as_deref().unwrap()).collect();
    assert_eq!(lines, vec!["2", "5"], "should match lines 2 and 5 only");
    assert!(results
        .matches
        .iter()
        .all(|m| m.sheet.is_none() && m.column.is_none() && m.page.is_none()));
    assert_eq!(results.matches[0].value, "invoice 1001");
    assert_eq!(results.matches[0].query, "invoice");
}

#[test]
fn case_insensitive_flag_is_honoured() {
    let dir = setup_test_dir();
    let s = build(dir.path());
    s.submit("s1", vec![dir.path().join("notes.md")]);

    assert!(s.query("s1", "invoice", false).unwrap().matches.is_empty());
    assert_eq!(s.query("s1", "invoice", true).unwrap().matches.len(), 1);
}

// ---------------------------------------------------------------------------
// Dispatch and aggregation
// ---------------------------------------------------------------------------

#[test]
fn unsupported_targets_yield_nothing_without_error() {
    let dir = setup_test_dir();
    let s = build(dir.path());
    s.submit("s1", vec![dir.path().join("image.png")]);

    let results = s.query("s1", ".*", false).unwrap();
    assert!(results.matches.is_empty());
    assert_eq!(results.targets[0].format, Format::Unsupported);
    assert!(results.targets[0].error.is_none());
}

#[test]
fn results_follow_submission_order() {
    let dir = tempfile::tempdir().unwrap();
    let paths: Vec<PathBuf> = (0..24)
        .map(|i| {
            let p = dir.path().join(format!("f{i:02}.txt"));
            // Larger files first so early targets tend to finish last.
            let filler = "x\n".repeat((24 - i) * 2000);
            fs::write(&p, format!("{filler}hit {i}\n")).unwrap();
            p
        })
        .collect();

    for threads in [1, 8] {
        let s = searcher()
            .results_dir(dir.path().join(format!("results-{threads}")))
            .threads(threads)
            .build()
            .unwrap();
        s.submit("order", paths.clone());

        let results = s.query("order", "^hit", false).unwrap();
        let values: Vec<_> = results.matches.iter().map(|m| m.value.clone()).collect();
        let expected: Vec<_> = (0..24).map(|i| format!("hit {i}")).collect();
        assert_eq!(values, expected, "order must not depend on {threads} workers");
    }
}

#[test]
fn failing_target_does_not_fail_the_query() {
    let dir = setup_test_dir();
    let s = build(dir.path());
    s.submit(
        "s1",
        vec![dir.path().join("missing.txt"), dir.path().join("invoices.txt")],
    );

    let results = s.query("s1", "invoice", false).unwrap();

    assert_eq!(results.matches.len(), 2, "healthy target still matches");
    assert!(results.targets[0].error.is_some(), "missing file is reported");
    assert_eq!(results.targets[1].matches, 2);
    assert_eq!(results.stats.failed, 1);
}

#[test]
fn panicking_extractor_is_contained() {
    struct Exploding;
    impl Extractor for Exploding {
        fn extract(&self, _path: &Path, _pattern: &Pattern) -> Result<Matches, DapisError> {
            panic!("boom");
        }
    }

    let dir = setup_test_dir();
    let s = searcher()
        .results_dir(dir.path().join("results"))
        .extractor(Format::Unsupported, Exploding)
        .build()
        .unwrap();
    s.submit("s1", vec![dir.path().join("image.png"), dir.path().join("invoices.txt")]);

    let results = s.query("s1", "invoice", false).unwrap();
    assert_eq!(results.matches.len(), 2);
    assert!(results.targets[0].error.as_deref().unwrap().contains("boom"));
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[test]
fn unknown_session_is_an_error_with_no_side_effects() {
    let dir = setup_test_dir();
    let s = build(dir.path());

    let err = s.query("nope", "invoice", false).unwrap_err();
    assert!(matches!(err, DapisError::UnknownSession(ref id) if id == "nope"));
    assert!(!dir.path().join("results").exists(), "nothing persisted");
    assert!(matches!(s.get_targets("nope"), Err(DapisError::UnknownSession(_))));
}

#[test]
fn invalid_pattern_persists_nothing() {
    let dir = setup_test_dir();
    let s = build(dir.path());
    s.submit("s1", vec![dir.path().join("invoices.txt")]);

    let err = s.query("s1", "(invoice", false).unwrap_err();
    assert!(matches!(err, DapisError::InvalidPattern(_)));
    assert_eq!(s.stored_count("s1").unwrap(), 0);
}

#[test]
fn get_targets_limits_display() {
    let dir = setup_test_dir();
    let s = searcher()
        .results_dir(dir.path().join("results"))
        .targets_display_limit(2)
        .build()
        .unwrap();

    s.submit("few", vec!["/a.txt".into(), "/b.txt".into()]);
    assert_eq!(s.get_targets("few").unwrap(), vec!["/a.txt", "/b.txt"]);

    s.submit("many", (0..5).map(|i| PathBuf::from(format!("/{i}.txt"))).collect());
    assert_eq!(
        s.get_targets("many").unwrap(),
        vec!["/0.txt", "/1.txt", "...and 3 more"]
    );
}

#[test]
fn custom_registry_is_consulted() {
    let dir = setup_test_dir();
    let registry = Arc::new(MemoryRegistry::new());
    registry.register("external", vec![dir.path().join("invoices.txt")]);

    let s = searcher()
        .results_dir(dir.path().join("results"))
        .registry(registry.clone())
        .build()
        .unwrap();

    assert_eq!(s.query("external", "invoice", false).unwrap().matches.len(), 2);
}

// ---------------------------------------------------------------------------
// Result store
// ---------------------------------------------------------------------------

#[test]
fn repeated_queries_append_duplicates() {
    let dir = setup_test_dir();
    let s = build(dir.path());
    s.submit("s1", vec![dir.path().join("invoices.txt")]);

    s.query("s1", "invoice", false).unwrap();
    assert_eq!(s.stored_count("s1").unwrap(), 2);

    s.query("s1", "invoice", false).unwrap();
    assert_eq!(s.stored_count("s1").unwrap(), 4, "second run doubles the rows");

    let rows = s.stored_matches("s1").unwrap();
    assert!(rows.windows(2).all(|w| w[0].id < w[1].id), "ids increase");
    assert_eq!(rows[0].matched, rows[2].matched);
    assert_eq!(rows[0].matched.query, "invoice");
    assert_eq!(rows[0].session_id, "s1");
}

#[test]
fn sessions_have_independent_stores() {
    let dir = setup_test_dir();
    let s = build(dir.path());
    s.submit("a", vec![dir.path().join("invoices.txt")]);
    s.submit("b", vec![dir.path().join("notes.md")]);

    s.query("a", "invoice", false).unwrap();
    s.query("b", "totals", false).unwrap();

    let a = s.stored_matches("a").unwrap();
    let b = s.stored_matches("b").unwrap();
    assert_eq!(a.len(), 2);
    assert_eq!(b.len(), 1);
    assert!(a.iter().all(|r| r.matched.path.ends_with("invoices.txt")));
    assert!(b.iter().all(|r| r.matched.path.ends_with("notes.md")));
    assert!(dir.path().join("results/a.sqlite").is_file());
    assert!(dir.path().join("results/b.sqlite").is_file());
}

#[test]
fn store_survives_reopening() {
    let dir = setup_test_dir();
    {
        let s = build(dir.path());
        s.submit("s1", vec![dir.path().join("invoices.txt")]);
        s.query("s1", "invoice", false).unwrap();
    }

    let store = dapis::ResultStore::open(dir.path().join("results")).unwrap();
    assert_eq!(store.count("s1").unwrap(), 2);
    assert_eq!(store.count("never-written").unwrap(), 0);
}

#[test]
fn path_like_session_ids_are_rejected_before_extraction() {
    let dir = setup_test_dir();
    let s = build(dir.path());
    s.submit("../escape", vec![dir.path().join("invoices.txt")]);

    let err = s.query("../escape", "invoice", false).unwrap_err();
    assert!(matches!(err, DapisError::InvalidSession(_)));
}

// ---------------------------------------------------------------------------
// PDF and converted documents
// ---------------------------------------------------------------------------

#[test]
fn pdf_matches_carry_page_line_and_position() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("report.pdf");
    fs::write(
        &pdf,
        pdf_bytes(&[
            &[(10.0, 80.0, "summary"), (100.0, 50.0, "invoice")],
            &[(0.0, 20.0, "late invoice")],
        ]),
    )
    .unwrap();

    let s = build(dir.path());
    s.submit("pdf", vec![pdf.clone()]);
    let results = s.query("pdf", "invoice", false).unwrap();

    assert!(results.targets[0].error.is_none(), "{:?}", results.targets[0].error);
    assert_eq!(results.matches.len(), 2);

    let first = &results.matches[0];
    assert_eq!(first.page.as_deref(), Some("1"));
    assert_eq!(first.line.as_deref(), Some("1"), "second baseline on the page");
    assert_eq!(first.value, "invoice");
    assert_eq!(first.x_pct, Some(50.0));
    assert!(first.y_pct.unwrap() > 0.0 && first.y_pct.unwrap() < 50.0);
    assert_eq!(first.column, None);
    assert_eq!(first.sheet, None);

    let second = &results.matches[1];
    assert_eq!(second.page.as_deref(), Some("2"));
    assert_eq!(second.line.as_deref(), Some("0"), "line index restarts per page");
    assert_eq!(second.x_pct.map(|x| x > 0.0), Some(true), "second word of the line");
}

#[test]
fn document_matches_report_the_original_path() {
    let dir = tempfile::tempdir().unwrap();
    let doc = dir.path().join("contract.docx");
    fs::write(&doc, b"not really a docx").unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let s = searcher()
        .results_dir(dir.path().join("results"))
        .converter(FakeConverter {
            pdf:   pdf_bytes(&[&[(20.0, 60.0, "signature")]]),
            calls: calls.clone(),
        })
        .build()
        .unwrap();
    s.submit("doc", vec![doc.clone()]);

    let results = s.query("doc", "sign", false).unwrap();

    assert_eq!(calls.load(Ordering::Relaxed), 1);
    assert_eq!(results.matches.len(), 1);
    assert_eq!(results.matches[0].path, doc.to_string_lossy());
    assert_eq!(results.matches[0].page.as_deref(), Some("1"));
    assert_eq!(results.targets[0].format, Format::Document);
}

#[test]
fn conversion_failure_is_contained_to_its_target() {
    let dir = setup_test_dir();
    let deck = dir.path().join("deck.pptx");
    fs::write(&deck, b"pptx").unwrap();

    let s = searcher()
        .results_dir(dir.path().join("results"))
        .converter(BrokenConverter)
        .build()
        .unwrap();
    s.submit("s1", vec![deck, dir.path().join("invoices.txt")]);

    let results = s.query("s1", "invoice", false).unwrap();
    assert_eq!(results.matches.len(), 2);
    assert!(results.targets[0]
        .error
        .as_deref()
        .unwrap()
        .contains("office suite not installed"));
}

// ---------------------------------------------------------------------------
// Spreadsheets
// ---------------------------------------------------------------------------

#[test]
fn workbook_matches_report_sheet_row_and_column() {
    let dir = tempfile::tempdir().unwrap();
    let book = dir.path().join("ledger.xlsx");

    let mut workbook = rust_xlsxwriter::Workbook::new();
    let first = workbook.add_worksheet();
    first.set_name("Sheet1").unwrap();
    first.write_string(0, 0, "item").unwrap();
    first.write_number(2, 1, 12).unwrap();
    first.write_number(3, 1, 12.5).unwrap();
    let second = workbook.add_worksheet();
    second.set_name("Totals").unwrap();
    second.write_number(0, 0, 12).unwrap();
    workbook.save(&book).unwrap();

    let s = build(dir.path());
    s.submit("xlsx", vec![book]);
    let results = s.query("xlsx", "^12$", false).unwrap();

    assert!(results.targets[0].error.is_none(), "{:?}", results.targets[0].error);
    let found: Vec<_> = results
        .matches
        .iter()
        .map(|m| {
            (
                m.sheet.as_deref().unwrap(),
                m.line.as_deref().unwrap(),
                m.column.as_deref().unwrap(),
                m.value.as_str(),
            )
        })
        .collect();
    assert_eq!(
        found,
        vec![("Sheet1", "3", "2", "12"), ("Totals", "1", "1", "12")],
        "whole numbers print without a fraction, sheets in workbook order"
    );
    assert!(results.matches.iter().all(|m| m.page.is_none()));
}

#[test]
fn corrupt_spreadsheet_is_reported_not_fatal() {
    let dir = setup_test_dir();
    let book = dir.path().join("book.xlsx");
    fs::write(&book, b"definitely not a workbook").unwrap();

    let s = build(dir.path());
    s.submit("s1", vec![book, dir.path().join("invoices.txt")]);

    let results = s.query("s1", "invoice", false).unwrap();
    assert_eq!(results.targets[0].format, Format::Spreadsheet);
    assert!(results.targets[0].error.is_some());
    assert_eq!(results.matches.len(), 2);
}

// ---------------------------------------------------------------------------
// Wire shape
// ---------------------------------------------------------------------------

#[test]
fn results_serialize_with_envelope_fields() {
    let dir = setup_test_dir();
    let s = build(dir.path());
    s.submit("s1", vec![dir.path().join("invoices.txt")]);

    let results = s.query("s1", "invoice", false).unwrap();
    let json = serde_json::to_value(&results).unwrap();

    assert_eq!(json["program"], "Dapis Server");
    assert_eq!(json["matches"][0]["line"], "2");
    assert!(json["matches"][0]["sheet"].is_null());
    assert!(json["matches"][0].get("x%").is_none(), "text matches carry no position");

    let m: Match = serde_json::from_value(json["matches"][0].clone()).unwrap();
    assert_eq!(m, results.matches[0]);
}
