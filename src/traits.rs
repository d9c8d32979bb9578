use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::DapisError;
use crate::pattern::Pattern;
use crate::record::Match;

/// A lazy, single-pass sequence of matches from one target.
pub type Matches = Box<dyn Iterator<Item = Match> + Send>;

/// Turns one file and a compiled pattern into a sequence of matches.
///
/// Implement this to teach dapis a new format. The builder maps each
/// [`Format`](crate::Format) to one `Extractor`.
///
/// # Thread Safety
///
/// `Send + Sync` are required: one extractor instance serves every worker
/// thread, each calling `extract()` on a different file.
///
/// # Error Handling
///
/// Return `Err` when the file cannot be read or parsed. The engine records the
/// error on that target's [`TargetReport`](crate::TargetReport) and moves on;
/// it never aborts the query for a single bad file. An `Ok` empty sequence
/// means the file was read and nothing matched.
pub trait Extractor: Send + Sync {
    fn extract(&self, path: &Path, pattern: &Pattern) -> Result<Matches, DapisError>;
}

/// Renders an office document into a PDF.
///
/// Implementations are platform-specific (a headless office suite, native
/// editor automation, a remote service). The engine only relies on the
/// returned path pointing at a readable PDF.
pub trait Converter: Send + Sync {
    /// Convert `input` and return the path of the produced PDF.
    fn convert_to_pdf(&self, input: &Path) -> Result<PathBuf, DapisError>;
}

/// Where sessions and their target lists live.
///
/// The registry is read concurrently by every query; implementations must be
/// safe to share across threads.
///
/// # Example
///
/// ```rust
/// use dapis::{MemoryRegistry, SessionRegistry};
///
/// let registry = MemoryRegistry::new();
/// registry.register("abc", vec!["/tmp/a.txt".into()]);
/// assert_eq!(registry.lookup("abc").unwrap().len(), 1);
/// assert!(registry.lookup("missing").is_none());
/// ```
pub trait SessionRegistry: Send + Sync {
    /// Store `paths` under `session_id`, replacing any earlier submission.
    fn register(&self, session_id: &str, paths: Vec<PathBuf>);

    /// The targets submitted for `session_id`, in submission order.
    fn lookup(&self, session_id: &str) -> Option<Arc<[PathBuf]>>;
}
