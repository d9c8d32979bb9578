use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::config::Config;
use crate::convert::OfficeConverter;
use crate::engine::{run, EngineOptions, Handlers};
use crate::error::DapisError;
use crate::extract::{DocumentExtractor, PdfExtractor, SpreadsheetExtractor, TextExtractor};
use crate::format::Format;
use crate::pattern::Pattern;
use crate::record::StoredMatch;
use crate::results::QueryResults;
use crate::session::{display_targets, MemoryRegistry};
use crate::store::ResultStore;
use crate::traits::{Converter, Extractor, SessionRegistry};

// ---------------------------------------------------------------------------
// SearcherBuilder
// ---------------------------------------------------------------------------

/// Entry point for configuring a [`Searcher`].
///
/// Created via [`dapis::searcher()`](crate::searcher). Configure with chained
/// builder methods, then call [`build()`](SearcherBuilder::build).
///
/// # Example
///
/// ```rust,ignore
/// let searcher = dapis::searcher()
///     .config(dapis::Config::from_env())
///     .results_dir("/var/lib/dapis")
///     .threads(8)
///     .build()?;
/// ```
#[derive(Default)]
pub struct SearcherBuilder {
    config:      Option<Config>,
    results_dir: Option<PathBuf>,
    threads:     Option<usize>,
    limit:       Option<usize>,
    registry:    Option<Arc<dyn SessionRegistry>>,
    converter:   Option<Arc<dyn Converter>>,
    extractors:  Vec<(Format, Arc<dyn Extractor>)>,
}

impl SearcherBuilder {
    // ── Settings ──────────────────────────────────────────────────────────

    /// Start from `config` instead of [`Config::default()`].
    ///
    /// Setters called on the builder still take precedence over it.
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Directory for per-session result databases.
    pub fn results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = Some(dir.into());
        self
    }

    /// Number of worker threads per query.
    ///
    /// Defaults to the number of logical CPU cores.
    pub fn threads(mut self, n: usize) -> Self {
        self.threads = Some(n);
        self
    }

    /// How many paths [`Searcher::get_targets`] lists before summarizing.
    pub fn targets_display_limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    // ── Collaborators ─────────────────────────────────────────────────────

    /// Use a custom session registry. Defaults to a [`MemoryRegistry`].
    pub fn registry(mut self, registry: Arc<dyn SessionRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Use a custom document converter.
    ///
    /// Defaults to an [`OfficeConverter`] running the configured `soffice`.
    pub fn converter(mut self, converter: impl Converter + 'static) -> Self {
        self.converter = Some(Arc::new(converter));
        self
    }

    /// Replace the extractor used for `format`.
    ///
    /// Registering one for [`Format::Unsupported`] makes otherwise-ignored
    /// files searchable.
    pub fn extractor(mut self, format: Format, extractor: impl Extractor + 'static) -> Self {
        self.extractors.push((format, Arc::new(extractor)));
        self
    }

    // ── Build ─────────────────────────────────────────────────────────────

    /// Validate settings and create the searcher.
    ///
    /// # Errors
    ///
    /// Returns [`DapisError::InvalidThreadCount`] for a zero-sized pool,
    /// [`DapisError::ThreadPool`] if the workers cannot be spawned and
    /// [`DapisError::Store`] if the result store cannot start.
    pub fn build(self) -> Result<Searcher, DapisError> {
        let mut config = self.config.unwrap_or_default();
        if let Some(dir) = self.results_dir {
            config.results_dir = dir;
        }
        if let Some(n) = self.threads {
            config.threads = n;
        }
        if let Some(n) = self.limit {
            config.targets_display_limit = n;
        }

        if config.threads == 0 {
            return Err(DapisError::InvalidThreadCount(0));
        }

        let converter: Arc<dyn Converter> = match self.converter {
            Some(c) => c,
            None    => Arc::new(OfficeConverter::new(config.soffice.clone())),
        };

        let mut handlers = Handlers::default();
        handlers.insert(Format::Text, Arc::new(TextExtractor::new()));
        handlers.insert(Format::Spreadsheet, Arc::new(SpreadsheetExtractor::new()));
        handlers.insert(Format::Pdf, Arc::new(PdfExtractor::new()));
        handlers.insert(Format::Document, Arc::new(DocumentExtractor::new(converter)));
        for (format, extractor) in self.extractors {
            handlers.insert(format, extractor);
        }

        let registry: Arc<dyn SessionRegistry> = match self.registry {
            Some(r) => r,
            None    => Arc::new(MemoryRegistry::new()),
        };

        let store = ResultStore::open(config.results_dir.clone())?;

        let engine = EngineOptions::new(config.threads, handlers)?;

        Ok(Searcher {
            engine,
            registry,
            store,
            config,
        })
    }
}

// ---------------------------------------------------------------------------
// Searcher
// ---------------------------------------------------------------------------

/// Runs regex queries over registered sessions and records the results.
///
/// `Searcher` is `Sync`: share it behind an `Arc` and call [`query`](Self::query)
/// from as many request threads as needed. Queries against the same session
/// persist one after another; different sessions never contend.
pub struct Searcher {
    engine:   EngineOptions,
    registry: Arc<dyn SessionRegistry>,
    store:    ResultStore,
    config:   Config,
}

impl Searcher {
    /// Register `paths` as the targets of `session_id`.
    pub fn submit(&self, session_id: &str, paths: Vec<PathBuf>) {
        info!(session_id, targets = paths.len(), "session submitted");
        self.registry.register(session_id, paths);
    }

    /// The session's targets for display, summarizing any beyond the limit.
    ///
    /// # Errors
    ///
    /// Returns [`DapisError::UnknownSession`] if `session_id` was never submitted.
    pub fn get_targets(&self, session_id: &str) -> Result<Vec<String>, DapisError> {
        let paths = self
            .registry
            .lookup(session_id)
            .ok_or_else(|| DapisError::UnknownSession(session_id.to_string()))?;
        Ok(display_targets(&paths, self.config.targets_display_limit))
    }

    /// Search every target of `session_id` for `pattern`.
    ///
    /// Blocks until every target has been extracted, then appends all matches
    /// to the session's result store in one transaction.
    ///
    /// # Errors
    ///
    /// - [`DapisError::UnknownSession`]: nothing is extracted or stored.
    /// - [`DapisError::InvalidPattern`] / [`DapisError::InvalidSession`]:
    ///   rejected before extraction.
    /// - [`DapisError::Store`]: matches were found but could not be persisted.
    ///
    /// Failures of individual targets are not errors; see
    /// [`QueryResults::targets`].
    pub fn query(
        &self,
        session_id:       &str,
        pattern:          &str,
        case_insensitive: bool,
    ) -> Result<QueryResults, DapisError> {
        let targets = self
            .registry
            .lookup(session_id)
            .ok_or_else(|| DapisError::UnknownSession(session_id.to_string()))?;
        self.store.db_path(session_id)?;
        let pattern = Pattern::new(pattern, case_insensitive)?;

        let start = Instant::now();
        let outputs = run(&targets, &pattern, &self.engine);
        let results = QueryResults::aggregate(outputs, start.elapsed());

        self.store.append(session_id, pattern.as_str(), &results.matches)?;

        info!(
            session_id,
            pattern = pattern.as_str(),
            targets = results.stats.targets,
            workers = self.engine.threads(),
            failed = results.stats.failed,
            matches = results.stats.matches,
            elapsed_ms = results.stats.duration.as_millis() as u64,
            "query complete"
        );
        Ok(results)
    }

    /// Every match ever stored for `session_id`, oldest first.
    pub fn stored_matches(&self, session_id: &str) -> Result<Vec<StoredMatch>, DapisError> {
        self.store.rows(session_id)
    }

    /// Number of matches stored for `session_id`.
    pub fn stored_count(&self, session_id: &str) -> Result<u64, DapisError> {
        self.store.count(session_id)
    }

    /// The settings this searcher was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }
}
