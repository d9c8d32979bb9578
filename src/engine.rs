use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, warn};

use crate::error::DapisError;
use crate::format::Format;
use crate::pattern::Pattern;
use crate::record::Match;
use crate::traits::Extractor;

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Format → extractor table shared by every worker.
///
/// A format with no entry behaves like [`Format::Unsupported`]: zero matches,
/// no error.
#[derive(Clone, Default)]
pub(crate) struct Handlers {
    map: HashMap<Format, Arc<dyn Extractor>>,
}

impl Handlers {
    pub fn insert(&mut self, format: Format, extractor: Arc<dyn Extractor>) {
        self.map.insert(format, extractor);
    }

    pub fn get(&self, format: Format) -> Option<&Arc<dyn Extractor>> {
        self.map.get(&format)
    }
}

// ---------------------------------------------------------------------------
// Engine options
// ---------------------------------------------------------------------------

/// Internal options passed from the searcher to `run()`.
pub(crate) struct EngineOptions {
    pub pool:     ThreadPool,
    pub handlers: Handlers,
}

impl EngineOptions {
    /// Start a worker pool of `threads` named threads.
    pub fn new(threads: usize, handlers: Handlers) -> Result<Self, DapisError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("dapis-worker-{i}"))
            .build()
            .map_err(|e| DapisError::ThreadPool(e.to_string()))?;
        Ok(Self { pool, handlers })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

/// Everything one extraction task produced.
pub(crate) struct TargetOutput {
    pub path:   PathBuf,
    pub format: Format,
    pub result: Result<Vec<Match>, DapisError>,
}

// ---------------------------------------------------------------------------
// run()
// ---------------------------------------------------------------------------

/// Extract every target on the pool and return outputs in target order.
///
/// All parallelism lives here. The indexed collect keeps submission order no
/// matter which worker finishes first, and the call returns only once every
/// target is done. A panicking handler is contained to its own target.
pub(crate) fn run(
    targets: &[PathBuf],
    pattern: &Pattern,
    opts:    &EngineOptions,
) -> Vec<TargetOutput> {
    opts.pool.install(|| {
        targets
            .par_iter()
            .map(|path| extract_one(path, pattern, &opts.handlers))
            .collect()
    })
}

/// Classify and extract a single target.
fn extract_one(path: &Path, pattern: &Pattern, handlers: &Handlers) -> TargetOutput {
    let format = Format::classify(path);

    let result = match handlers.get(format) {
        None => Ok(Vec::new()),
        Some(extractor) => {
            debug!(path = %path.display(), %format, "extracting");
            let caught = panic::catch_unwind(AssertUnwindSafe(|| {
                extractor.extract(path, pattern).map(|matches| matches.collect::<Vec<_>>())
            }));
            match caught {
                Ok(r)        => r,
                Err(payload) => Err(DapisError::ThreadPool(panic_message(payload.as_ref()))),
            }
        }
    };

    if let Err(e) = &result {
        warn!(path = %path.display(), %format, error = %e, "target skipped");
    }

    TargetOutput {
        path: path.to_path_buf(),
        format,
        result,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("extractor panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("extractor panicked: {s}")
    } else {
        "extractor panicked".to_string()
    }
}
