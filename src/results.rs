use std::time::Duration;

use serde::Serialize;

use crate::engine::TargetOutput;
use crate::format::Format;
use crate::record::Match;

pub const PROGRAM: &str = "Dapis Server";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The output of a completed query.
///
/// `matches` is the flat, submission-ordered concatenation of every target's
/// matches. `targets` says, per target, how many matches it contributed and
/// whether extraction failed, so "nothing matched" and "could not read" are
/// distinguishable without changing `matches`.
#[derive(Debug, Serialize)]
pub struct QueryResults {
    pub matches: Vec<Match>,

    /// One report per submitted target, in submission order.
    pub targets: Vec<TargetReport>,

    pub stats: QueryStats,

    pub version: &'static str,

    pub program: &'static str,
}

/// Per-target outcome of a query.
#[derive(Debug, Clone, Serialize)]
pub struct TargetReport {
    pub path: String,

    pub format: Format,

    /// Matches this target contributed. Always 0 when `error` is set.
    pub matches: usize,

    /// Why extraction failed, if it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Performance statistics for a completed query.
#[derive(Debug, Clone, Serialize)]
pub struct QueryStats {
    /// Targets dispatched, including unsupported ones.
    pub targets: usize,

    /// Targets whose extraction failed.
    pub failed: usize,

    /// Total matches across all targets.
    pub matches: usize,

    /// Wall-clock time from dispatch to aggregation.
    pub duration: Duration,

    /// Equals `targets / duration.as_secs_f64()`,
    /// clamped to 0 on zero-duration runs.
    pub targets_per_sec: usize,
}

impl QueryResults {
    /// Concatenate per-target outputs, preserving their order.
    pub(crate) fn aggregate(outputs: Vec<TargetOutput>, duration: Duration) -> Self {
        let mut matches = Vec::new();
        let mut targets = Vec::with_capacity(outputs.len());

        for output in outputs {
            let path = output.path.to_string_lossy().into_owned();
            let report = match output.result {
                Ok(found) => {
                    let n = found.len();
                    matches.extend(found);
                    TargetReport { path, format: output.format, matches: n, error: None }
                }
                Err(e) => TargetReport {
                    path,
                    format:  output.format,
                    matches: 0,
                    error:   Some(e.to_string()),
                },
            };
            targets.push(report);
        }

        let stats = QueryStats::compute(
            targets.len(),
            targets.iter().filter(|t| t.error.is_some()).count(),
            matches.len(),
            duration,
        );

        Self {
            matches,
            targets,
            stats,
            version: VERSION,
            program: PROGRAM,
        }
    }

    /// Targets whose extraction failed.
    pub fn failures(&self) -> impl Iterator<Item = &TargetReport> {
        self.targets.iter().filter(|t| t.error.is_some())
    }
}

impl QueryStats {
    pub(crate) fn compute(targets: usize, failed: usize, matches: usize, duration: Duration) -> Self {
        let tps = if duration.as_secs_f64() > 0.0 {
            (targets as f64 / duration.as_secs_f64()) as usize
        } else {
            0
        };
        Self {
            targets,
            failed,
            matches,
            duration,
            targets_per_sec: tps,
        }
    }
}
