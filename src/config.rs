use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::debug;

use crate::error::DapisError;

/// Runtime settings for a [`Searcher`](crate::Searcher).
///
/// Layering, lowest to highest: built-in defaults, environment
/// ([`from_env`](Self::from_env)), config file ([`apply_file`](Self::apply_file)),
/// then explicit builder setters.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Directory holding one `<session_id>.sqlite` per session.
    pub results_dir: PathBuf,

    /// How many target paths `get_targets` lists before summarizing the rest.
    pub targets_display_limit: usize,

    /// Worker pool size.
    pub threads: usize,

    /// Office suite binary used to convert documents to PDF.
    pub soffice: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            results_dir:           PathBuf::from("results"),
            targets_display_limit: 99,
            threads:               num_cpus(),
            soffice:               PathBuf::from("soffice"),
        }
    }
}

impl Config {
    /// Defaults overlaid with `DAPIS_*` environment variables.
    ///
    /// Numeric variables that do not parse are ignored.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_vars(|key| std::env::var(key).ok());
        cfg
    }

    fn apply_vars(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(v) = get("DAPIS_RESULTS_DIR") {
            self.results_dir = v.into();
        }
        if let Some(n) = get("DAPIS_TARGETS_COUNT_DEFAULT").and_then(|v| v.trim().parse().ok()) {
            self.targets_display_limit = n;
        }
        if let Some(n) = get("DAPIS_THREADS").and_then(|v| v.trim().parse().ok()) {
            self.threads = n;
        }
        if let Some(v) = get("DAPIS_SOFFICE") {
            self.soffice = v.into();
        }
    }

    /// Overlay settings from a config file.
    ///
    /// The file holds the same `--flag value` tokens the server accepts on its
    /// command line, split on whitespace across any number of lines. Blank
    /// lines and lines starting with `#` are skipped. `--host`, `--port` and
    /// `--config_file` belong to the HTTP front end and are accepted but
    /// ignored. A missing file changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`DapisError::Config`] for unknown flags, missing values or
    /// unparsable numbers, and [`DapisError::Io`] if the file exists but
    /// cannot be read.
    pub fn apply_file(&mut self, path: &Path) -> Result<(), DapisError> {
        if !path.exists() {
            return Ok(());
        }
        let text = std::fs::read_to_string(path).map_err(|source| DapisError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.apply_text(&text)
    }

    fn apply_text(&mut self, text: &str) -> Result<(), DapisError> {
        let tokens = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .flat_map(str::split_whitespace);

        let args = FileArgs::try_parse_from(tokens)
            .map_err(|e| DapisError::Config(e.to_string().trim().to_string()))?;

        if let Some(dir) = args.results_dir {
            self.results_dir = dir;
        }
        if let Some(n) = args.targets_count_default {
            self.targets_display_limit = n;
        }
        if let Some(n) = args.threads {
            self.threads = n;
        }
        if let Some(program) = args.soffice {
            self.soffice = program;
        }
        if args.host.is_some() || args.port.is_some() || args.config_file.is_some() {
            debug!(
                host = ?args.host,
                port = ?args.port,
                "ignoring front-end settings in config file"
            );
        }
        Ok(())
    }
}

/// Flags a config file may contain.
#[derive(Debug, Parser)]
#[command(
    name = "dapis",
    no_binary_name = true,
    disable_help_flag = true,
    disable_version_flag = true
)]
struct FileArgs {
    #[arg(long = "results_dir")]
    results_dir: Option<PathBuf>,

    #[arg(long = "targets_count_default")]
    targets_count_default: Option<usize>,

    #[arg(long)]
    threads: Option<usize>,

    #[arg(long)]
    soffice: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    #[arg(long = "config_file")]
    config_file: Option<PathBuf>,
}

/// Get the logical CPU count, with a safe fallback.
pub(crate) fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
