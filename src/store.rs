//! Append-only, per-session result persistence.
//!
//! Each session gets its own SQLite file, `<results_dir>/<session_id>.sqlite`,
//! holding a single `results` table. Rows are only ever inserted: re-running a
//! query appends a fresh copy of its matches.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tokio::runtime::Runtime;
use tracing::debug;

use crate::error::DapisError;
use crate::record::{Match, StoredMatch};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    query TEXT NOT NULL,
    file_path TEXT NOT NULL,
    sheet TEXT,
    line TEXT,
    "column" TEXT,
    page TEXT,
    value TEXT
)
"#;

/// One session's open database. `write` serializes appends so a session never
/// has two writers.
struct SessionDb {
    pool:  SqlitePool,
    write: Mutex<()>,
}

/// Durable store of every match produced for every session.
///
/// The public API is synchronous; database work runs on a private
/// current-thread tokio runtime. Do not call it from inside an async runtime.
pub struct ResultStore {
    dir:      PathBuf,
    // Pools are dropped before the runtime that drives them.
    sessions: Mutex<HashMap<String, Arc<SessionDb>>>,
    runtime:  Runtime,
}

impl ResultStore {
    /// Open a store rooted at `dir`. The directory is created on first write.
    ///
    /// # Errors
    ///
    /// Returns [`DapisError::Store`] if the runtime cannot be started.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, DapisError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DapisError::Store(format!("failed to start store runtime: {e}")))?;

        Ok(Self {
            dir: dir.into(),
            sessions: Mutex::new(HashMap::new()),
            runtime,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Database file backing `session_id`.
    pub fn db_path(&self, session_id: &str) -> Result<PathBuf, DapisError> {
        validate_session_id(session_id)?;
        Ok(self.dir.join(format!("{session_id}.sqlite")))
    }

    /// Append `matches` to the session's table in a single transaction.
    ///
    /// Creates the session's database on first use, even when `matches` is
    /// empty. Returns the number of rows written.
    pub fn append(&self, session_id: &str, query: &str, matches: &[Match]) -> Result<u64, DapisError> {
        let db = self.session(session_id, true)?
            .ok_or_else(|| DapisError::Store(format!("no database for session {session_id}")))?;

        let _writer = match db.write.lock() {
            Ok(g)  => g,
            Err(p) => p.into_inner(),
        };

        let written = self.runtime.block_on(async {
            let mut tx = db.pool.begin().await?;
            let mut written = 0u64;
            for m in matches {
                sqlx::query(
                    r#"INSERT INTO results (query, file_path, sheet, line, "column", page, value)
                       VALUES (?, ?, ?, ?, ?, ?, ?)"#,
                )
                .bind(query)
                .bind(&m.path)
                .bind(&m.sheet)
                .bind(&m.line)
                .bind(&m.column)
                .bind(&m.page)
                .bind(&m.value)
                .execute(&mut *tx)
                .await?;
                written += 1;
            }
            tx.commit().await?;
            Ok::<_, sqlx::Error>(written)
        })?;

        debug!(session_id, rows = written, "appended results");
        Ok(written)
    }

    /// Every row stored for `session_id`, oldest first.
    ///
    /// A session that was never written to has no rows; reading it creates
    /// nothing on disk.
    pub fn rows(&self, session_id: &str) -> Result<Vec<StoredMatch>, DapisError> {
        let Some(db) = self.session(session_id, false)? else {
            return Ok(Vec::new());
        };

        let rows = self.runtime.block_on(
            sqlx::query(
                r#"SELECT id, query, file_path, sheet, line, "column", page, value
                   FROM results ORDER BY id"#,
            )
            .fetch_all(&db.pool),
        )?;

        rows.iter()
            .map(|row| {
                Ok(StoredMatch {
                    id:         row.try_get("id")?,
                    session_id: session_id.to_string(),
                    matched: Match {
                        query:  row.try_get("query")?,
                        path:   row.try_get("file_path")?,
                        sheet:  row.try_get("sheet")?,
                        line:   row.try_get("line")?,
                        column: row.try_get("column")?,
                        page:   row.try_get("page")?,
                        value:  row.try_get::<Option<String>, _>("value")?.unwrap_or_default(),
                        x_pct:  None,
                        y_pct:  None,
                    },
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(DapisError::from)
    }

    /// Number of rows stored for `session_id`.
    pub fn count(&self, session_id: &str) -> Result<u64, DapisError> {
        let Some(db) = self.session(session_id, false)? else {
            return Ok(0);
        };

        let n: i64 = self
            .runtime
            .block_on(sqlx::query_scalar("SELECT COUNT(*) FROM results").fetch_one(&db.pool))?;
        Ok(n.max(0) as u64)
    }

    /// Get the session's database, opening it if needed.
    ///
    /// With `create == false` a session whose file does not exist yet yields
    /// `None` instead of creating it.
    fn session(&self, session_id: &str, create: bool) -> Result<Option<Arc<SessionDb>>, DapisError> {
        let path = self.db_path(session_id)?;

        let mut sessions = match self.sessions.lock() {
            Ok(s)  => s,
            Err(p) => p.into_inner(),
        };
        if let Some(db) = sessions.get(session_id) {
            return Ok(Some(Arc::clone(db)));
        }
        if !create && !path.exists() {
            return Ok(None);
        }

        std::fs::create_dir_all(&self.dir).map_err(|e| {
            DapisError::Store(format!("cannot create {}: {e}", self.dir.display()))
        })?;

        let pool = self.runtime.block_on(async {
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .connect_with(
                    SqliteConnectOptions::new()
                        .filename(&path)
                        .create_if_missing(true)
                        .journal_mode(SqliteJournalMode::Wal),
                )
                .await?;
            sqlx::query(SCHEMA).execute(&pool).await?;
            Ok::<_, sqlx::Error>(pool)
        })?;

        debug!(session_id, path = %path.display(), "opened result store");

        let db = Arc::new(SessionDb {
            pool,
            write: Mutex::new(()),
        });
        sessions.insert(session_id.to_string(), Arc::clone(&db));
        Ok(Some(db))
    }
}

/// Reject ids that could escape the results directory.
fn validate_session_id(session_id: &str) -> Result<(), DapisError> {
    let bad = session_id.is_empty()
        || session_id == "."
        || session_id.contains("..")
        || session_id.contains(['/', '\\', '\0']);
    if bad {
        return Err(DapisError::InvalidSession(session_id.to_string()));
    }
    Ok(())
}
