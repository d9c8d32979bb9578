use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use crate::traits::SessionRegistry;

/// In-process [`SessionRegistry`] backed by a `RwLock<HashMap>`.
///
/// Sessions live as long as the registry. Nothing is evicted.
#[derive(Default)]
pub struct MemoryRegistry {
    sessions: RwLock<HashMap<String, Arc<[PathBuf]>>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionRegistry for MemoryRegistry {
    fn register(&self, session_id: &str, paths: Vec<PathBuf>) {
        // Inserts are single calls, so a poisoned map is still consistent.
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.insert(session_id.to_string(), Arc::from(paths));
    }

    fn lookup(&self, session_id: &str) -> Option<Arc<[PathBuf]>> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions.get(session_id).cloned()
    }
}

/// Render a target list for display, keeping at most `limit` paths.
///
/// When paths are dropped a final `"...and N more"` entry says how many.
pub fn display_targets(paths: &[PathBuf], limit: usize) -> Vec<String> {
    let mut shown: Vec<String> = paths
        .iter()
        .take(limit)
        .map(|p| p.to_string_lossy().into_owned())
        .collect();

    if paths.len() > limit {
        shown.push(format!("...and {} more", paths.len() - limit));
    }
    shown
}
