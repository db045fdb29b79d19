use std::{collections::BTreeMap, fs, path::Path};

use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::{write_with_backup, StoreError};

/// Default rolling-window cap per watched source.
pub const DEFAULT_WINDOW: usize = 50;

/// What the monitor derived from a video the last time it analyzed it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub analyzed_at: DateTime<Utc>,
    pub data: Value,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SourceWindow {
    /// Known video ids, newest first, length capped at the window size.
    known_ids: Vec<String>,
    #[serde(default)]
    analyses: BTreeMap<String, AnalysisRecord>,
}

/// Per-source rolling window of recently seen video ids, used by the monitor
/// to decide which freshly fetched uploads are new.
///
/// The window is newest-first. [`update`](DedupTracker::update) prepends the
/// latest fetch, drops duplicates and truncates to the cap, so the oldest
/// known ids age out once a source has produced more than `window` uploads.
#[derive(Debug)]
pub struct DedupTracker {
    sources: BTreeMap<String, SourceWindow>,
    window: usize,
}

impl DedupTracker {
    pub fn new(window: usize) -> Self {
        DedupTracker {
            sources: BTreeMap::new(),
            window,
        }
    }

    /// Loads tracker state from `path`, creating an empty document when the
    /// file does not exist yet.
    pub fn load(path: &Path, window: usize) -> Result<Self, StoreError> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            fs::write(path, "{}")?;
            return Ok(DedupTracker::new(window));
        }

        let text = fs::read_to_string(path)?;
        let sources: BTreeMap<String, SourceWindow> =
            serde_json::from_str(&text).map_err(|source| StoreError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(DedupTracker { sources, window })
    }

    /// True iff `id` is not in the current known-id window for `source_id`.
    pub fn is_new(&self, source_id: &str, id: &str) -> bool {
        self.sources
            .get(source_id)
            .map(|window| !window.known_ids.iter().any(|known| known == id))
            .unwrap_or(true)
    }

    /// Merges a newest-first fetch into the window for `source_id`:
    /// `latest_ids` first, then previously known ids not already present in
    /// their existing order, truncated to the cap.
    pub fn update<S: AsRef<str>>(&mut self, source_id: &str, latest_ids: &[S]) {
        let entry = self.sources.entry(source_id.to_string()).or_default();
        entry.known_ids = latest_ids
            .iter()
            .map(|id| id.as_ref().to_string())
            .chain(entry.known_ids.iter().cloned())
            .unique()
            .take(self.window)
            .collect();
    }

    pub fn known_ids(&self, source_id: &str) -> &[String] {
        self.sources
            .get(source_id)
            .map(|window| window.known_ids.as_slice())
            .unwrap_or_default()
    }

    /// Records the derived data for an analyzed video, stamped with the
    /// current time. A later analysis of the same id overwrites the record.
    pub fn record_analysis(&mut self, source_id: &str, id: &str, data: Value) {
        let entry = self.sources.entry(source_id.to_string()).or_default();
        entry.analyses.insert(
            id.to_string(),
            AnalysisRecord {
                analyzed_at: Utc::now(),
                data,
            },
        );
    }

    pub fn analysis(&self, source_id: &str, id: &str) -> Option<&AnalysisRecord> {
        self.sources
            .get(source_id)
            .and_then(|window| window.analyses.get(id))
    }

    /// Serializes the tracker state to `path` with the same backup-on-failure
    /// behavior as the result store.
    pub fn persist(&self, path: &Path) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(&self.sources).map_err(StoreError::Serialize)?;
        write_with_backup(path, &text)
    }
}
