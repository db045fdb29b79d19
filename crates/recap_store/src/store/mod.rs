use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde_json::{Map, Value};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store at {path} exists but could not be deserialized: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("store at {path} must have a JSON object at its root")]
    NotAnObject { path: PathBuf },
    #[error("failed to serialize store document: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Nested result cache addressed by key paths (video id → category → language).
///
/// The whole document is held in memory and rewritten to disk on every
/// [`persist`](ResultStore::persist). Writes are one-per-new-result and the
/// document holds one row per analyzed video, so full rewrites stay cheap.
#[derive(Debug, Default)]
pub struct ResultStore {
    root: Map<String, Value>,
}

impl ResultStore {
    /// Deserializes the document at `path`.
    ///
    /// A missing file is not an error: an empty document is created at `path`
    /// and an empty store is returned. An existing file that cannot be parsed
    /// fails with [`StoreError::Malformed`].
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            fs::write(path, "{}")?;
            return Ok(ResultStore::default());
        }

        let text = fs::read_to_string(path)?;
        let document: Value =
            serde_json::from_str(&text).map_err(|source| StoreError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;

        match document {
            Value::Object(root) => Ok(ResultStore { root }),
            _ => Err(StoreError::NotAnObject {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Returns true iff every key along `key_path` resolves through nested
    /// objects. Never fails on a missing or non-object intermediate.
    pub fn exists<S: AsRef<str>>(&self, key_path: &[S]) -> bool {
        self.get(key_path).is_some()
    }

    pub fn get<S: AsRef<str>>(&self, key_path: &[S]) -> Option<&Value> {
        let (first, rest) = key_path.split_first()?;
        let mut current = self.root.get(first.as_ref())?;
        for key in rest {
            current = current.as_object()?.get(key.as_ref())?;
        }
        Some(current)
    }

    /// Assigns `value` at `key_path`, creating intermediate objects as needed.
    /// A non-object intermediate is replaced. Last write wins; an empty key
    /// path is a no-op.
    pub fn set<S: AsRef<str>>(&mut self, key_path: &[S], value: Value) {
        let Some((leaf, parents)) = key_path.split_last() else {
            return;
        };

        let mut current = &mut self.root;
        for key in parents {
            let entry = current
                .entry(key.as_ref().to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            current = entry
                .as_object_mut()
                .expect("entry was just ensured to be an object");
        }
        current.insert(leaf.as_ref().to_string(), value);
    }

    /// Serializes the whole store to `path` as pretty-printed JSON. Non-ASCII
    /// text is written as-is. If serialization or the write fails, any existing
    /// file at `path` is copied to a timestamped backup before the error
    /// propagates, so the last good state is never silently lost.
    pub fn persist(&self, path: &Path) -> Result<(), StoreError> {
        let document = Value::Object(self.root.clone());
        let text = match serde_json::to_string_pretty(&document) {
            Ok(text) => text,
            Err(e) => {
                back_up_existing(path);
                return Err(StoreError::Serialize(e));
            }
        };
        write_with_backup(path, &text)
    }
}

/// Writes `contents` to a temporary sibling of `path` and renames it into
/// place. On failure, copies any existing file at `path` to a timestamped
/// sibling (`<name>.<UTC stamp>.bak`) before propagating the error. Shared by
/// the result store, the dedup tracker and the sources registry.
pub fn write_with_backup(path: &Path, contents: &str) -> Result<(), StoreError> {
    let tmp = path.with_extension("tmp");
    let result = fs::write(&tmp, contents).and_then(|_| fs::rename(&tmp, path));
    if let Err(e) = result {
        back_up_existing(path);
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

fn back_up_existing(path: &Path) {
    if !path.exists() {
        return;
    }
    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S");
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "store".to_string());
    let backup = path.with_file_name(format!("{file_name}.{stamp}.bak"));

    match fs::copy(path, &backup) {
        Ok(_) => {
            tracing::warn!(original = %path.display(), backup = %backup.display(), "Persist failed, backed up last good store")
        }
        Err(e) => {
            tracing::error!(error = ?e, path = %path.display(), "Failed to back up store before propagating persist failure")
        }
    }
}
