//! Persisted registry of watched channels and playlists, managed by the CLI
//! `add` and `list` commands.

use std::{fs, path::Path};

use recap_store::{write_with_backup, StoreError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Channel,
    Playlist,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchSource {
    pub id: String,
    pub kind: SourceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Per-source override for how many feed items to fetch per poll.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_limit: Option<usize>,
}

impl WatchSource {
    /// Human-readable label for logs: the configured name, or the raw id.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SourceRegistry {
    sources: Vec<WatchSource>,
}

impl SourceRegistry {
    /// Loads the registry, creating an empty document when the file does not
    /// exist yet.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            fs::write(path, "{\n  \"sources\": []\n}")?;
            return Ok(SourceRegistry::default());
        }

        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|source| StoreError::Malformed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Adds or replaces a source, keyed by id.
    pub fn upsert(&mut self, source: WatchSource) {
        if let Some(existing) = self.sources.iter_mut().find(|s| s.id == source.id) {
            *existing = source;
        } else {
            self.sources.push(source);
        }
    }

    pub fn get(&self, source_id: &str) -> Option<&WatchSource> {
        self.sources.iter().find(|s| s.id == source_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &WatchSource> {
        self.sources.iter()
    }

    pub fn as_slice(&self) -> &[WatchSource] {
        &self.sources
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn persist(&self, path: &Path) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(self).map_err(StoreError::Serialize)?;
        write_with_backup(path, &text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(id: &str) -> WatchSource {
        WatchSource {
            id: id.to_string(),
            kind: SourceKind::Channel,
            name: None,
            fetch_limit: None,
        }
    }

    #[test]
    fn load_creates_empty_registry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sources.json");

        let registry = SourceRegistry::load(&path).unwrap();
        assert!(registry.is_empty());
        assert!(path.exists());
    }

    #[test]
    fn upsert_replaces_by_id() {
        let mut registry = SourceRegistry::default();
        registry.upsert(channel("UC123"));
        registry.upsert(WatchSource {
            name: Some("Markus Koch".to_string()),
            ..channel("UC123")
        });

        assert_eq!(registry.as_slice().len(), 1);
        assert_eq!(registry.get("UC123").unwrap().label(), "Markus Koch");
    }

    #[test]
    fn registry_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sources.json");

        let mut registry = SourceRegistry::load(&path).unwrap();
        registry.upsert(WatchSource {
            id: "PL6P5rY8mrhqr".to_string(),
            kind: SourceKind::Playlist,
            name: Some("Alles auf Aktien".to_string()),
            fetch_limit: Some(6),
        });
        registry.persist(&path).unwrap();

        let reloaded = SourceRegistry::load(&path).unwrap();
        let source = reloaded.get("PL6P5rY8mrhqr").unwrap();
        assert_eq!(source.kind, SourceKind::Playlist);
        assert_eq!(source.fetch_limit, Some(6));
    }
}
