use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::storage::cache::is_valid_cache_name;

/// A known feed source. `name` doubles as the cache file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    #[serde(rename = "Name", alias = "name")]
    pub name: String,
    #[serde(rename = "URL", alias = "url")]
    pub url: String,
}

impl RegistryEntry {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Immutable, shareable list of feed sources.
///
/// Cloning shares the underlying list. Nothing mutates it after `load`; a
/// mutation path would need exclusive-write/shared-read locking.
#[derive(Debug, Clone)]
pub struct RegistryStore {
    path: Option<PathBuf>,
    entries: Arc<[RegistryEntry]>,
}

impl RegistryStore {
    /// Reads the registry file, or writes the default set there when the
    /// file does not exist yet.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Looking for feed registry at {}", path.display());

        let entries = if path.exists() {
            info!("Using existing registry");
            Self::read_entries(path)?
        } else {
            info!("No registry found, installing default feed list");
            let entries = Self::default_entries();
            Self::write_entries(path, &entries)?;
            entries
        };

        let store = Self::build(Some(path.to_path_buf()), entries)?;
        info!("Registry holds {} feeds", store.len());
        Ok(store)
    }

    /// In-memory registry that is never written to disk.
    pub fn from_entries(entries: Vec<RegistryEntry>) -> Result<Self> {
        Self::build(None, entries)
    }

    fn build(path: Option<PathBuf>, entries: Vec<RegistryEntry>) -> Result<Self> {
        let mut seen = HashSet::new();
        for entry in &entries {
            if entry.name.trim().is_empty() {
                return Err(Error::Config("Feed name cannot be empty".to_string()));
            }
            if !is_valid_cache_name(&entry.name) {
                return Err(Error::Config(format!(
                    "Feed name '{}' cannot be used as a cache file name",
                    entry.name
                )));
            }
            if !seen.insert(entry.name.as_str()) {
                return Err(Error::Config(format!("Duplicate feed name '{}'", entry.name)));
            }
            if url::Url::parse(&entry.url).is_err() {
                warn!("Feed '{}' has an unparseable URL: {}", entry.name, entry.url);
            }
        }

        Ok(Self {
            path,
            entries: entries.into(),
        })
    }

    fn read_entries(path: &Path) -> Result<Vec<RegistryEntry>> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Storage(format!("Failed to read registry '{}': {}", path.display(), e))
        })?;

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        Ok(serde_yaml::from_str(&content)?)
    }

    fn write_entries(path: &Path, entries: &[RegistryEntry]) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Storage(format!(
                    "Failed to create registry directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let yaml = serde_yaml::to_string(entries)?;
        fs::write(path, yaml).map_err(|e| {
            Error::Storage(format!("Failed to write registry '{}': {}", path.display(), e))
        })?;

        info!("Created registry file {}", path.display());
        Ok(())
    }

    pub fn default_entries() -> Vec<RegistryEntry> {
        vec![
            RegistryEntry::new("SpaceFlightNow", "https://spaceflightnow.com/feed/"),
            RegistryEntry::new("The Guardian", "https://www.theguardian.com/international/rss"),
            RegistryEntry::new("Heise Online", "https://www.heise.de/newsticker/heise-atom.xml"),
            RegistryEntry::new("reddit", "https://www.reddit.com/.rss"),
            RegistryEntry::new("New York Times", "http://rss.nytimes.com/services/xml/rss/nyt/World.xml"),
        ]
    }

    pub fn list(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_bootstrap_writes_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config").join("feeds.yml");

        let store = RegistryStore::load(&path).unwrap();

        assert!(path.exists());
        assert_eq!(store.len(), 5);
        assert!(store.contains("SpaceFlightNow"));
        assert!(store.contains("New York Times"));
        assert_eq!(store.path(), Some(path.as_path()));
    }

    #[test]
    fn test_bootstrap_file_is_reloaded_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("feeds.yml");

        let first = RegistryStore::load(&path).unwrap();
        let second = RegistryStore::load(&path).unwrap();

        assert_eq!(first.list(), second.list());
    }

    #[test]
    fn test_existing_file_with_lowercase_keys() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("feeds.yml");
        fs::write(&path, "- name: A\n  url: http://x\n- Name: B\n  URL: https://y/rss\n").unwrap();

        let store = RegistryStore::load(&path).unwrap();

        assert_eq!(store.list(), &[RegistryEntry::new("A", "http://x"), RegistryEntry::new("B", "https://y/rss")]);
        assert_eq!(store.get("B").unwrap().url, "https://y/rss");
        assert!(store.get("C").is_none());
    }

    #[test]
    fn test_empty_file_is_an_empty_registry() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("feeds.yml");
        fs::write(&path, "").unwrap();

        assert!(RegistryStore::load(&path).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = RegistryStore::from_entries(vec![
            RegistryEntry::new("A", "http://x"),
            RegistryEntry::new("A", "http://y"),
        ]);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_names_without_a_cache_file_rejected() {
        for name in ["BBC/World", ".hidden", "back\\slash", "nul\0byte"] {
            let result = RegistryStore::from_entries(vec![RegistryEntry::new(name, "http://x")]);
            assert!(matches!(result, Err(Error::Config(_))), "{:?} was accepted", name);
        }
    }

    #[test]
    fn test_file_with_unusable_name_fails_to_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("feeds.yml");
        fs::write(&path, "- Name: BBC/World\n  URL: http://feeds.bbci.co.uk/news/world/rss.xml\n").unwrap();

        assert!(matches!(RegistryStore::load(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_malformed_yaml_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("feeds.yml");
        fs::write(&path, "name: [unterminated").unwrap();

        assert!(matches!(RegistryStore::load(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_json_uses_legacy_field_names() {
        let json = serde_json::to_string(&RegistryEntry::new("reddit", "https://www.reddit.com/.rss")).unwrap();
        assert_eq!(json, r#"{"Name":"reddit","URL":"https://www.reddit.com/.rss"}"#);
    }
}
