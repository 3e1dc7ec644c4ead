//! Process-wide key-value store shared by the page side and the panel.
//!
//! One JSON file holds every key. Writes go through an atomic flush
//! (serialize to `.tmp`, then rename) so a kill mid-write never corrupts the
//! store. Finding lists carry a version stamp; a write whose expected version
//! no longer matches is rejected instead of silently clobbering a concurrent
//! writer.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::Finding;

pub const DEFAULT_STORE_FILE: &str = ".vulntag-store.json";

pub const PROJECT_ID_KEY: &str = "vt_project_id";
pub const PROJECT_KEY_KEY: &str = "vt_project_key";
pub const PROJECT_NAME_KEY: &str = "vt_project_name";

/// Finding list plus its concurrency stamp.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersionedFindings {
    pub version: u64,
    pub items: Vec<Finding>,
}

/// A rejected list write: the stored version moved past the reader's copy.
#[derive(Debug)]
pub struct VersionConflict {
    pub key: String,
    pub expected: u64,
    pub found: u64,
}

impl fmt::Display for VersionConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "finding list for '{}' changed underneath the writer (expected v{}, found v{})",
            self.key, self.expected, self.found
        )
    }
}

impl std::error::Error for VersionConflict {}

pub struct SyncStore {
    path: PathBuf,
    entries: BTreeMap<String, Value>,
}

impl SyncStore {
    /// Opens the store file, or an empty store when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        let entries = match fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("corrupt store file {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()))
            }
        };
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// Atomic flush: serialize to `.tmp`, then rename over the real file.
    fn persist(&self) -> Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&tmp, &json)
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn set_value(&mut self, key: &str, value: Value) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        self.persist()
    }

    pub fn remove_value(&mut self, key: &str) -> Result<()> {
        if self.entries.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }

    /// Reads the finding list for a page key. A bare array (the layout the
    /// extension era wrote) reads as version 0.
    pub fn findings(&self, page_key: &str) -> VersionedFindings {
        match self.entries.get(page_key) {
            Some(value @ Value::Array(_)) => VersionedFindings {
                version: 0,
                items: serde_json::from_value(value.clone()).unwrap_or_default(),
            },
            Some(value) => serde_json::from_value(value.clone()).unwrap_or_default(),
            None => VersionedFindings::default(),
        }
    }

    /// Writes the full list back, guarded by the version read beforehand.
    /// Returns the new version on success.
    pub fn put_findings(
        &mut self,
        page_key: &str,
        items: Vec<Finding>,
        expected_version: u64,
    ) -> Result<u64> {
        let current = self.findings(page_key).version;
        if current != expected_version {
            return Err(VersionConflict {
                key: page_key.to_string(),
                expected: expected_version,
                found: current,
            }
            .into());
        }
        let next = current + 1;
        let value = serde_json::to_value(VersionedFindings {
            version: next,
            items,
        })?;
        self.set_value(page_key, value)?;
        Ok(next)
    }

    /// Read-modify-write against the finding list, retrying once when another
    /// writer slipped in between the read and the write.
    pub fn update_findings<F>(&mut self, page_key: &str, mut apply: F) -> Result<VersionedFindings>
    where
        F: FnMut(&mut Vec<Finding>),
    {
        for attempt in 0..2 {
            let mut record = self.findings(page_key);
            apply(&mut record.items);
            match self.put_findings(page_key, record.items.clone(), record.version) {
                Ok(version) => {
                    record.version = version;
                    return Ok(record);
                }
                Err(e) if attempt == 0 && e.is::<VersionConflict>() => {
                    log::warn!("retrying finding list write for '{}': {}", page_key, e);
                }
                Err(e) => return Err(e),
            }
        }
        unreachable!("both write attempts returned without resolution")
    }

    pub fn enabled_key(page_key: &str) -> String {
        format!("{}:enabled", page_key)
    }

    /// Per-page rendering flag; absent means enabled.
    pub fn enabled(&self, page_key: &str) -> bool {
        self.entries
            .get(&Self::enabled_key(page_key))
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }

    pub fn set_enabled(&mut self, page_key: &str, enabled: bool) -> Result<()> {
        self.set_value(&Self::enabled_key(page_key), Value::Bool(enabled))
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.entries
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    pub fn set_string(&mut self, key: &str, value: &str) -> Result<()> {
        self.set_value(key, Value::String(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Finding, FindingForm};
    use tempfile::TempDir;

    fn open_store(dir: &TempDir) -> SyncStore {
        SyncStore::load(&dir.path().join("store.json")).unwrap()
    }

    fn sample_finding(selector: &str) -> Finding {
        Finding::from_form(FindingForm::default(), selector, "https://example.com/app")
    }

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        assert!(store.findings("https://example.com/app").items.is_empty());
        assert!(store.enabled("https://example.com/app"));
    }

    #[test]
    fn test_findings_round_trip_survives_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        {
            let mut store = SyncStore::load(&path).unwrap();
            store
                .update_findings("https://example.com/app", |items| {
                    items.push(sample_finding("#search"))
                })
                .unwrap();
        }
        let store = SyncStore::load(&path).unwrap();
        let record = store.findings("https://example.com/app");
        assert_eq!(record.version, 1);
        assert_eq!(record.items[0].selector, "#search");
    }

    #[test]
    fn test_stale_write_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut store = open_store(&dir);
        let key = "https://example.com/app";
        store.put_findings(key, vec![sample_finding("#a")], 0).unwrap();
        let err = store
            .put_findings(key, vec![sample_finding("#b")], 0)
            .unwrap_err();
        assert!(err.is::<VersionConflict>());
        // The guarded write left the stored list untouched.
        assert_eq!(store.findings(key).items[0].selector, "#a");
    }

    #[test]
    fn test_legacy_bare_array_reads_as_version_zero() {
        let dir = TempDir::new().unwrap();
        let mut store = open_store(&dir);
        let key = "https://example.com/legacy";
        let legacy = serde_json::to_value(vec![sample_finding("#old")]).unwrap();
        store.set_value(key, legacy).unwrap();

        let record = store.findings(key);
        assert_eq!(record.version, 0);
        assert_eq!(record.items.len(), 1);

        // The next write upgrades the layout to the versioned wrapper.
        store
            .update_findings(key, |items| items.push(sample_finding("#new")))
            .unwrap();
        assert_eq!(store.findings(key).version, 1);
        assert_eq!(store.findings(key).items.len(), 2);
    }

    #[test]
    fn test_enabled_flag_lifecycle() {
        let dir = TempDir::new().unwrap();
        let mut store = open_store(&dir);
        let key = "https://example.com/app";
        assert!(store.enabled(key));
        store.set_enabled(key, false).unwrap();
        assert!(!store.enabled(key));
        // The flag never touches the finding list.
        assert!(store.findings(key).items.is_empty());
    }

    #[test]
    fn test_project_identity_keys_are_global_strings() {
        let dir = TempDir::new().unwrap();
        let mut store = open_store(&dir);
        store.set_string(PROJECT_ID_KEY, "prj_ab12cd34").unwrap();
        store.set_string(PROJECT_KEY_KEY, "VT-1-deadbeef").unwrap();
        assert_eq!(store.get_string(PROJECT_ID_KEY).unwrap(), "prj_ab12cd34");
        assert_eq!(store.get_string(PROJECT_NAME_KEY), None);
    }
}
