//! Durable record of generated pages
//!
//! A run sees the manifest twice: `ManifestSnapshot` is the previous run's
//! state, loaded once and read-only; `ManifestRecorder` accumulates this run's
//! entries and can only be written to. The two are never merged mid-run, so a
//! page can never observe another page's fresh entry.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{DocwrightError, Result};
use super::artifacts::write_atomic;
use super::fingerprint::content_hash;
use super::indexer::FileHashes;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineRange {
    pub start_line: usize,
    pub end_line: usize,
}

/// What one page was generated from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageStatus {
    pub source_files: Vec<String>,
    pub source_hashes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_line_info: Option<BTreeMap<String, LineRange>>,
    pub content_hash: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationManifest {
    pub pages: BTreeMap<String, PageStatus>,
}

impl GenerationManifest {
    /// Structural checks serde cannot express
    fn validate(&self) -> std::result::Result<(), String> {
        for (page, status) in &self.pages {
            if page.is_empty() {
                return Err("empty page path".to_string());
            }
            if status.content_hash.is_empty() {
                return Err(format!("page {} has no content hash", page));
            }
            if let Some(stray) = status
                .source_hashes
                .keys()
                .find(|path| !status.source_files.contains(*path))
            {
                return Err(format!("page {} hashes unlisted source {}", page, stray));
            }
        }
        Ok(())
    }
}

/// Read-only view of the previous run's manifest
#[derive(Debug, Clone)]
pub struct ManifestSnapshot(Arc<GenerationManifest>);

impl ManifestSnapshot {
    pub fn new(manifest: GenerationManifest) -> Self {
        Self(Arc::new(manifest))
    }

    pub fn page(&self, path: &str) -> Option<&PageStatus> {
        self.0.pages.get(path)
    }

    pub fn page_paths(&self) -> impl Iterator<Item = &str> {
        self.0.pages.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.pages.is_empty()
    }
}

/// Write-only accumulator for the current run
///
/// Every task owns a distinct page path, so one mutex around the map is enough.
#[derive(Debug)]
pub struct ManifestRecorder {
    hashes: FileHashes,
    pages: Mutex<BTreeMap<String, PageStatus>>,
}

impl ManifestRecorder {
    pub fn new(hashes: FileHashes) -> Self {
        Self {
            hashes,
            pages: Mutex::new(BTreeMap::new()),
        }
    }

    /// Snapshot the run-wide hashes of `source_files` and the page body into a
    /// fresh entry, replacing whatever was recorded for `page` before
    pub fn record_page_status(
        &self,
        page: &str,
        source_files: &[String],
        content: &str,
        line_info: Option<BTreeMap<String, LineRange>>,
    ) -> PageStatus {
        let source_hashes = source_files
            .iter()
            .filter_map(|path| {
                self.hashes
                    .get(path)
                    .map(|hash| (path.clone(), hash.to_string()))
            })
            .collect();

        let status = PageStatus {
            source_files: source_files.to_vec(),
            source_hashes,
            source_line_info: line_info,
            content_hash: content_hash(content),
            generated_at: Utc::now(),
        };

        self.insert(page, status.clone());
        status
    }

    /// Keep a reused page's previous entry in this run's manifest
    pub fn carry_forward(&self, page: &str, status: PageStatus) {
        self.insert(page, status);
    }

    fn insert(&self, page: &str, status: PageStatus) {
        let mut pages = match self.pages.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        pages.insert(page.to_string(), status);
    }

    /// Manifest holding everything recorded so far
    pub fn finish(&self) -> GenerationManifest {
        let pages = match self.pages.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        GenerationManifest {
            pages: pages.clone(),
        }
    }
}

/// Owns the manifest's on-disk form
#[derive(Debug, Clone)]
pub struct BuildStatusStore {
    path: PathBuf,
}

impl BuildStatusStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Previous manifest, or `None` when missing, unreadable or malformed
    pub fn load(&self) -> Option<ManifestSnapshot> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No manifest at {}, starting from scratch", self.path.display());
                return None;
            }
            Err(e) => {
                warn!("Cannot read manifest {}: {}; rebuilding everything", self.path.display(), e);
                return None;
            }
        };

        let manifest: GenerationManifest = match serde_json::from_str(&content) {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!("Ignoring corrupt manifest {}: {}", self.path.display(), e);
                return None;
            }
        };

        if let Err(reason) = manifest.validate() {
            warn!("Ignoring invalid manifest {}: {}", self.path.display(), reason);
            return None;
        }

        debug!("Loaded manifest with {} pages", manifest.pages.len());
        Some(ManifestSnapshot::new(manifest))
    }

    /// Atomically replace the manifest on disk
    pub fn save(&self, manifest: &GenerationManifest) -> Result<()> {
        let json = serde_json::to_string_pretty(manifest)?;
        write_atomic(&self.path, json.as_bytes()).map_err(|source| DocwrightError::ManifestPersist {
            path: self.path.clone(),
            source,
        })?;

        info!("Saved manifest with {} pages to {}", manifest.pages.len(), self.path.display());
        Ok(())
    }

    /// Accumulator for a new run over the given hash table
    pub fn begin_run(&self, hashes: FileHashes) -> ManifestRecorder {
        ManifestRecorder::new(hashes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hashes(pairs: &[(&str, &str)]) -> FileHashes {
        pairs
            .iter()
            .map(|(path, hash)| (path.to_string(), hash.to_string()))
            .collect()
    }

    fn files(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_record_snapshots_known_hashes() {
        let recorder = ManifestRecorder::new(hashes(&[("a.py", "h1"), ("b.py", "h2")]));
        let status = recorder.record_page_status("files/a.md", &files(&["a.py", "gone.py"]), "body", None);

        assert_eq!(status.source_files, files(&["a.py", "gone.py"]));
        assert_eq!(status.source_hashes.len(), 1);
        assert_eq!(status.source_hashes["a.py"], "h1");
        assert_eq!(status.content_hash, content_hash("body"));
    }

    #[test]
    fn test_record_replaces_previous_entry() {
        let recorder = ManifestRecorder::new(hashes(&[("a.py", "h1"), ("b.py", "h2")]));
        recorder.record_page_status("page.md", &files(&["a.py"]), "one", None);
        recorder.record_page_status("page.md", &files(&["b.py"]), "two", None);

        let manifest = recorder.finish();
        assert_eq!(manifest.pages.len(), 1);
        let status = &manifest.pages["page.md"];
        assert_eq!(status.source_files, files(&["b.py"]));
        assert!(!status.source_hashes.contains_key("a.py"));
        assert_eq!(status.content_hash, content_hash("two"));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = BuildStatusStore::new(dir.path().join("docs/manifest.json"));
        let recorder = store.begin_run(hashes(&[("a.py", "h1")]));
        let line_info = BTreeMap::from([(
            "a.py".to_string(),
            LineRange {
                start_line: 1,
                end_line: 12,
            },
        )]);
        recorder.record_page_status("files/a.py.md", &files(&["a.py"]), "body", Some(line_info));

        store.save(&recorder.finish()).unwrap();
        let snapshot = store.load().unwrap();

        let page = snapshot.page("files/a.py.md").unwrap();
        assert_eq!(page.source_hashes["a.py"], "h1");
        assert_eq!(page.source_line_info.as_ref().unwrap()["a.py"].end_line, 12);
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_wire_format_field_names() {
        let recorder = ManifestRecorder::new(hashes(&[("a.py", "h1")]));
        recorder.record_page_status("p.md", &files(&["a.py"]), "body", None);
        let json = serde_json::to_value(recorder.finish()).unwrap();

        let page = &json["pages"]["p.md"];
        assert!(page["sourceFiles"].is_array());
        assert_eq!(page["sourceHashes"]["a.py"], "h1");
        assert!(page["contentHash"].is_string());
        assert!(page["generatedAt"].is_string());
        assert!(page.get("sourceLineInfo").is_none());
    }

    #[test]
    fn test_missing_manifest_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        assert!(BuildStatusStore::new(dir.path().join("none.json")).load().is_none());
    }

    #[test]
    fn test_corrupt_manifest_is_absent_and_recoverable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        let store = BuildStatusStore::new(&path);

        for garbage in [
            "{ not json",
            r#"{"pages": []}"#,
            r#"{"pages": {"p.md": {"sourceFiles": ["a"], "sourceHashes": {"b": "x"}, "contentHash": "c", "generatedAt": "2024-01-01T00:00:00Z"}}}"#,
            r#"{"pages": {"p.md": {"sourceFiles": [], "sourceHashes": {}, "contentHash": "", "generatedAt": "2024-01-01T00:00:00Z"}}}"#,
        ] {
            std::fs::write(&path, garbage).unwrap();
            assert!(store.load().is_none(), "accepted {}", garbage);
        }

        store.save(&GenerationManifest::default()).unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_failure_is_fatal_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "a file, not a directory").unwrap();

        let store = BuildStatusStore::new(blocker.join("manifest.json"));
        let err = store.save(&GenerationManifest::default()).unwrap_err();
        assert!(matches!(err, DocwrightError::ManifestPersist { .. }));
    }
}
