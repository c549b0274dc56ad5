use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use tracing::{debug, warn};

use crate::error::{DocwrightError, Result};
use super::fingerprint::content_hash;
use super::languages::LanguageRegistry;

/// A source file as seen at the start of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Repository-relative path with `/` separators
    pub path: String,

    /// Location on disk
    pub absolute_path: PathBuf,

    /// Language tag from the registry
    pub language: String,

    /// Fingerprint of the file content
    pub content_hash: String,

    pub line_count: usize,
}

/// Run-wide path -> content hash table, frozen once indexing finishes
#[derive(Debug, Clone, Default)]
pub struct FileHashes(Arc<HashMap<String, String>>);

impl FileHashes {
    pub fn from_sources(sources: &[SourceFile]) -> Self {
        sources
            .iter()
            .map(|file| (file.path.clone(), file.content_hash.clone()))
            .collect()
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.0.get(path).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for FileHashes {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(Arc::new(iter.into_iter().collect()))
    }
}

/// Walks source directories and fingerprints every file a language claims
pub struct SourceIndexer {
    registry: Arc<LanguageRegistry>,
    max_file_size: usize,
    ignore_patterns: Vec<String>,
}

impl SourceIndexer {
    pub fn new(registry: Arc<LanguageRegistry>, max_file_size: usize, ignore_patterns: Vec<String>) -> Self {
        Self {
            registry,
            max_file_size,
            ignore_patterns,
        }
    }

    /// Index `source_dirs` (relative to `root` unless absolute), sorted by path
    pub fn index(&self, root: &Path, source_dirs: &[PathBuf]) -> Result<Vec<SourceFile>> {
        let mut files = Vec::new();

        for dir in source_dirs {
            let dir = if dir.is_absolute() { dir.clone() } else { root.join(dir) };
            if !dir.exists() {
                warn!("Source directory {} does not exist, skipping", dir.display());
                continue;
            }
            self.index_dir(root, &dir, &mut files)?;
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        files.dedup_by(|a, b| a.path == b.path);
        Ok(files)
    }

    fn index_dir(&self, root: &Path, dir: &Path, files: &mut Vec<SourceFile>) -> Result<()> {
        let mut overrides = OverrideBuilder::new(dir);
        for pattern in &self.ignore_patterns {
            overrides
                .add(&format!("!{}", pattern))
                .map_err(|e| DocwrightError::Config(format!("Bad ignore pattern {}: {}", pattern, e)))?;
        }
        let overrides = overrides
            .build()
            .map_err(|e| DocwrightError::Config(e.to_string()))?;

        // Use ignore crate to respect .gitignore and custom patterns
        let walker = WalkBuilder::new(dir)
            .hidden(false)
            .git_ignore(true)
            .overrides(overrides)
            .build();

        for entry in walker {
            let entry = entry.map_err(|e| DocwrightError::FileSystem(e.to_string()))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let Some(language) = self.registry.detect(path) else {
                continue;
            };

            let content = match std::fs::read_to_string(path) {
                Ok(content) => content,
                Err(e) => {
                    debug!("Skipping unreadable {}: {}", path.display(), e);
                    continue;
                }
            };
            if content.len() > self.max_file_size {
                debug!("Skipping {}: exceeds maximum size limit", path.display());
                continue;
            }

            files.push(SourceFile {
                path: relative_path(root, path),
                absolute_path: path.to_path_buf(),
                language: language.language_name().to_string(),
                content_hash: content_hash(&content),
                line_count: content.lines().count(),
            });
        }

        Ok(())
    }
}

/// `path` relative to `root`, `/`-separated
pub fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
