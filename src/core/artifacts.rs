use std::io::Write;
use std::path::{Component, Path, PathBuf};

use ignore::WalkBuilder;
use tempfile::NamedTempFile;

use crate::error::{DocwrightError, Result};

/// Replace `path` with `bytes` so readers see either the old or the new file
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut temp = NamedTempFile::new_in(&dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Rendered pages under the docs directory
#[derive(Debug, Clone)]
pub struct PageArtifacts {
    root: PathBuf,
}

impl PageArtifacts {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// On-disk location of a page; page paths must stay inside the docs root
    pub fn locate(&self, page: &str) -> Result<PathBuf> {
        let relative = Path::new(page);
        let escapes = relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)));
        if page.is_empty() || escapes {
            return Err(DocwrightError::FileSystem(format!(
                "Page path {} escapes the docs directory",
                page
            )));
        }
        Ok(self.root.join(relative))
    }

    pub async fn load(&self, page: &str) -> Result<String> {
        let path = self.locate(page)?;
        Ok(tokio::fs::read_to_string(path).await?)
    }

    pub async fn store(&self, page: &str, content: &str) -> Result<()> {
        let path = self.locate(page)?;
        let bytes = content.as_bytes().to_vec();
        tokio::task::spawn_blocking(move || write_atomic(&path, &bytes)).await??;
        Ok(())
    }

    /// Delete a page that no longer has a source; missing files are fine
    pub async fn remove(&self, page: &str) -> Result<()> {
        let path = self.locate(page)?;
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Every `.md` page on disk under `subdir`, as page paths relative to the root
    pub fn list_pages(&self, subdir: &str) -> Vec<String> {
        let dir = self.root.join(subdir);
        if !dir.is_dir() {
            return Vec::new();
        }

        let mut pages: Vec<String> = WalkBuilder::new(&dir)
            .standard_filters(false)
            .build()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map_or(false, |t| t.is_file()))
            .filter(|entry| entry.path().extension().map_or(false, |ext| ext == "md"))
            .filter_map(|entry| {
                let relative = entry.path().strip_prefix(&self.root).ok()?;
                let parts: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();
                Some(parts?.join("/"))
            })
            .collect();
        pages.sort();
        pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = PageArtifacts::new(dir.path());

        artifacts.store("files/src/a.py.md", "# a\n").await.unwrap();
        assert_eq!(artifacts.load("files/src/a.py.md").await.unwrap(), "# a\n");

        artifacts.store("files/src/a.py.md", "# a v2\n").await.unwrap();
        assert_eq!(artifacts.load("files/src/a.py.md").await.unwrap(), "# a v2\n");
    }

    #[tokio::test]
    async fn test_missing_page_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = PageArtifacts::new(dir.path());
        assert!(artifacts.load("index.md").await.is_err());
    }

    #[test]
    fn test_rejects_escaping_paths() {
        let artifacts = PageArtifacts::new("docs");
        assert!(artifacts.locate("../secrets.md").is_err());
        assert!(artifacts.locate("/etc/passwd").is_err());
        assert!(artifacts.locate("").is_err());
        assert_eq!(artifacts.locate("files/a.md").unwrap(), PathBuf::from("docs/files/a.md"));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = PageArtifacts::new(dir.path());
        artifacts.store("old.md", "x").await.unwrap();

        artifacts.remove("old.md").await.unwrap();
        artifacts.remove("old.md").await.unwrap();
        assert!(!dir.path().join("old.md").exists());
    }

    #[tokio::test]
    async fn test_list_pages_under_subdir() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = PageArtifacts::new(dir.path());
        artifacts.store("index.md", "x").await.unwrap();
        artifacts.store("files/src/b.py.md", "x").await.unwrap();
        artifacts.store("files/src/a.py.md", "x").await.unwrap();
        artifacts.store("files/notes.txt", "x").await.unwrap();

        assert_eq!(artifacts.list_pages("files"), ["files/src/a.py.md", "files/src/b.py.md"]);
        assert!(artifacts.list_pages("missing").is_empty());
    }
}
