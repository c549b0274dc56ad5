//! Per-page staleness decisions and bounded regeneration
//!
//! Every page is dispatched as its own task. Reuse is plain local I/O and runs
//! unbounded; only calls into the page generator wait on the semaphore.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use super::artifacts::PageArtifacts;
use super::fingerprint::content_hash;
use super::indexer::FileHashes;
use super::status::{LineRange, ManifestRecorder, ManifestSnapshot, PageStatus};
use super::xref::CrossReferenceIndex;

/// One page to produce in this run
#[derive(Debug, Clone, Serialize)]
pub struct PageRequest {
    /// Page path relative to the docs directory
    pub path: String,

    /// Source files whose content the page depends on
    pub source_files: Vec<String>,

    pub line_info: Option<BTreeMap<String, LineRange>>,

    /// Entity names registered for cross-references
    pub entities: Vec<String>,

    /// Data handed to the page generator
    pub context: serde_json::Value,
}

/// Why a page is (or is not) regenerated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Staleness {
    NoPriorManifest,
    NoPriorPageEntry,
    HashMismatch { source: String },
    SourceSetChanged,
    Reusable,
}

impl Staleness {
    pub fn needs_regeneration(&self) -> bool {
        !matches!(self, Staleness::Reusable)
    }
}

/// Decide whether `request` can reuse what the previous run produced
pub fn classify(
    previous: Option<&ManifestSnapshot>,
    request: &PageRequest,
    hashes: &FileHashes,
) -> Staleness {
    let Some(previous) = previous else {
        return Staleness::NoPriorManifest;
    };
    let Some(prior) = previous.page(&request.path) else {
        return Staleness::NoPriorPageEntry;
    };

    for source in &request.source_files {
        let current = hashes.get(source);
        let recorded = prior.source_hashes.get(source).map(String::as_str);
        match (current, recorded) {
            (Some(current), Some(recorded)) if current == recorded => {}
            _ => {
                return Staleness::HashMismatch {
                    source: source.clone(),
                }
            }
        }
    }

    let current: BTreeSet<&str> = request.source_files.iter().map(String::as_str).collect();
    let recorded: BTreeSet<&str> = prior.source_files.iter().map(String::as_str).collect();
    if current != recorded {
        return Staleness::SourceSetChanged;
    }

    Staleness::Reusable
}

/// Produces the body of a page; typically slow, rate limited or billed
#[async_trait]
pub trait PageGenerator: Send + Sync {
    async fn generate_page(&self, request: &PageRequest) -> Result<String>;
}

/// Stops new page dispatches once tripped; running tasks finish normally
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PageOutcome {
    Regenerated,
    Reused,
    Failed(String),
}

/// What happened to every page of a run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub decisions: BTreeMap<String, Staleness>,
    pub regenerated: Vec<String>,
    pub reused: Vec<String>,
    /// (page, reason)
    pub failed: Vec<(String, String)>,
    /// Pages never started because the run was cancelled
    pub skipped: Vec<String>,
}

impl RunReport {
    pub fn stale_count(&self) -> usize {
        self.decisions
            .values()
            .filter(|decision| decision.needs_regeneration())
            .count()
    }

    fn sort(&mut self) {
        self.regenerated.sort();
        self.reused.sort();
        self.failed.sort();
        self.skipped.sort();
    }
}

pub struct IncrementalScheduler {
    generator: Arc<dyn PageGenerator>,
    artifacts: PageArtifacts,
    semaphore: Arc<Semaphore>,
    cancel: CancelFlag,
}

impl IncrementalScheduler {
    pub fn new(
        generator: Arc<dyn PageGenerator>,
        artifacts: PageArtifacts,
        max_concurrency: usize,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            generator,
            artifacts,
            semaphore: Arc::new(Semaphore::new(max_concurrency.max(1))),
            cancel,
        }
    }

    /// Staleness of every page without touching anything
    pub fn plan(
        &self,
        pages: &[PageRequest],
        previous: Option<&ManifestSnapshot>,
        hashes: &FileHashes,
    ) -> BTreeMap<String, Staleness> {
        pages
            .iter()
            .map(|page| (page.path.clone(), classify(previous, page, hashes)))
            .collect()
    }

    /// Dispatch every page concurrently and wait for all of them
    pub async fn run(
        &self,
        pages: Vec<PageRequest>,
        previous: Option<ManifestSnapshot>,
        hashes: &FileHashes,
        recorder: Arc<ManifestRecorder>,
        xrefs: Arc<CrossReferenceIndex>,
    ) -> RunReport {
        let mut report = RunReport::default();
        let mut handles = Vec::with_capacity(pages.len());
        let mut pending = pages.into_iter();

        while let Some(request) = pending.next() {
            if self.cancel.is_cancelled() {
                info!("Cancellation requested, not starting remaining pages");
                report.skipped.push(request.path);
                report.skipped.extend(pending.by_ref().map(|request| request.path));
                break;
            }

            let decision = classify(previous.as_ref(), &request, hashes);
            debug!("{}: {:?}", request.path, decision);
            report.decisions.insert(request.path.clone(), decision.clone());

            let task = PageTask {
                generator: self.generator.clone(),
                artifacts: self.artifacts.clone(),
                semaphore: self.semaphore.clone(),
                recorder: recorder.clone(),
                xrefs: xrefs.clone(),
                prior: previous
                    .as_ref()
                    .and_then(|snapshot| snapshot.page(&request.path))
                    .cloned(),
            };
            let path = request.path.clone();
            handles.push((path, tokio::spawn(task.run(request, decision))));
        }

        for (path, handle) in handles {
            match handle.await {
                Ok(PageOutcome::Regenerated) => report.regenerated.push(path),
                Ok(PageOutcome::Reused) => report.reused.push(path),
                Ok(PageOutcome::Failed(reason)) => report.failed.push((path, reason)),
                Err(e) => {
                    error!("Page task for {} aborted: {}", path, e);
                    report.failed.push((path, e.to_string()));
                }
            }
        }

        report.sort();
        info!(
            "Pages: {} regenerated, {} reused, {} failed, {} skipped",
            report.regenerated.len(),
            report.reused.len(),
            report.failed.len(),
            report.skipped.len()
        );
        report
    }
}

struct PageTask {
    generator: Arc<dyn PageGenerator>,
    artifacts: PageArtifacts,
    semaphore: Arc<Semaphore>,
    recorder: Arc<ManifestRecorder>,
    xrefs: Arc<CrossReferenceIndex>,
    prior: Option<PageStatus>,
}

impl PageTask {
    async fn run(self, request: PageRequest, decision: Staleness) -> PageOutcome {
        // registration is per run, reused pages included
        self.xrefs.register(&request.path, &request.entities);

        if decision == Staleness::Reusable {
            if let Some(prior) = self.prior.clone() {
                match self.reuse(&request, prior).await {
                    Ok(()) => return PageOutcome::Reused,
                    Err(reason) => {
                        warn!("Cannot reuse {}: {}; regenerating", request.path, reason);
                    }
                }
            }
        }

        self.regenerate(&request).await
    }

    async fn reuse(&self, request: &PageRequest, prior: PageStatus) -> std::result::Result<(), String> {
        let content = self
            .artifacts
            .load(&request.path)
            .await
            .map_err(|e| e.to_string())?;
        if content_hash(&content) != prior.content_hash {
            return Err("page was modified after generation".to_string());
        }
        self.recorder.carry_forward(&request.path, prior);
        Ok(())
    }

    async fn regenerate(&self, request: &PageRequest) -> PageOutcome {
        let content = {
            let _permit = match self.semaphore.acquire().await {
                Ok(permit) => permit,
                Err(e) => return PageOutcome::Failed(e.to_string()),
            };
            match self.generator.generate_page(request).await {
                Ok(content) => content,
                Err(e) => {
                    warn!("Generation failed for {}: {}", request.path, e);
                    return self.fail(request, e.to_string()).await;
                }
            }
        };

        if let Err(e) = self.artifacts.store(&request.path, &content).await {
            warn!("Cannot write {}: {}", request.path, e);
            return self.fail(request, e.to_string()).await;
        }

        self.recorder.record_page_status(
            &request.path,
            &request.source_files,
            &content,
            request.line_info.clone(),
        );
        PageOutcome::Regenerated
    }

    /// A failed page leaves the manifest, so its old file goes too
    async fn fail(&self, request: &PageRequest, reason: String) -> PageOutcome {
        if let Err(e) = self.artifacts.remove(&request.path).await {
            warn!("Cannot remove stale {}: {}", request.path, e);
        }
        PageOutcome::Failed(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::status::{BuildStatusStore, GenerationManifest};
    use crate::error::DocwrightError;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeGenerator {
        calls: Mutex<Vec<String>>,
        fail_on: Option<String>,
        delay_ms: u64,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl PageGenerator for FakeGenerator {
        async fn generate_page(&self, request: &PageRequest) -> Result<String> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            if self.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            self.calls.lock().unwrap().push(request.path.clone());
            if self.fail_on.as_deref() == Some(request.path.as_str()) {
                return Err(DocwrightError::Generation {
                    page: request.path.clone(),
                    reason: "backend unavailable".to_string(),
                });
            }
            Ok(format!("# {}\nfrom {:?}\n", request.path, request.source_files))
        }
    }

    impl FakeGenerator {
        fn calls(&self) -> Vec<String> {
            let mut calls = self.calls.lock().unwrap().clone();
            calls.sort();
            calls
        }
    }

    fn page(path: &str, sources: &[&str]) -> PageRequest {
        PageRequest {
            path: path.to_string(),
            source_files: sources.iter().map(|s| s.to_string()).collect(),
            line_info: None,
            entities: vec![format!("entity_of_{}", path)],
            context: serde_json::Value::Null,
        }
    }

    fn hashes(pairs: &[(&str, &str)]) -> FileHashes {
        pairs
            .iter()
            .map(|(path, hash)| (path.to_string(), hash.to_string()))
            .collect()
    }

    fn snapshot_with(page_path: &str, sources: &[(&str, &str)]) -> ManifestSnapshot {
        let recorder = ManifestRecorder::new(hashes(sources));
        let files: Vec<String> = sources.iter().map(|(p, _)| p.to_string()).collect();
        recorder.record_page_status(page_path, &files, "body", None);
        ManifestSnapshot::new(recorder.finish())
    }

    struct Harness {
        _dir: tempfile::TempDir,
        artifacts: PageArtifacts,
        store: BuildStatusStore,
    }

    fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        Harness {
            artifacts: PageArtifacts::new(dir.path().join("docs")),
            store: BuildStatusStore::new(dir.path().join("docs/manifest.json")),
            _dir: dir,
        }
    }

    async fn run_once(
        harness: &Harness,
        generator: Arc<FakeGenerator>,
        pages: Vec<PageRequest>,
        hashes: &FileHashes,
        concurrency: usize,
    ) -> (RunReport, GenerationManifest, Arc<CrossReferenceIndex>) {
        let scheduler =
            IncrementalScheduler::new(generator, harness.artifacts.clone(), concurrency, CancelFlag::new());
        let previous = harness.store.load();
        let recorder = Arc::new(harness.store.begin_run(hashes.clone()));
        let xrefs = Arc::new(CrossReferenceIndex::new());

        let report = scheduler
            .run(pages, previous, hashes, recorder.clone(), xrefs.clone())
            .await;
        let manifest = recorder.finish();
        harness.store.save(&manifest).unwrap();
        (report, manifest, xrefs)
    }

    #[test]
    fn test_classify_states() {
        let current = hashes(&[("a.py", "h1"), ("b.py", "h2")]);
        let request = page("p.md", &["a.py", "b.py"]);

        assert_eq!(classify(None, &request, &current), Staleness::NoPriorManifest);

        let other_page = snapshot_with("q.md", &[("a.py", "h1")]);
        assert_eq!(classify(Some(&other_page), &request, &current), Staleness::NoPriorPageEntry);

        let same = snapshot_with("p.md", &[("b.py", "h2"), ("a.py", "h1")]);
        assert_eq!(classify(Some(&same), &request, &current), Staleness::Reusable);

        let changed = snapshot_with("p.md", &[("a.py", "h1"), ("b.py", "old")]);
        assert_eq!(
            classify(Some(&changed), &request, &current),
            Staleness::HashMismatch {
                source: "b.py".to_string()
            }
        );

        let narrower = snapshot_with("p.md", &[("a.py", "h1")]);
        assert_eq!(
            classify(Some(&narrower), &request, &current),
            Staleness::HashMismatch {
                source: "b.py".to_string()
            }
        );

        let wider = snapshot_with("p.md", &[("a.py", "h1"), ("b.py", "h2"), ("c.py", "h3")]);
        assert_eq!(classify(Some(&wider), &request, &current), Staleness::SourceSetChanged);

        let unknown_now = hashes(&[("a.py", "h1")]);
        assert_eq!(
            classify(Some(&same), &request, &unknown_now),
            Staleness::HashMismatch {
                source: "b.py".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_unchanged_inputs_are_reused() {
        let harness = harness();
        let current = hashes(&[("a.py", "h1"), ("b.py", "h2")]);
        let pages = || vec![page("a.md", &["a.py"]), page("b.md", &["b.py"]), page("index.md", &["a.py", "b.py"])];

        let first = Arc::new(FakeGenerator::default());
        let (report, manifest, _) = run_once(&harness, first.clone(), pages(), &current, 2).await;
        assert_eq!(report.regenerated, ["a.md", "b.md", "index.md"]);
        assert_eq!(report.stale_count(), 3);
        assert_eq!(manifest.pages.len(), 3);

        let second = Arc::new(FakeGenerator::default());
        let (report, manifest, xrefs) = run_once(&harness, second.clone(), pages(), &current, 2).await;
        assert!(second.calls().is_empty());
        assert_eq!(report.reused, ["a.md", "b.md", "index.md"]);
        assert_eq!(report.stale_count(), 0);
        assert_eq!(manifest.pages.len(), 3);
        // reused pages still register their entities
        assert_eq!(xrefs.pages_for("entity_of_a.md"), ["a.md"]);
        assert_eq!(xrefs.snapshot().len(), 3);
    }

    #[tokio::test]
    async fn test_single_change_regenerates_only_dependents() {
        let harness = harness();
        let pages = || vec![page("a.md", &["a.py"]), page("b.md", &["b.py"]), page("index.md", &["a.py", "b.py"])];

        let before = hashes(&[("a.py", "h1"), ("b.py", "h2")]);
        run_once(&harness, Arc::new(FakeGenerator::default()), pages(), &before, 2).await;

        let after = hashes(&[("a.py", "h1-changed"), ("b.py", "h2")]);
        let generator = Arc::new(FakeGenerator::default());
        let (report, _, _) = run_once(&harness, generator.clone(), pages(), &after, 2).await;

        assert_eq!(generator.calls(), ["a.md", "index.md"]);
        assert_eq!(report.regenerated, ["a.md", "index.md"]);
        assert_eq!(report.reused, ["b.md"]);
    }

    #[tokio::test]
    async fn test_generation_failure_is_isolated() {
        let harness = harness();
        let current = hashes(&[("a.py", "h1"), ("b.py", "h2")]);
        let generator = Arc::new(FakeGenerator {
            fail_on: Some("b.md".to_string()),
            ..Default::default()
        });

        let (report, manifest, _) = run_once(
            &harness,
            generator,
            vec![page("a.md", &["a.py"]), page("b.md", &["b.py"])],
            &current,
            1,
        )
        .await;

        assert_eq!(report.regenerated, ["a.md"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "b.md");
        assert!(manifest.pages.contains_key("a.md"));
        assert!(!manifest.pages.contains_key("b.md"));
        assert!(harness.artifacts.locate("b.md").map(|p| !p.exists()).unwrap());
    }

    #[tokio::test]
    async fn test_failed_regeneration_removes_previous_page() {
        let harness = harness();
        let before = hashes(&[("b.py", "h2")]);
        run_once(&harness, Arc::new(FakeGenerator::default()), vec![page("b.md", &["b.py"])], &before, 1).await;
        assert!(harness.artifacts.locate("b.md").unwrap().exists());

        let after = hashes(&[("b.py", "h2-changed")]);
        let generator = Arc::new(FakeGenerator {
            fail_on: Some("b.md".to_string()),
            ..Default::default()
        });
        let (report, manifest, _) = run_once(&harness, generator, vec![page("b.md", &["b.py"])], &after, 1).await;

        assert_eq!(report.failed.len(), 1);
        assert!(!manifest.pages.contains_key("b.md"));
        // manifest and disk agree: no untracked file left behind
        assert!(!harness.artifacts.locate("b.md").unwrap().exists());
    }

    #[tokio::test]
    async fn test_missing_artifact_falls_back_to_regeneration() {
        let harness = harness();
        let current = hashes(&[("a.py", "h1")]);
        run_once(&harness, Arc::new(FakeGenerator::default()), vec![page("a.md", &["a.py"])], &current, 1).await;

        harness.artifacts.remove("a.md").await.unwrap();

        let generator = Arc::new(FakeGenerator::default());
        let (report, manifest, _) =
            run_once(&harness, generator.clone(), vec![page("a.md", &["a.py"])], &current, 1).await;

        assert_eq!(report.decisions["a.md"], Staleness::Reusable);
        assert_eq!(report.regenerated, ["a.md"]);
        assert_eq!(generator.calls(), ["a.md"]);
        assert!(manifest.pages.contains_key("a.md"));
    }

    #[tokio::test]
    async fn test_edited_artifact_is_regenerated() {
        let harness = harness();
        let current = hashes(&[("a.py", "h1")]);
        run_once(&harness, Arc::new(FakeGenerator::default()), vec![page("a.md", &["a.py"])], &current, 1).await;

        harness.artifacts.store("a.md", "hand edited").await.unwrap();

        let generator = Arc::new(FakeGenerator::default());
        let (report, _, _) = run_once(&harness, generator, vec![page("a.md", &["a.py"])], &current, 1).await;
        assert_eq!(report.regenerated, ["a.md"]);
        assert_ne!(harness.artifacts.load("a.md").await.unwrap(), "hand edited");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_bounded() {
        let harness = harness();
        let sources: Vec<(String, String)> = (0..8).map(|i| (format!("f{}.py", i), format!("h{}", i))).collect();
        let current: FileHashes = sources.iter().cloned().collect();
        let pages: Vec<PageRequest> = sources
            .iter()
            .map(|(file, _)| page(&format!("{}.md", file), &[file.as_str()]))
            .collect();

        let generator = Arc::new(FakeGenerator {
            delay_ms: 30,
            ..Default::default()
        });
        let (report, _, _) = run_once(&harness, generator.clone(), pages, &current, 2).await;

        assert_eq!(report.regenerated.len(), 8);
        let peak = generator.peak.load(Ordering::SeqCst);
        assert!(peak <= 2, "peak concurrency was {}", peak);
        assert!(peak >= 1);
    }

    #[tokio::test]
    async fn test_cancelled_run_starts_nothing() {
        let harness = harness();
        let current = hashes(&[("a.py", "h1")]);
        let cancel = CancelFlag::new();
        cancel.cancel();

        let generator = Arc::new(FakeGenerator::default());
        let scheduler = IncrementalScheduler::new(generator.clone(), harness.artifacts.clone(), 1, cancel);
        let recorder = Arc::new(harness.store.begin_run(current.clone()));
        let report = scheduler
            .run(
                vec![page("a.md", &["a.py"]), page("b.md", &["a.py"])],
                None,
                &current,
                recorder.clone(),
                Arc::new(CrossReferenceIndex::new()),
            )
            .await;

        assert_eq!(report.skipped, ["a.md", "b.md"]);
        assert!(generator.calls().is_empty());
        assert!(recorder.finish().pages.is_empty());
    }
}
