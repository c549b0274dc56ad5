use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{DocwrightError, Result};
use super::artifacts::{write_atomic, PageArtifacts};
use super::call_graph::{CallGraph, CallGraphExtractor, GraphProjector, Projection, ReverseCallGraph};
use super::indexer::{FileHashes, SourceFile, SourceIndexer};
use super::languages::LanguageRegistry;
use super::noise::{NoiseConfig, NoiseFilter};
use super::pages::{AnalyzedFile, PagePlanner, FILE_PAGES_DIR};
use super::render::TemplateGenerator;
use super::scheduler::{CancelFlag, IncrementalScheduler, PageGenerator, PageRequest, RunReport, Staleness};
use super::status::{BuildStatusStore, ManifestSnapshot};
use super::syntax::TreeSitterAdapter;
use super::xref::CrossReferenceIndex;

/// Aggregated graph and projection written next to the pages
pub const GRAPH_ARTIFACT: &str = "call_graph.json";

/// Snapshot of the source tree taken at the start of a run
pub struct Analysis {
    pub sources: Vec<SourceFile>,
    pub hashes: FileHashes,
    pub files: Vec<AnalyzedFile>,
    pub graph: CallGraph,
    pub reverse: ReverseCallGraph,
    pub projection: Projection,
    pub pages: Vec<PageRequest>,
}

#[derive(Serialize)]
struct GraphArtifact<'a> {
    graph: &'a CallGraph,
    projection: &'a Projection,
    cross_references: BTreeMap<String, Vec<String>>,
}

/// Indexing, extraction and planning; all of it blocking file and parser work
pub struct SourceAnalyzer {
    config: Config,
    root: PathBuf,
    registry: Arc<LanguageRegistry>,
    noise: Arc<NoiseFilter>,
}

impl SourceAnalyzer {
    pub fn new(config: Config, root: PathBuf) -> Self {
        let registry = Arc::new(LanguageRegistry::for_languages(&config.parsing.languages));
        let noise = Arc::new(NoiseFilter::new(
            NoiseConfig::from_registry(&registry).with_settings(&config.noise),
        ));
        Self {
            config,
            root,
            registry,
            noise,
        }
    }

    /// Index, extract and plan; nothing is written
    pub fn analyze(&self) -> Result<Analysis> {
        let indexer = SourceIndexer::new(
            self.registry.clone(),
            self.config.parsing.max_file_size,
            self.config.project.ignore_patterns.clone(),
        );
        let sources = indexer.index(&self.root, &self.config.project.source_dirs)?;
        let hashes = FileHashes::from_sources(&sources);
        info!("📁 Indexed {} source files", sources.len());

        let adapter = TreeSitterAdapter::new(self.registry.clone(), self.config.parsing.max_file_size);
        let extractor = CallGraphExtractor::new(self.registry.clone(), self.noise.clone());
        let files: Vec<AnalyzedFile> = sources
            .iter()
            .map(|source| AnalyzedFile {
                analysis: extractor.analyze_file(&adapter, &source.absolute_path),
                source: source.clone(),
            })
            .collect();

        let mut graph = CallGraph::new();
        let mut reverse = ReverseCallGraph::new();
        for file in &files {
            graph.merge(&file.analysis.graph);
            reverse.add_graph(&file.analysis.graph);
        }
        info!("🔗 Call graph: {} callers, {} edges", graph.len(), graph.edge_count());

        let projection = GraphProjector::new(self.config.graph.max_nodes, self.config.graph.label_budget)
            .project(&graph);
        let pages = PagePlanner::new(&self.config.project.name, &files, &reverse, &projection).plan()?;

        Ok(Analysis {
            sources,
            hashes,
            files,
            graph,
            reverse,
            projection,
            pages,
        })
    }
}

/// Main orchestration engine
pub struct Engine {
    config: Config,
    root: PathBuf,
    analyzer: Arc<SourceAnalyzer>,
    generator: Arc<dyn PageGenerator>,
    cancel: CancelFlag,
}

impl Engine {
    /// Engine over the project at `root` rendering with the tera templates
    pub fn new<P: Into<PathBuf>>(config: Config, root: P) -> Result<Self> {
        let root = root.into();
        let analyzer = Arc::new(SourceAnalyzer::new(config.clone(), root.clone()));

        let template_dir = config
            .generation
            .template_dir
            .as_ref()
            .map(|dir| resolve(&root, dir));
        let generator: Arc<dyn PageGenerator> = Arc::new(TemplateGenerator::new(template_dir.as_deref())?);

        debug!("Loaded configuration: {:?}", config);

        Ok(Self {
            config,
            root,
            analyzer,
            generator,
            cancel: CancelFlag::new(),
        })
    }

    /// Swap in another page generator, e.g. an LLM-backed one
    pub fn with_generator(mut self, generator: Arc<dyn PageGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn docs_dir(&self) -> PathBuf {
        resolve(&self.root, &self.config.project.docs_dir)
    }

    fn status_store(&self) -> BuildStatusStore {
        BuildStatusStore::new(resolve(&self.root, &self.config.manifest_path()))
    }

    /// Index, extract and plan on the calling thread; nothing is written
    pub fn analyze(&self) -> Result<Analysis> {
        self.analyzer.analyze()
    }

    async fn analyze_in_background(&self) -> Result<Analysis> {
        let analyzer = self.analyzer.clone();
        tokio::task::spawn_blocking(move || analyzer.analyze()).await?
    }

    async fn load_previous(&self) -> Result<Option<ManifestSnapshot>> {
        let store = self.status_store();
        Ok(tokio::task::spawn_blocking(move || store.load()).await?)
    }

    /// Full pass; `force` ignores whatever the previous run recorded
    pub async fn generate(&self, force: bool) -> Result<RunReport> {
        info!("🔍 Generating documentation into {}", self.docs_dir().display());
        let previous = if force {
            info!("Forced run, ignoring previous manifest");
            None
        } else {
            self.load_previous().await?
        };
        self.run(previous).await
    }

    /// Incremental pass, or only its decisions when `dry_run` is set
    pub async fn sync(&self, dry_run: bool, fail_on_changes: bool) -> Result<RunReport> {
        info!("🔄 Synchronizing documentation...");

        let report = if dry_run {
            info!("📋 Dry run mode - showing what would be updated");
            RunReport {
                decisions: self.status().await?,
                ..Default::default()
            }
        } else {
            let previous = self.load_previous().await?;
            self.run(previous).await?
        };

        let stale = report.stale_count();
        if fail_on_changes && stale > 0 {
            return Err(DocwrightError::StalePages(stale));
        }
        Ok(report)
    }

    /// Staleness of every page against the stored manifest
    pub async fn status(&self) -> Result<BTreeMap<String, Staleness>> {
        let analysis = self.analyze_in_background().await?;
        let previous = self.load_previous().await?;
        let scheduler = self.scheduler();
        let decisions = scheduler.plan(&analysis.pages, previous.as_ref(), &analysis.hashes);

        for (page, decision) in &decisions {
            if decision.needs_regeneration() {
                info!("  {} would be regenerated: {:?}", page, decision);
            } else {
                debug!("  {} is up to date", page);
            }
        }
        Ok(decisions)
    }

    fn scheduler(&self) -> IncrementalScheduler {
        IncrementalScheduler::new(
            self.generator.clone(),
            PageArtifacts::new(self.docs_dir()),
            self.config.generation.max_concurrency,
            self.cancel.clone(),
        )
    }

    async fn run(&self, previous: Option<ManifestSnapshot>) -> Result<RunReport> {
        let analysis = self.analyze_in_background().await?;
        let store = self.status_store();
        let artifacts = PageArtifacts::new(self.docs_dir());
        let recorder = Arc::new(store.begin_run(analysis.hashes.clone()));
        let xrefs = Arc::new(CrossReferenceIndex::new());
        let planned: BTreeSet<String> = analysis.pages.iter().map(|page| page.path.clone()).collect();

        let report = self
            .scheduler()
            .run(
                analysis.pages.clone(),
                previous.clone(),
                &analysis.hashes,
                recorder.clone(),
                xrefs.clone(),
            )
            .await;

        // pages the run never reached keep their old entry and file
        if let Some(previous) = &previous {
            for page in &report.skipped {
                if let Some(status) = previous.page(page) {
                    recorder.carry_forward(page, status.clone());
                }
            }
        }

        // orphans come from the old manifest and from whatever is on disk,
        // so forced runs and lost manifests still clean up
        let mut orphans: BTreeSet<String> = previous
            .iter()
            .flat_map(|previous| previous.page_paths())
            .filter(|page| !planned.contains(*page))
            .map(str::to_string)
            .collect();
        let lister = artifacts.clone();
        let on_disk = tokio::task::spawn_blocking(move || lister.list_pages(FILE_PAGES_DIR)).await?;
        orphans.extend(on_disk.into_iter().filter(|page| !planned.contains(page)));

        for orphan in &orphans {
            info!("🗑️ Removing page without sources: {}", orphan);
            if let Err(e) = artifacts.remove(orphan).await {
                warn!("Cannot remove {}: {}", orphan, e);
            }
        }

        let manifest = recorder.finish();
        tokio::task::spawn_blocking(move || store.save(&manifest)).await??;

        let artifact = GraphArtifact {
            graph: &analysis.graph,
            projection: &analysis.projection,
            cross_references: xrefs.snapshot(),
        };
        let json = serde_json::to_string_pretty(&artifact)?;
        let graph_path = self.docs_dir().join(GRAPH_ARTIFACT);
        tokio::task::spawn_blocking(move || write_atomic(&graph_path, json.as_bytes())).await??;

        for (page, reason) in &report.failed {
            warn!("❌ {} was not generated: {}", page, reason);
        }
        info!(
            "✅ Documentation pass complete: {} regenerated, {} reused",
            report.regenerated.len(),
            report.reused.len()
        );
        Ok(report)
    }
}

/// `path` under `root` unless it is already absolute
fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
