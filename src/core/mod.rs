mod artifacts;
mod engine;
mod fingerprint;
mod indexer;
mod noise;
mod pages;
mod render;
mod scheduler;
mod status;
mod syntax;
mod xref;

// Call graph extraction, aggregation and projection
pub mod call_graph;

// Language-specific syntax rules
pub mod languages;

pub use artifacts::{write_atomic, PageArtifacts};
pub use fingerprint::{content_hash, FINGERPRINT_LEN};
pub use indexer::{relative_path, FileHashes, SourceFile, SourceIndexer};
pub use noise::{NoiseConfig, NoiseFilter, COMMON_NOISE};
pub use pages::{file_page_path, relative_link, AnalyzedFile, PagePlanner, FILE_PAGES_DIR, OVERVIEW_PAGE};
pub use render::{mermaid, TemplateGenerator, FILE_TEMPLATE, OVERVIEW_TEMPLATE};
pub use scheduler::{
    classify, CancelFlag, IncrementalScheduler, PageGenerator, PageRequest, RunReport, Staleness,
};
pub use status::{
    BuildStatusStore, GenerationManifest, LineRange, ManifestRecorder, ManifestSnapshot, PageStatus,
};
pub use syntax::{
    field_text, find_nodes_by_type, has_ancestor_of_kind, nearest_ancestor, node_text, walk_preorder,
    ParsedSource, SyntaxAdapter, TreeSitterAdapter, WalkControl,
};
pub use xref::CrossReferenceIndex;

// Export the main engine
pub use engine::{Analysis, Engine, SourceAnalyzer, GRAPH_ARTIFACT};
