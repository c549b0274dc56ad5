//! Call graph extraction and shaping
//!
//! Per-file graphs come out of the extractor, get merged into one aggregated
//! graph, and are then either inverted for "used by" lookups or projected
//! into a bounded diagram.

mod extractor;
mod graph;
mod projector;

pub use extractor::{CallGraphExtractor, Entity, EntityKind, FileAnalysis};
pub use graph::{CallGraph, ReverseCallGraph};
pub use projector::{
    node_kind, rank_nodes, truncate_label, DiagramEdge, DiagramGraph, DiagramNode, GraphProjector,
    NodeKind, Projection,
};
