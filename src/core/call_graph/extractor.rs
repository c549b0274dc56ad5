use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;
use tree_sitter::Node;

use super::CallGraph;
use crate::core::languages::{LanguageRegistry, LanguageSupport};
use crate::core::noise::NoiseFilter;
use crate::core::syntax::{find_nodes_by_type, has_ancestor_of_kind, nearest_ancestor, ParsedSource, SyntaxAdapter};

/// A named function, method or class found in a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entity {
    /// Graph key: `name` for free functions, `Class.method` for methods
    pub name: String,
    pub kind: EntityKind,
    /// 1-based, inclusive
    pub start_line: usize,
    pub end_line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Function,
    Class,
    Method,
}

/// Everything extracted from one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileAnalysis {
    pub graph: CallGraph,
    /// Entities in document order
    pub entities: Vec<Entity>,
}

impl FileAnalysis {
    /// First to last line covered by any entity
    pub fn line_span(&self) -> Option<(usize, usize)> {
        let start = self.entities.iter().map(|e| e.start_line).min()?;
        let end = self.entities.iter().map(|e| e.end_line).max()?;
        Some((start, end))
    }
}

/// Builds per-file call graphs from syntax trees
pub struct CallGraphExtractor {
    registry: Arc<LanguageRegistry>,
    noise: Arc<NoiseFilter>,
}

impl CallGraphExtractor {
    pub fn new(registry: Arc<LanguageRegistry>, noise: Arc<NoiseFilter>) -> Self {
        Self { registry, noise }
    }

    /// Parse and extract one file; anything unparsable yields an empty graph
    pub fn extract_file(&self, adapter: &dyn SyntaxAdapter, path: &Path) -> CallGraph {
        self.analyze_file(adapter, path).graph
    }

    pub fn analyze_file(&self, adapter: &dyn SyntaxAdapter, path: &Path) -> FileAnalysis {
        match adapter.parse(path) {
            Some(parsed) => self.analyze(&parsed),
            None => {
                debug!("No syntax tree for {}, using empty call graph", path.display());
                FileAnalysis::default()
            }
        }
    }

    pub fn extract(&self, parsed: &ParsedSource) -> CallGraph {
        self.analyze(parsed).graph
    }

    pub fn analyze(&self, parsed: &ParsedSource) -> FileAnalysis {
        let Some(support) = self.registry.get(&parsed.language) else {
            return FileAnalysis::default();
        };

        let root = parsed.root();
        let source = parsed.source.as_slice();
        let class_kinds = support.class_kinds();
        let mut analysis = FileAnalysis::default();

        for function in find_nodes_by_type(root, support.function_kinds()) {
            if has_ancestor_of_kind(function, class_kinds) {
                continue;
            }
            let Some(name) = support.node_name(function, source) else {
                continue;
            };
            analysis
                .graph
                .add_calls(&name, self.calls_in(support, function, source, &parsed.language));
            analysis.entities.push(entity(name, EntityKind::Function, function));
        }

        for class in find_nodes_by_type(root, class_kinds) {
            let Some(class_name) = support.node_name(class, source) else {
                continue;
            };
            analysis
                .entities
                .push(entity(class_name.clone(), EntityKind::Class, class));

            for method in self.methods_of(support, class) {
                let Some(method_name) = support.node_name(method, source) else {
                    continue;
                };
                let key = format!("{}.{}", class_name, method_name);
                analysis
                    .graph
                    .add_calls(&key, self.calls_in(support, method, source, &parsed.language));
                analysis.entities.push(entity(key, EntityKind::Method, method));
            }
        }

        analysis
            .entities
            .sort_by_key(|entity| (entity.start_line, entity.end_line));
        analysis
    }

    /// Functions whose closest enclosing function-or-class is `class` itself
    fn methods_of<'tree>(&self, support: &dyn LanguageSupport, class: Node<'tree>) -> Vec<Node<'tree>> {
        let function_kinds = support.function_kinds();
        let class_kinds = support.class_kinds();

        find_nodes_by_type(class, function_kinds)
            .into_iter()
            .filter(|method| {
                let owner = nearest_ancestor(*method, |ancestor| {
                    function_kinds.contains(&ancestor.kind()) || class_kinds.contains(&ancestor.kind())
                });
                owner.is_some_and(|owner| owner.id() == class.id())
            })
            .collect()
    }

    /// Resolved, noise-filtered callee names in the body, first-seen order
    fn calls_in(
        &self,
        support: &dyn LanguageSupport,
        function: Node<'_>,
        source: &[u8],
        language: &str,
    ) -> Vec<String> {
        let body = function.child_by_field_name("body").unwrap_or(function);
        let mut callees: Vec<String> = Vec::new();

        for call in find_nodes_by_type(body, support.call_kinds()) {
            let Some(name) = support.resolve_call_name(call, source) else {
                continue;
            };
            if self.noise.is_noise(&name, language) || callees.contains(&name) {
                continue;
            }
            callees.push(name);
        }

        callees
    }
}

fn entity(name: String, kind: EntityKind, node: Node<'_>) -> Entity {
    Entity {
        name,
        kind,
        start_line: node.start_position().row + 1,
        end_line: node.end_position().row + 1,
    }
}
