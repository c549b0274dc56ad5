//! Tree-sitter adapter and non-recursive tree walks.
//!
//! Everything downstream of this module only sees `ParsedSource` plus the
//! traversal helpers, so the extractor never recurses into the tree itself.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;
use tree_sitter::{Node, Parser, Tree};

use super::languages::LanguageRegistry;

/// A parsed file: syntax tree, language tag and the bytes it was parsed from
pub struct ParsedSource {
    pub tree: Tree,
    pub language: String,
    pub source: Vec<u8>,
}

impl ParsedSource {
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }
}

/// Capability that turns a file into a syntax tree
pub trait SyntaxAdapter: Send + Sync {
    /// Parse a file, or `None` when it cannot be parsed for any reason
    fn parse(&self, path: &Path) -> Option<ParsedSource>;
}

/// Adapter backed by the tree-sitter grammars in the language registry
pub struct TreeSitterAdapter {
    registry: Arc<LanguageRegistry>,
    max_file_size: usize,
}

impl TreeSitterAdapter {
    pub fn new(registry: Arc<LanguageRegistry>, max_file_size: usize) -> Self {
        Self {
            registry,
            max_file_size,
        }
    }

    /// Parse in-memory source for a known language tag
    pub fn parse_source(&self, source: &str, language: &str) -> Option<ParsedSource> {
        let support = self.registry.get(language)?;

        let mut parser = Parser::new();
        if let Err(e) = parser.set_language(&support.grammar()) {
            debug!("Grammar for {} rejected by tree-sitter: {}", language, e);
            return None;
        }

        let tree = parser.parse(source, None)?;
        Some(ParsedSource {
            tree,
            language: support.language_name().to_string(),
            source: source.as_bytes().to_vec(),
        })
    }
}

impl SyntaxAdapter for TreeSitterAdapter {
    fn parse(&self, path: &Path) -> Option<ParsedSource> {
        let language = self.registry.detect(path)?;

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                debug!("Cannot read {}: {}", path.display(), e);
                return None;
            }
        };

        if content.len() > self.max_file_size {
            debug!("Skipping {}: exceeds maximum size limit", path.display());
            return None;
        }

        let parsed = self.parse_source(&content, language.language_name());
        if parsed.is_none() {
            debug!("tree-sitter produced no tree for {}", path.display());
        }
        parsed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkControl {
    Continue,
    SkipChildren,
}

/// Pre-order walk using an explicit stack; the visitor decides whether to descend
pub fn walk_preorder<'tree, F>(root: Node<'tree>, mut visit: F)
where
    F: FnMut(Node<'tree>) -> WalkControl,
{
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if visit(node) == WalkControl::SkipChildren {
            continue;
        }

        let mut cursor = node.walk();
        let children: Vec<Node<'tree>> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
}

/// All descendants of `root` (inclusive) whose kind is in `kinds`, in document order
pub fn find_nodes_by_type<'tree>(root: Node<'tree>, kinds: &[&str]) -> Vec<Node<'tree>> {
    let mut found = Vec::new();
    walk_preorder(root, |node| {
        if kinds.contains(&node.kind()) {
            found.push(node);
        }
        WalkControl::Continue
    });
    found
}

/// Closest proper ancestor satisfying `predicate`
pub fn nearest_ancestor<'tree, P>(node: Node<'tree>, predicate: P) -> Option<Node<'tree>>
where
    P: Fn(&Node<'tree>) -> bool,
{
    let mut current = node.parent();
    while let Some(ancestor) = current {
        if predicate(&ancestor) {
            return Some(ancestor);
        }
        current = ancestor.parent();
    }
    None
}

pub fn has_ancestor_of_kind(node: Node<'_>, kinds: &[&str]) -> bool {
    nearest_ancestor(node, |ancestor| kinds.contains(&ancestor.kind())).is_some()
}

/// UTF-8 text of a node, `None` when empty or not valid UTF-8
pub fn node_text(node: Node<'_>, source: &[u8]) -> Option<String> {
    let text = node.utf8_text(source).ok()?.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Text of the named field child of `node`
pub fn field_text(node: Node<'_>, field: &str, source: &[u8]) -> Option<String> {
    node.child_by_field_name(field)
        .and_then(|child| node_text(child, source))
}
