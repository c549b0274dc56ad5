use tree_sitter::{Language, Node};

use super::LanguageSupport;
use crate::core::syntax::{field_text, node_text};

/// Rust call shapes: `f()`, `x.method()`, `path::to::f()`, `f::<T>()`
pub struct RustSupport;

impl RustSupport {
    fn callee_name(&self, function: Node<'_>, source: &[u8]) -> Option<String> {
        match function.kind() {
            "identifier" => node_text(function, source),
            "field_expression" => field_text(function, "field", source),
            "scoped_identifier" => field_text(function, "name", source),
            "generic_function" => {
                let inner = function.child_by_field_name("function")?;
                self.callee_name(inner, source)
            }
            _ => None,
        }
    }

    /// `impl<T> Foo<T>` and `impl path::Foo` both name the block `Foo`
    fn impl_type_name(&self, node: Node<'_>, source: &[u8]) -> Option<String> {
        let mut ty = node.child_by_field_name("type")?;
        if ty.kind() == "generic_type" {
            ty = ty.child_by_field_name("type")?;
        }
        if ty.kind() == "scoped_type_identifier" {
            return field_text(ty, "name", source);
        }
        node_text(ty, source)
    }
}

impl LanguageSupport for RustSupport {
    fn language_name(&self) -> &'static str {
        "rust"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["rs"]
    }

    fn grammar(&self) -> Language {
        tree_sitter_rust::language()
    }

    fn function_kinds(&self) -> &'static [&'static str] {
        &["function_item"]
    }

    fn class_kinds(&self) -> &'static [&'static str] {
        &["impl_item", "trait_item"]
    }

    fn call_kinds(&self) -> &'static [&'static str] {
        &["call_expression"]
    }

    fn resolve_call_name(&self, call: Node<'_>, source: &[u8]) -> Option<String> {
        let function = call.child_by_field_name("function")?;
        self.callee_name(function, source)
    }

    fn node_name(&self, node: Node<'_>, source: &[u8]) -> Option<String> {
        match node.kind() {
            "impl_item" => self.impl_type_name(node, source),
            _ => field_text(node, "name", source),
        }
    }

    fn noise_words(&self) -> &'static [&'static str] {
        &[
            "unwrap", "unwrap_or", "unwrap_or_else", "unwrap_or_default", "expect", "clone",
            "to_string", "to_owned", "into", "from", "as_ref", "as_str", "as_mut", "iter",
            "iter_mut", "into_iter", "collect", "ok", "err", "ok_or", "ok_or_else", "map_err",
            "and_then", "is_some", "is_none", "is_ok", "is_err", "borrow", "borrow_mut",
            "lock", "default", "some", "box", "vec", "push", "push_str", "pop", "is_empty",
            "as_slice", "to_vec",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{resolved_calls, some};
    use super::*;
    use crate::core::languages::LanguageRegistry;
    use crate::core::syntax::{find_nodes_by_type, TreeSitterAdapter};
    use std::sync::Arc;

    #[test]
    fn test_call_shapes() {
        let source = r#"
fn main() {
    process();
    self.engine.run();
    crate::io::load_all();
    parse::<u32>();
    Vec::<u8>::with_capacity(4);
}
"#;
        assert_eq!(
            resolved_calls(source, "rust"),
            some(&["process", "run", "load_all", "parse", "with_capacity"])
        );
    }

    #[test]
    fn test_closure_call_is_none() {
        let source = "fn f() { (|| 1)(); }";
        assert_eq!(resolved_calls(source, "rust"), vec![None]);
    }

    #[test]
    fn test_impl_block_names() {
        let source = "impl<T> Wrapper<T> { fn a(&self) {} }\nimpl fmt::Display for other::Thing { fn fmt(&self) {} }\n";
        let registry = Arc::new(LanguageRegistry::with_defaults());
        let parsed = TreeSitterAdapter::new(registry, usize::MAX)
            .parse_source(source, "rust")
            .unwrap();

        let names: Vec<_> = find_nodes_by_type(parsed.root(), &["impl_item"])
            .into_iter()
            .map(|node| RustSupport.node_name(node, &parsed.source))
            .collect();

        assert_eq!(names, vec![Some("Wrapper".to_string()), Some("Thing".to_string())]);
    }
}
