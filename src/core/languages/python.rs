use tree_sitter::{Language, Node};

use super::LanguageSupport;
use crate::core::syntax::{field_text, node_text};

/// Python call shapes: `f()` and `obj.attr()`
pub struct PythonSupport;

impl LanguageSupport for PythonSupport {
    fn language_name(&self) -> &'static str {
        "python"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["py"]
    }

    fn grammar(&self) -> Language {
        tree_sitter_python::language()
    }

    fn function_kinds(&self) -> &'static [&'static str] {
        &["function_definition"]
    }

    fn class_kinds(&self) -> &'static [&'static str] {
        &["class_definition"]
    }

    fn call_kinds(&self) -> &'static [&'static str] {
        &["call"]
    }

    fn resolve_call_name(&self, call: Node<'_>, source: &[u8]) -> Option<String> {
        let function = call.child_by_field_name("function")?;
        match function.kind() {
            "identifier" => node_text(function, source),
            "attribute" => field_text(function, "attribute", source),
            _ => None,
        }
    }

    fn noise_words(&self) -> &'static [&'static str] {
        &[
            "abs", "all", "any", "dir", "divmod", "id", "input", "isinstance", "issubclass",
            "iter", "next", "open", "repr", "round", "vars", "hasattr", "getattr", "setattr",
            "super", "enumerate", "zip", "sorted", "reversed", "items", "keys", "values",
            "setdefault", "strip", "lstrip", "rstrip", "startswith", "endswith",
            "str", "int", "float", "bool", "list", "dict", "set", "tuple", "type", "range",
            "min", "max", "sum", "append", "extend", "pop", "join", "split", "lower", "upper",
        ]
    }
}
