use tree_sitter::{Language, Node};

use super::LanguageSupport;
use crate::core::syntax::{field_text, node_text};

/// JavaScript call shapes: `f()` and `obj.prop()`
pub struct JavaScriptSupport;

impl LanguageSupport for JavaScriptSupport {
    fn language_name(&self) -> &'static str {
        "javascript"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["js", "jsx", "mjs", "cjs"]
    }

    fn grammar(&self) -> Language {
        tree_sitter_javascript::language()
    }

    fn function_kinds(&self) -> &'static [&'static str] {
        &[
            "function_declaration",
            "generator_function_declaration",
            "method_definition",
        ]
    }

    fn class_kinds(&self) -> &'static [&'static str] {
        &["class_declaration", "class"]
    }

    fn call_kinds(&self) -> &'static [&'static str] {
        &["call_expression"]
    }

    fn resolve_call_name(&self, call: Node<'_>, source: &[u8]) -> Option<String> {
        let function = call.child_by_field_name("function")?;
        match function.kind() {
            "identifier" => node_text(function, source),
            "member_expression" => field_text(function, "property", source),
            _ => None,
        }
    }

    fn noise_words(&self) -> &'static [&'static str] {
        &[
            "then", "catch", "finally", "require", "parseint", "parsefloat", "stringify",
            "settimeout", "setinterval", "cleartimeout", "addeventlistener",
            "queryselector", "getelementbyid", "foreach", "reduce", "some", "every",
            "includes", "indexof", "slice", "splice", "concat", "shift", "unshift",
            "log", "push", "pop", "tolowercase", "touppercase", "trim",
        ]
    }
}
