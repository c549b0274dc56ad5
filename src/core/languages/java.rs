use tree_sitter::{Language, Node};

use super::LanguageSupport;
use crate::core::syntax::field_text;

/// Java call shapes: `m()`, `obj.m()`, `Type.m()`
pub struct JavaSupport;

impl LanguageSupport for JavaSupport {
    fn language_name(&self) -> &'static str {
        "java"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["java"]
    }

    fn grammar(&self) -> Language {
        tree_sitter_java::language()
    }

    fn function_kinds(&self) -> &'static [&'static str] {
        &["method_declaration", "constructor_declaration"]
    }

    fn class_kinds(&self) -> &'static [&'static str] {
        &[
            "class_declaration",
            "interface_declaration",
            "enum_declaration",
            "record_declaration",
        ]
    }

    fn call_kinds(&self) -> &'static [&'static str] {
        &["method_invocation"]
    }

    fn resolve_call_name(&self, call: Node<'_>, source: &[u8]) -> Option<String> {
        // The receiver lives in the `object` field; only the member name matters
        field_text(call, "name", source)
    }

    fn noise_words(&self) -> &'static [&'static str] {
        &[
            "equals", "hashcode", "getclass", "valueof", "printstacktrace", "stream",
            "of", "isempty", "charat", "substring", "trim", "aslist", "length",
            "tolowercase", "touppercase", "startswith", "endswith",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{resolved_calls, some};

    #[test]
    fn test_call_shapes() {
        let source = r#"
class Service {
    void run() {
        process();
        this.repo.save(item);
        Helpers.format(x);
    }
}
"#;
        assert_eq!(
            resolved_calls(source, "java"),
            some(&["process", "save", "format"])
        );
    }
}
