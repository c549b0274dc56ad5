use tree_sitter::{Language, Node};

use super::LanguageSupport;
use crate::core::syntax::node_text;

/// C# call shapes: `M()`, `obj.M()`, `M<T>()`, `obj.M<T>()`
pub struct CSharpSupport;

impl CSharpSupport {
    fn simple_name(&self, node: Node<'_>, source: &[u8]) -> Option<String> {
        match node.kind() {
            "identifier" => node_text(node, source),
            "generic_name" => {
                if let Some(name) = node.child_by_field_name("name") {
                    return node_text(name, source);
                }
                let mut cursor = node.walk();
                let identifier = node
                    .named_children(&mut cursor)
                    .find(|child| child.kind() == "identifier");
                identifier.and_then(|child| node_text(child, source))
            }
            _ => None,
        }
    }
}

impl LanguageSupport for CSharpSupport {
    fn language_name(&self) -> &'static str {
        "csharp"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["cs"]
    }

    fn grammar(&self) -> Language {
        tree_sitter_c_sharp::language()
    }

    fn function_kinds(&self) -> &'static [&'static str] {
        &[
            "method_declaration",
            "constructor_declaration",
            "local_function_statement",
        ]
    }

    fn class_kinds(&self) -> &'static [&'static str] {
        &[
            "class_declaration",
            "struct_declaration",
            "interface_declaration",
            "record_declaration",
        ]
    }

    fn call_kinds(&self) -> &'static [&'static str] {
        &["invocation_expression"]
    }

    fn resolve_call_name(&self, call: Node<'_>, source: &[u8]) -> Option<String> {
        let function = call.child_by_field_name("function")?;
        match function.kind() {
            "member_access_expression" => {
                let name = function.child_by_field_name("name")?;
                self.simple_name(name, source)
            }
            _ => self.simple_name(function, source),
        }
    }

    fn noise_words(&self) -> &'static [&'static str] {
        &[
            "writeline", "write", "readline", "tolist", "toarray", "select", "where",
            "firstordefault", "any", "count", "gettype", "dispose", "configureawait",
            "nameof", "equals", "gethashcode", "tolower", "toupper", "trim",
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
    void Run() {
        Process();
        _repo.Save(item);
        Console.WriteLine("done");
    }
}
"#;
        assert_eq!(
            resolved_calls(source, "csharp"),
            some(&["Process", "Save", "WriteLine"])
        );
    }
}
