//! Language-specific call-shape strategies
//!
//! Each language gets its own module implementing `LanguageSupport`; the
//! registry is the dispatch table keyed by language tag, so supporting a new
//! language means adding a module and one `register` call.

mod csharp;
mod java;
mod javascript;
mod python;
mod rust;

pub use csharp::CSharpSupport;
pub use java::JavaSupport;
pub use javascript::JavaScriptSupport;
pub use python::PythonSupport;
pub use rust::RustSupport;

use std::collections::HashMap;
use std::path::Path;

use tree_sitter::{Language, Node};

use super::syntax::field_text;

/// Trait that all language strategies must implement
pub trait LanguageSupport: Send + Sync {
    /// Language tag used as the registry key
    fn language_name(&self) -> &'static str;

    /// File extensions this language handles
    fn file_extensions(&self) -> &'static [&'static str];

    /// Tree-sitter grammar
    fn grammar(&self) -> Language;

    /// Node kinds that define a function or method
    fn function_kinds(&self) -> &'static [&'static str];

    /// Node kinds that group methods (classes, impl blocks, interfaces...)
    fn class_kinds(&self) -> &'static [&'static str];

    /// Node kinds that represent a call expression
    fn call_kinds(&self) -> &'static [&'static str];

    /// Name invoked by a call node, or `None` for shapes this language does not recognise
    fn resolve_call_name(&self, call: Node<'_>, source: &[u8]) -> Option<String>;

    /// Name of a function or class node
    fn node_name(&self, node: Node<'_>, source: &[u8]) -> Option<String> {
        field_text(node, "name", source)
    }

    /// Language-specific call names that carry no documentation value
    fn noise_words(&self) -> &'static [&'static str] {
        &[]
    }
}

/// Dispatch table of language strategies
pub struct LanguageRegistry {
    languages: HashMap<String, Box<dyn LanguageSupport>>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        Self {
            languages: HashMap::new(),
        }
    }

    /// Registry with every bundled language
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(RustSupport));
        registry.register(Box::new(PythonSupport));
        registry.register(Box::new(JavaSupport));
        registry.register(Box::new(JavaScriptSupport));
        registry.register(Box::new(CSharpSupport));
        registry
    }

    /// Registry restricted to the configured language tags; unknown tags are ignored
    pub fn for_languages(languages: &[String]) -> Self {
        let mut registry = Self::with_defaults();
        registry
            .languages
            .retain(|tag, _| languages.iter().any(|wanted| wanted == tag));
        registry
    }

    pub fn register(&mut self, support: Box<dyn LanguageSupport>) {
        self.languages
            .insert(support.language_name().to_string(), support);
    }

    pub fn get(&self, language: &str) -> Option<&dyn LanguageSupport> {
        self.languages.get(language).map(|support| support.as_ref())
    }

    /// Language responsible for a path, by extension
    pub fn detect(&self, path: &Path) -> Option<&dyn LanguageSupport> {
        let extension = path.extension().and_then(|ext| ext.to_str())?;
        self.languages
            .values()
            .find(|support| support.file_extensions().contains(&extension))
            .map(|support| support.as_ref())
    }

    /// Callee name for one call node; total over every input
    pub fn resolve_call_name(&self, call: Node<'_>, source: &[u8], language: &str) -> Option<String> {
        self.get(language)?.resolve_call_name(call, source)
    }

    pub fn node_name(&self, node: Node<'_>, source: &[u8], language: &str) -> Option<String> {
        self.get(language)?.node_name(node, source)
    }

    pub fn languages(&self) -> impl Iterator<Item = &dyn LanguageSupport> {
        self.languages.values().map(|support| support.as_ref())
    }
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
