//! Builtin / stdlib / container-method call filtering
//!
//! The word lists are plain data in a `NoiseConfig` value that gets injected
//! into the filter; nothing here reads global state. Matching is
//! case-insensitive and errs towards keeping a name: dropping a real call is a
//! bug, letting `format` through is cosmetic.

use std::collections::{BTreeSet, HashMap};

use crate::config::NoiseSettings;
use super::languages::LanguageRegistry;

/// Names ignored in every language. Container and logging verbs such as
/// `get`, `update` or `error` are also common user names, so builtins live in
/// each language's own set instead.
pub const COMMON_NOISE: &[&str] = &[
    "print", "println", "printf", "eprintln", "format", "tostring", "len", "new",
];

/// Immutable noise word configuration
#[derive(Debug, Clone, Default)]
pub struct NoiseConfig {
    pub common: BTreeSet<String>,
    pub per_language: HashMap<String, BTreeSet<String>>,
}

impl NoiseConfig {
    /// Common words plus each registered language's own extension set
    pub fn from_registry(registry: &LanguageRegistry) -> Self {
        let mut config = Self {
            common: COMMON_NOISE.iter().map(|word| word.to_string()).collect(),
            per_language: HashMap::new(),
        };

        for support in registry.languages() {
            config.per_language.insert(
                support.language_name().to_string(),
                support.noise_words().iter().map(|word| word.to_string()).collect(),
            );
        }

        config
    }

    /// Merge user-configured extras on top
    pub fn with_settings(mut self, settings: &NoiseSettings) -> Self {
        self.common.extend(settings.common.iter().cloned());
        for (language, words) in &settings.languages {
            self.per_language
                .entry(language.clone())
                .or_default()
                .extend(words.iter().cloned());
        }
        self
    }
}

/// Classifies resolved call names as noise
#[derive(Debug, Clone)]
pub struct NoiseFilter {
    common: BTreeSet<String>,
    per_language: HashMap<String, BTreeSet<String>>,
}

impl NoiseFilter {
    pub fn new(config: NoiseConfig) -> Self {
        let lower = |words: BTreeSet<String>| -> BTreeSet<String> {
            words.into_iter().map(|word| word.to_lowercase()).collect()
        };

        Self {
            common: lower(config.common),
            per_language: config
                .per_language
                .into_iter()
                .map(|(language, words)| (language, lower(words)))
                .collect(),
        }
    }

    pub fn is_noise(&self, name: &str, language: &str) -> bool {
        let name = name.to_lowercase();
        self.common.contains(&name)
            || self
                .per_language
                .get(language)
                .is_some_and(|words| words.contains(&name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> NoiseFilter {
        NoiseFilter::new(NoiseConfig::from_registry(&LanguageRegistry::with_defaults()))
    }

    #[test]
    fn test_case_insensitive() {
        let filter = filter();
        for language in ["python", "rust", "java", "javascript", "csharp"] {
            assert!(filter.is_noise("print", language));
            assert!(filter.is_noise("Print", language));
            assert!(filter.is_noise("PRINT", language));
        }
    }

    #[test]
    fn test_language_extensions_stay_scoped() {
        let filter = filter();
        assert!(filter.is_noise("unwrap", "rust"));
        assert!(!filter.is_noise("unwrap", "python"));
        assert!(filter.is_noise("WriteLine", "csharp"));
        assert!(!filter.is_noise("WriteLine", "java"));
    }

    #[test]
    fn test_domain_names_survive() {
        let filter = filter();
        for name in ["process", "helper", "main", "bar", "save", "fetch", "render_page"] {
            assert!(!filter.is_noise(name, "python"), "{} was dropped", name);
        }
    }

    #[test]
    fn test_common_user_verbs_are_kept() {
        let filter = filter();
        for language in ["python", "rust", "java", "javascript", "csharp"] {
            for name in ["update", "get", "add", "remove", "filter", "map", "error", "info"] {
                assert!(!filter.is_noise(name, language), "{} was dropped in {}", name, language);
            }
        }
    }

    #[test]
    fn test_builtins_are_scoped_to_their_language() {
        let filter = filter();
        assert!(filter.is_noise("len", "python"));
        assert!(filter.is_noise("range", "python"));
        assert!(!filter.is_noise("range", "java"));
        assert!(filter.is_noise("log", "javascript"));
        assert!(!filter.is_noise("log", "rust"));
    }

    #[test]
    fn test_settings_override() {
        let settings = NoiseSettings {
            common: vec!["Dispatch".to_string()],
            languages: HashMap::from([("python".to_string(), vec!["emit".to_string()])]),
        };
        let filter = NoiseFilter::new(
            NoiseConfig::from_registry(&LanguageRegistry::with_defaults()).with_settings(&settings),
        );

        assert!(filter.is_noise("dispatch", "java"));
        assert!(filter.is_noise("EMIT", "python"));
        assert!(!filter.is_noise("emit", "rust"));
    }

    #[test]
    fn test_empty_config_filters_nothing() {
        let filter = NoiseFilter::new(NoiseConfig::default());
        assert!(!filter.is_noise("print", "python"));
    }
}
