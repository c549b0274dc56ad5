use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

/// Entity name -> pages that document it, rebuilt from scratch every run
#[derive(Debug, Default)]
pub struct CrossReferenceIndex {
    entries: Mutex<BTreeMap<String, BTreeSet<String>>>,
}

impl CrossReferenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, page: &str, entities: &[String]) {
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        for entity in entities {
            entries
                .entry(entity.clone())
                .or_default()
                .insert(page.to_string());
        }
    }

    pub fn pages_for(&self, entity: &str) -> Vec<String> {
        let entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries
            .get(entity)
            .map(|pages| pages.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> BTreeMap<String, Vec<String>> {
        let entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries
            .iter()
            .map(|(entity, pages)| (entity.clone(), pages.iter().cloned().collect()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_idempotent_per_page() {
        let index = CrossReferenceIndex::new();
        let entities = vec!["main".to_string(), "Foo.bar".to_string()];
        index.register("files/a.md", &entities);
        index.register("files/a.md", &entities);
        index.register("files/b.md", &["main".to_string()]);

        assert_eq!(index.pages_for("main"), ["files/a.md", "files/b.md"]);
        assert_eq!(index.pages_for("Foo.bar"), ["files/a.md"]);
        assert!(index.pages_for("unknown").is_empty());
        assert_eq!(index.snapshot().len(), 2);
    }
}
