use std::collections::HashMap;

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Ordered, duplicate-free adjacency: key -> list of names
///
/// Keys keep first-insertion order and every list keeps first-seen order.
/// Empty lists are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Adjacency {
    entries: Vec<(String, Vec<String>)>,
    index: HashMap<String, usize>,
}

impl Adjacency {
    fn add(&mut self, key: &str, value: &str) {
        if key.is_empty() || value.is_empty() {
            return;
        }
        let slot = match self.index.get(key) {
            Some(&slot) => slot,
            None => {
                self.entries.push((key.to_string(), Vec::new()));
                self.index.insert(key.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        let values = &mut self.entries[slot].1;
        if !values.iter().any(|existing| existing == value) {
            values.push(value.to_string());
        }
    }

    fn get(&self, key: &str) -> Option<&[String]> {
        self.index
            .get(key)
            .map(|&slot| self.entries[slot].1.as_slice())
    }

    fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(key, values)| (key.as_str(), values.as_slice()))
    }
}

/// Caller -> callees for one file, or several files merged together
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallGraph {
    adjacency: Adjacency,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the calls made by `caller`; names already present are skipped
    pub fn add_calls<I, S>(&mut self, caller: &str, callees: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for callee in callees {
            self.adjacency.add(caller, callee.as_ref());
        }
    }

    pub fn callees(&self, caller: &str) -> Option<&[String]> {
        self.adjacency.get(caller)
    }

    pub fn contains_edge(&self, caller: &str, callee: &str) -> bool {
        self.callees(caller)
            .is_some_and(|callees| callees.iter().any(|name| name == callee))
    }

    /// (caller, callees) pairs in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.adjacency.iter()
    }

    pub fn callers(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|(caller, _)| caller)
    }

    /// Number of callers with at least one retained call
    pub fn len(&self) -> usize {
        self.adjacency.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.entries.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.iter().map(|(_, callees)| callees.len()).sum()
    }

    /// Union `other` into this graph, keeping first-seen order
    pub fn merge(&mut self, other: &CallGraph) {
        for (caller, callees) in other.iter() {
            self.add_calls(caller, callees);
        }
    }
}

impl<K, V> FromIterator<(K, Vec<V>)> for CallGraph
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    fn from_iter<T: IntoIterator<Item = (K, Vec<V>)>>(iter: T) -> Self {
        let mut graph = CallGraph::new();
        for (caller, callees) in iter {
            graph.add_calls(caller.as_ref(), callees);
        }
        graph
    }
}

impl Serialize for CallGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (caller, callees) in self.iter() {
            map.serialize_entry(caller, callees)?;
        }
        map.end()
    }
}

/// Callee -> callers, the "used by" view of one or more call graphs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReverseCallGraph {
    adjacency: Adjacency,
}

impl ReverseCallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_graphs<'a, I>(graphs: I) -> Self
    where
        I: IntoIterator<Item = &'a CallGraph>,
    {
        let mut reverse = Self::new();
        for graph in graphs {
            reverse.add_graph(graph);
        }
        reverse
    }

    /// Invert `graph` into this view; adding the same graph again is a no-op
    pub fn add_graph(&mut self, graph: &CallGraph) {
        for (caller, callees) in graph.iter() {
            for callee in callees {
                self.adjacency.add(callee, caller);
            }
        }
    }

    /// Callers of `callee`, empty when nothing calls it
    pub fn callers_of(&self, callee: &str) -> &[String] {
        self.adjacency.get(callee).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.adjacency.iter()
    }

    pub fn len(&self) -> usize {
        self.adjacency.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.entries.is_empty()
    }
}
