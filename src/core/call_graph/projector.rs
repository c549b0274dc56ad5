use std::collections::HashMap;

use serde::Serialize;

use super::CallGraph;

/// Styling bucket for a diagram node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// `Class.method` style names
    Qualified,
    Function,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagramNode {
    pub id: String,
    pub name: String,
    pub label: String,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagramEdge {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagramGraph {
    pub nodes: Vec<DiagramNode>,
    pub edges: Vec<DiagramEdge>,
    /// Nodes dropped by the size limit
    pub omitted_nodes: usize,
}

/// Bounded view of a call graph ready for rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Projection {
    /// The input graph had no edges at all
    NoGraph,
    Graph(DiagramGraph),
}

impl Projection {
    pub fn is_no_graph(&self) -> bool {
        matches!(self, Projection::NoGraph)
    }

    pub fn graph(&self) -> Option<&DiagramGraph> {
        match self {
            Projection::NoGraph => None,
            Projection::Graph(graph) => Some(graph),
        }
    }
}

/// Selects the best-connected nodes of a call graph up to a size limit
#[derive(Debug, Clone)]
pub struct GraphProjector {
    max_nodes: usize,
    label_budget: usize,
}

impl GraphProjector {
    pub fn new(max_nodes: usize, label_budget: usize) -> Self {
        Self {
            max_nodes,
            label_budget,
        }
    }

    pub fn project(&self, graph: &CallGraph) -> Projection {
        if graph.is_empty() {
            return Projection::NoGraph;
        }

        // Candidates in first-seen order, each scored by edges touching it
        let mut order: Vec<&str> = Vec::new();
        let mut position: HashMap<&str, usize> = HashMap::new();
        let mut scores: Vec<usize> = Vec::new();

        for (caller, callees) in graph.iter() {
            let slot = Self::slot(caller, &mut order, &mut position, &mut scores);
            scores[slot] += callees.len();
            for callee in callees {
                let slot = Self::slot(callee.as_str(), &mut order, &mut position, &mut scores);
                scores[slot] += 1;
            }
        }

        let retained = rank_nodes(&scores, self.max_nodes);
        let omitted_nodes = order.len() - retained.len();

        let mut ids: HashMap<&str, String> = HashMap::new();
        let mut nodes = Vec::with_capacity(retained.len());
        for (n, &slot) in retained.iter().enumerate() {
            let name = order[slot];
            let id = format!("n{}", n);
            ids.insert(name, id.clone());
            nodes.push(DiagramNode {
                id,
                name: name.to_string(),
                label: truncate_label(name, self.label_budget),
                kind: node_kind(name),
            });
        }

        let mut edges = Vec::new();
        for (caller, callees) in graph.iter() {
            let Some(from) = ids.get(caller) else {
                continue;
            };
            for callee in callees {
                if let Some(to) = ids.get(callee.as_str()) {
                    edges.push(DiagramEdge {
                        from: from.clone(),
                        to: to.clone(),
                    });
                }
            }
        }

        Projection::Graph(DiagramGraph {
            nodes,
            edges,
            omitted_nodes,
        })
    }

    fn slot<'a>(
        name: &'a str,
        order: &mut Vec<&'a str>,
        position: &mut HashMap<&'a str, usize>,
        scores: &mut Vec<usize>,
    ) -> usize {
        *position.entry(name).or_insert_with(|| {
            order.push(name);
            scores.push(0);
            order.len() - 1
        })
    }
}

/// Indices of the `max` highest scores, ties broken by lower index, returned in index order
pub fn rank_nodes(scores: &[usize], max: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..scores.len()).collect();
    if indices.len() <= max {
        return indices;
    }

    // stable sort keeps first-seen order among equal scores
    indices.sort_by(|a, b| scores[*b].cmp(&scores[*a]));
    indices.truncate(max);
    indices.sort_unstable();
    indices
}

pub fn node_kind(name: &str) -> NodeKind {
    if name.contains('.') || name.contains("::") {
        NodeKind::Qualified
    } else {
        NodeKind::Function
    }
}

/// Cut `name` to at most `budget` characters, marking the cut with an ellipsis
pub fn truncate_label(name: &str, budget: usize) -> String {
    if name.chars().count() <= budget {
        return name.to_string();
    }
    if budget == 0 {
        return String::new();
    }
    let mut label: String = name.chars().take(budget - 1).collect();
    label.push('…');
    label
}
