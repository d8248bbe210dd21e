use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::data::{App, AppId, Edge, EdgesMap, Node};

/// Node list and grouped edges ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledGraph {
    pub nodes: Vec<Node>,
    pub edges_map: EdgesMap,
}

impl AssembledGraph {
    pub fn edge_count(&self) -> usize {
        self.edges_map.values().map(Vec::len).sum()
    }
}

/// Builds the graph model from fetched applications and reference edges.
///
/// Input order does not matter. Nodes are unique by id and sorted; edges are
/// unique by field id, sorted, and only kept when their owning application is
/// a node, so every `edges_map` key is a node id.
pub fn assemble(apps: Vec<App>, edges: Vec<Edge>) -> AssembledGraph {
    let mut nodes: BTreeMap<AppId, Node> = BTreeMap::new();
    for app in apps {
        nodes.entry(app.id).or_insert_with(|| Node::from(app));
    }

    let mut seen = HashSet::new();
    let mut edges_map = EdgesMap::new();
    for edge in edges {
        if !nodes.contains_key(&edge.app_id) {
            debug!(field_id = %edge.id, app_id = %edge.app_id, "Dropping edge of unknown application");
            continue;
        }
        if seen.insert(edge.id) {
            edges_map.entry(edge.app_id).or_insert_with(Vec::new).push(edge);
        }
    }
    for group in edges_map.values_mut() {
        group.sort_by_key(|edge| edge.id);
    }

    AssembledGraph {
        nodes: nodes.into_values().collect(),
        edges_map,
    }
}
