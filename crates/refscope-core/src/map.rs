//! The dependency map shared by every pipeline stage.
//!
//! A [`DependencyMap`] maps each node to the set of nodes it depends on.
//! Ordered collections keep every stage deterministic: iterating keys or
//! successor sets always yields the same order for the same content.
//!
//! For display the relation is usually read backwards ("is referenced by");
//! [`DependencyMap::inverted`] produces that view.

#![allow(clippy::module_name_repetitions)]

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

use crate::node::{Cluster, Entity, Node};

/// Mapping from node to the nodes it depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyMap<E: Entity> {
    edges: BTreeMap<Node<E>, BTreeSet<Node<E>>>,
}

impl<E: Entity> Default for DependencyMap<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> DependencyMap<E> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            edges: BTreeMap::new(),
        }
    }

    /// Build a leaf-only map from `(entity, dependencies)` pairs.
    pub fn from_entities<I, D>(entries: I) -> Self
    where
        I: IntoIterator<Item = (E, D)>,
        D: IntoIterator<Item = E>,
    {
        entries
            .into_iter()
            .map(|(key, deps)| {
                (
                    Node::Leaf(key),
                    deps.into_iter().map(Node::Leaf).collect::<BTreeSet<_>>(),
                )
            })
            .collect()
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Total number of `(key, successor)` pairs.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    #[must_use]
    pub fn contains_key(&self, node: &Node<E>) -> bool {
        self.edges.contains_key(node)
    }

    /// `true` if `node` appears as a key or as any successor.
    #[must_use]
    pub fn contains_node(&self, node: &Node<E>) -> bool {
        self.contains_key(node) || self.edges.values().any(|succ| succ.contains(node))
    }

    #[must_use]
    pub fn successors(&self, node: &Node<E>) -> Option<&BTreeSet<Node<E>>> {
        self.edges.get(node)
    }

    /// The stored key equal to `node`, which may be a different cluster
    /// instance (with a different anchor) than the one passed in.
    #[must_use]
    pub fn canonical_key(&self, node: &Node<E>) -> Option<&Node<E>> {
        self.edges.get_key_value(node).map(|(key, _)| key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &Node<E>> {
        self.edges.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Node<E>, &BTreeSet<Node<E>>)> {
        self.edges.iter()
    }

    /// Every node that occurs as a key or successor.
    #[must_use]
    pub fn nodes(&self) -> BTreeSet<&Node<E>> {
        self.edges
            .iter()
            .flat_map(|(key, succ)| std::iter::once(key).chain(succ.iter()))
            .collect()
    }

    /// Every distinct cluster that occurs as a key or successor.
    #[must_use]
    pub fn clusters(&self) -> Vec<&Cluster<E>> {
        self.nodes()
            .into_iter()
            .filter_map(Node::as_cluster)
            .collect()
    }

    /// Replace the successor set of `key`.
    pub fn insert(&mut self, key: Node<E>, successors: BTreeSet<Node<E>>) {
        self.edges.insert(key, successors);
    }

    /// Make sure `key` exists, with an empty successor set if it is new.
    pub fn ensure_key(&mut self, key: Node<E>) {
        self.edges.entry(key).or_default();
    }

    /// Union `successors` into the set stored for `key`.
    ///
    /// Returns the number of edges that were not present before. An existing
    /// key keeps its stored instance.
    pub fn extend_edges(
        &mut self,
        key: Node<E>,
        successors: impl IntoIterator<Item = Node<E>>,
    ) -> usize {
        let entry = self.edges.entry(key).or_default();
        let before = entry.len();
        entry.extend(successors);
        entry.len() - before
    }

    /// `true` if any key lists itself as a successor.
    #[must_use]
    pub fn has_self_loops(&self) -> bool {
        self.edges.iter().any(|(key, succ)| succ.contains(key))
    }

    /// Flip every edge.
    ///
    /// Keys of the result are the nodes referenced by someone; each maps to
    /// the set of nodes referencing it. Keys of `self` that nobody references
    /// are kept with an empty set so no node disappears.
    #[must_use]
    pub fn inverted(&self) -> Self {
        let mut out = Self::new();
        for (key, succ) in &self.edges {
            for target in succ {
                out.extend_edges(target.clone(), [key.clone()]);
            }
        }
        for key in self.edges.keys() {
            out.ensure_key(key.clone());
        }
        out
    }

    /// Summary counts for logs and reports.
    #[must_use]
    pub fn stats(&self) -> MapStats {
        let nodes = self.nodes();
        MapStats {
            key_count: self.len(),
            node_count: nodes.len(),
            edge_count: self.edge_count(),
            cluster_count: nodes.iter().filter(|n| n.is_cluster()).count(),
        }
    }

    /// Convert to a petgraph graph for export or external algorithms.
    ///
    /// Node indices follow the map's canonical node order.
    #[must_use]
    pub fn to_digraph(&self) -> (DiGraph<Node<E>, ()>, HashMap<Node<E>, NodeIndex>) {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();

        for node in self.nodes() {
            let idx = graph.add_node(node.clone());
            index.insert(node.clone(), idx);
        }

        for (key, succ) in &self.edges {
            let from = index[key];
            for target in succ {
                graph.add_edge(from, index[target], ());
            }
        }

        (graph, index)
    }

    #[must_use]
    pub fn into_inner(self) -> BTreeMap<Node<E>, BTreeSet<Node<E>>> {
        self.edges
    }
}

impl<E: Entity> FromIterator<(Node<E>, BTreeSet<Node<E>>)> for DependencyMap<E> {
    fn from_iter<T: IntoIterator<Item = (Node<E>, BTreeSet<Node<E>>)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (key, succ) in iter {
            map.extend_edges(key, succ);
        }
        map
    }
}

impl<'a, E: Entity> IntoIterator for &'a DependencyMap<E> {
    type Item = (&'a Node<E>, &'a BTreeSet<Node<E>>);
    type IntoIter = std::collections::btree_map::Iter<'a, Node<E>, BTreeSet<Node<E>>>;

    fn into_iter(self) -> Self::IntoIter {
        self.edges.iter()
    }
}

/// Node/edge counts of a [`DependencyMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MapStats {
    pub key_count: usize,
    pub node_count: usize,
    pub edge_count: usize,
    pub cluster_count: usize,
}
