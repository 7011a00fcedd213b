//! Root resolution and sibling-implied edge removal for one scan.
//!
//! # Root resolution
//!
//! The scan root is used as-is when it is a key of the collapsed map, or
//! replaced by the cluster that swallowed it. When neither exists (a
//! container whose own facts were never recorded), a singleton cluster
//! wrapping the root is synthesized and given every parentless node of the
//! map as a successor, so those nodes do not float free in the display.
//!
//! # Reduction
//!
//! Nodes are expanded breadth-first from the root, each exactly once. A node
//! is *open* until it has been expanded. When expanding `n`, a candidate
//! `c` is dropped if some other open node lists `c` among its successors:
//! `c` is displayed under that node instead. This is an approximation of a
//! transitive reduction. Both members of a mutual pair under a common parent
//! are dropped from that parent. Nodes unreachable from the root are not
//! part of the output.

#![allow(clippy::module_name_repetitions)]

use std::collections::{BTreeSet, VecDeque};

use tracing::{debug, instrument};

use crate::map::DependencyMap;
use crate::node::{Cluster, Entity, Node};
use crate::roots::find_roots;

/// Display graph produced for one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReducedScan<E: Entity> {
    /// Node the display graph hangs from; `None` for an empty scan.
    pub root: Option<Node<E>>,
    /// Reduced edges. Every displayed node is a key, leaves map to `{}`.
    pub graph: DependencyMap<E>,
    /// Set when the root had to be wrapped in a fresh singleton cluster.
    pub synthesized_root: Option<Cluster<E>>,
}

impl<E: Entity> ReducedScan<E> {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            root: None,
            graph: DependencyMap::new(),
            synthesized_root: None,
        }
    }
}

/// Find (or synthesize) the root node of a collapsed map.
///
/// Returns the node plus the synthesized cluster when one was needed.
#[must_use]
pub fn resolve_root<E: Entity>(collapsed: &DependencyMap<E>, root: &E) -> (Node<E>, Option<Cluster<E>>) {
    let leaf = Node::Leaf(root.clone());
    if collapsed.contains_key(&leaf) {
        return (leaf, None);
    }

    if let Some(containing) = collapsed
        .keys()
        .find(|key| key.as_cluster().is_some_and(|c| c.contains(root)))
    {
        return (containing.clone(), None);
    }

    let wrapper = Cluster::wrapping(root.clone());
    (Node::Cluster(wrapper.clone()), Some(wrapper))
}

/// Reduce a collapsed scan map into its display graph.
#[must_use]
#[instrument(skip(collapsed), level = "debug", fields(keys = collapsed.len()))]
pub fn reduce_for_display<E: Entity>(collapsed: &DependencyMap<E>, root: &E) -> ReducedScan<E> {
    if collapsed.is_empty() {
        return ReducedScan::empty();
    }

    let (root_node, synthesized_root) = resolve_root(collapsed, root);

    let mut working = collapsed.clone();
    if synthesized_root.is_some() {
        let fallback_roots = find_roots(collapsed);
        debug!(
            fallback_roots = fallback_roots.len(),
            "root not in scan; synthesized wrapper"
        );
        working.insert(root_node.clone(), fallback_roots);
    }

    let mut open: BTreeSet<Node<E>> = working.keys().cloned().collect();
    let mut queue: VecDeque<Node<E>> = VecDeque::from([root_node.clone()]);
    let mut graph = DependencyMap::new();
    let empty = BTreeSet::new();

    while let Some(item) = queue.pop_front() {
        if graph.contains_key(&item) {
            continue;
        }
        open.remove(&item);

        let kept: BTreeSet<Node<E>> = working
            .successors(&item)
            .unwrap_or(&empty)
            .iter()
            .filter(|candidate| **candidate != item)
            .filter(|candidate| {
                !open.iter().any(|other| {
                    other != *candidate
                        && working
                            .successors(other)
                            .is_some_and(|succ| succ.contains(*candidate))
                })
            })
            .cloned()
            .collect();

        queue.extend(kept.iter().cloned());
        graph.insert(item, kept);
    }

    debug!(
        keys_in = working.len(),
        keys_out = graph.len(),
        edges_in = working.edge_count(),
        edges_out = graph.edge_count(),
        "reduced scan"
    );

    ReducedScan {
        root: Some(root_node),
        graph,
        synthesized_root,
    }
}
