//! Restriction of a dependency map to the nodes that reference a target.
//!
//! Runs before collapsing so a "what depends on X" query only pays for the
//! part of the neighborhood that actually touches X.

use std::collections::BTreeSet;

use tracing::debug;

use crate::map::DependencyMap;
use crate::node::{Entity, Node};

/// Keep the keys that reference at least one target, and only the edges
/// running between such keys.
///
/// An empty target set returns the map unchanged.
#[must_use]
pub fn filter_to_targets<E: Entity>(map: DependencyMap<E>, targets: &BTreeSet<E>) -> DependencyMap<E> {
    if targets.is_empty() {
        return map;
    }

    let target_nodes: BTreeSet<Node<E>> = targets.iter().cloned().map(Node::Leaf).collect();

    let connected: BTreeSet<&Node<E>> = map
        .iter()
        .filter(|(_, succ)| !succ.is_disjoint(&target_nodes))
        .map(|(key, _)| key)
        .collect();

    let filtered: DependencyMap<E> = map
        .iter()
        .filter(|(key, _)| connected.contains(key))
        .map(|(key, succ)| {
            let kept = succ
                .iter()
                .filter(|s| connected.contains(s))
                .cloned()
                .collect::<BTreeSet<_>>();
            (key.clone(), kept)
        })
        .collect();

    debug!(
        before = map.len(),
        after = filtered.len(),
        targets = targets.len(),
        "filtered to targets"
    );
    filtered
}
