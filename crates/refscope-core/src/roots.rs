//! Parentless keys of a dependency map.

use std::collections::BTreeSet;

use crate::map::DependencyMap;
use crate::node::{Entity, Node};

/// Keys that no *other* key lists as a successor.
///
/// A key that only references itself still counts as a root. Nodes that
/// appear solely as successors are never roots, since they are not keys.
#[must_use]
pub fn find_roots<E: Entity>(map: &DependencyMap<E>) -> BTreeSet<Node<E>> {
    let referenced: BTreeSet<&Node<E>> = map
        .iter()
        .flat_map(|(key, succ)| succ.iter().filter(move |s| *s != key))
        .collect();

    map.keys()
        .filter(|key| !referenced.contains(key))
        .cloned()
        .collect()
}
