//! Equal-successor collapsing.
//!
//! # Overview
//!
//! Keys whose successor sets are exactly equal are merged into one
//! [`Cluster`] node. This is a single pass over the keys; groups are never
//! refined or re-grouped afterwards.
//!
//! # Approximation
//!
//! The grouping rule is "same outgoing edges", not "mutually reachable".
//! A mutual pair `X -> Y`, `Y -> X` has successor sets `{Y}` and `{X}` and
//! stays as two leaves. Conversely, unrelated nodes that happen to share an
//! identical dependency set are grouped. Anchor resolution and labels
//! downstream are written against this exact rule.
//!
//! # Output
//!
//! - A group of one keeps its original node as key.
//! - A larger group becomes one cluster keyed by its member set. Its edges are
//!   the group's shared successor set minus the members themselves.
//! - Every grouped leaf is rewritten to its cluster, in keys and in values.
//! - No node lists itself as a successor.

#![allow(clippy::module_name_repetitions)]

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, instrument};

use crate::map::DependencyMap;
use crate::node::{Cluster, Entity, MemberSet, Node};

/// Collapse keys with identical successor sets into clusters.
///
/// `anchor_of` is asked once per new cluster for the member owning all the
/// others.
#[instrument(skip_all, level = "debug", fields(keys = map.len()))]
pub fn collapse_equal_successors<E, F>(map: &DependencyMap<E>, anchor_of: F) -> DependencyMap<E>
where
    E: Entity,
    F: Fn(&MemberSet<E>) -> Option<E>,
{
    // Successor sets are BTreeSets, so their hash follows the canonical
    // member order and set-equal successor sets land in the same bucket.
    let mut groups: HashMap<&BTreeSet<Node<E>>, Vec<&Node<E>>> = HashMap::new();
    let mut group_order: Vec<&BTreeSet<Node<E>>> = Vec::new();
    for (key, succ) in map {
        let bucket = groups.entry(succ).or_default();
        if bucket.is_empty() {
            group_order.push(succ);
        }
        bucket.push(key);
    }

    // Grouped node -> its cluster, applied to keys and values alike.
    let mut substitution: HashMap<&Node<E>, Node<E>> = HashMap::new();
    let mut clusters: Vec<(Node<E>, &BTreeSet<Node<E>>, Vec<&Node<E>>)> = Vec::new();

    for succ in group_order {
        let Some(group) = groups.remove(succ) else {
            continue;
        };
        if group.len() < 2 {
            continue;
        }
        let Some(members) = MemberSet::new(group.iter().flat_map(|n| n.entities().cloned()))
        else {
            continue;
        };
        let anchor = anchor_of(&members);
        let cluster = Node::Cluster(Cluster::new(members, anchor));
        for node in &group {
            substitution.insert(*node, cluster.clone());
        }
        clusters.push((cluster, succ, group));
    }

    let substitute = |node: &Node<E>| -> Node<E> {
        substitution
            .get(node)
            .cloned()
            .unwrap_or_else(|| node.clone())
    };

    let mut out = DependencyMap::new();

    for (key, succ) in map {
        if substitution.contains_key(key) {
            continue;
        }
        let rewritten: BTreeSet<Node<E>> = succ
            .iter()
            .map(substitute)
            .filter(|s| s != key)
            .collect();
        out.insert(key.clone(), rewritten);
    }

    let cluster_count = clusters.len();
    for (cluster, succ, group) in clusters {
        let rewritten: BTreeSet<Node<E>> = succ
            .iter()
            .filter(|s| !group.contains(s))
            .map(substitute)
            .filter(|s| *s != cluster)
            .collect();
        out.insert(cluster, rewritten);
    }

    debug!(
        keys_in = map.len(),
        keys_out = out.len(),
        clusters = cluster_count,
        "collapsed equal successor sets"
    );
    out
}
