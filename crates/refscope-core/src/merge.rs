//! Folding one display graph into the accumulated graph of a session.
//!
//! Clusters are created fresh by every scan, so two scans that condense the
//! same entities produce two cluster instances that compare equal but may
//! carry different anchors. Merging keeps the instance already accumulated
//! and reports the incoming one as discarded; the caller releases it.
//!
//! Merging is a plain union. It never re-runs reduction, so an accumulated
//! graph can hold edges a fresh reduction over the whole graph would drop.

#![allow(clippy::module_name_repetitions)]

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, instrument};

use crate::map::DependencyMap;
use crate::node::{Cluster, Entity, Node};

/// What a merge changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport<E: Entity> {
    /// Incoming clusters replaced by an equal accumulated cluster.
    pub discarded: Vec<Cluster<E>>,
    /// Keys that did not exist in the accumulated graph before.
    pub new_keys: usize,
    /// `(key, successor)` pairs that did not exist before.
    pub new_edges: usize,
}

impl<E: Entity> Default for MergeReport<E> {
    fn default() -> Self {
        Self {
            discarded: Vec::new(),
            new_keys: 0,
            new_edges: 0,
        }
    }
}

/// Union `incoming` into `accumulated`, unifying equal-membership clusters.
///
/// Every cluster key of `incoming` is looked up among the cluster keys of
/// `accumulated`; on a match the accumulated instance replaces it in keys and
/// successor sets alike. An empty `incoming` leaves `accumulated` untouched.
#[instrument(skip_all, level = "debug", fields(acc = accumulated.len(), incoming = incoming.len()))]
pub fn merge_into<E: Entity>(
    accumulated: &mut DependencyMap<E>,
    incoming: DependencyMap<E>,
) -> MergeReport<E> {
    if incoming.is_empty() {
        return MergeReport::default();
    }

    let mut substitution: HashMap<Node<E>, Node<E>> = HashMap::new();
    let mut discarded = Vec::new();
    for key in incoming.keys() {
        let Node::Cluster(cluster) = key else {
            continue;
        };
        if let Some(existing) = accumulated.canonical_key(key) {
            substitution.insert(key.clone(), existing.clone());
            discarded.push(cluster.clone());
        }
    }

    let substitute = |node: Node<E>| -> Node<E> {
        match substitution.get(&node) {
            Some(existing) => existing.clone(),
            None => node,
        }
    };

    let mut new_keys = 0;
    let mut new_edges = 0;
    for (key, succ) in incoming.into_inner() {
        let key = substitute(key);
        if !accumulated.contains_key(&key) {
            new_keys += 1;
        }
        let succ: BTreeSet<Node<E>> = succ.into_iter().map(&substitute).collect();
        new_edges += accumulated.extend_edges(key, succ);
    }

    debug!(
        new_keys,
        new_edges,
        discarded = discarded.len(),
        "merged scan into accumulated graph"
    );

    MergeReport {
        discarded,
        new_keys,
        new_edges,
    }
}
