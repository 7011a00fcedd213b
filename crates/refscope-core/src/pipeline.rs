//! One scan, end to end: closure, optional target filter, collapse, reduce.

use std::collections::BTreeSet;

use tracing::{info, instrument};

use crate::closure::build_closure;
use crate::collapse::collapse_equal_successors;
use crate::filter::filter_to_targets;
use crate::map::DependencyMap;
use crate::node::{Cluster, Entity, Node};
use crate::oracle::DependencyOracle;
use crate::reduce::reduce_for_display;

/// Display graph of one scan plus the clusters it brought into existence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scan<E: Entity> {
    /// Root node of `graph`, `None` when the scan found nothing.
    pub root: Option<Node<E>>,
    pub graph: DependencyMap<E>,
    /// Every cluster created by this scan, including a synthesized root.
    pub created: Vec<Cluster<E>>,
    /// Created clusters that did not survive into `graph`.
    pub pruned: Vec<Cluster<E>>,
}

/// Run the scan pipeline from `root`.
///
/// `targets` restricts the neighborhood to nodes referencing one of them;
/// pass an empty set to keep everything.
#[instrument(skip(oracle, targets), level = "debug", fields(targets = targets.len()))]
pub fn scan<O>(oracle: &O, root: &O::Entity, targets: &BTreeSet<O::Entity>) -> Scan<O::Entity>
where
    O: DependencyOracle + ?Sized,
{
    let closure = build_closure(oracle, root);
    let filtered = filter_to_targets(closure, targets);
    let collapsed = collapse_equal_successors(&filtered, |members| oracle.anchor_of(members));
    let reduced = reduce_for_display(&collapsed, root);

    let mut created: Vec<Cluster<O::Entity>> =
        collapsed.clusters().into_iter().cloned().collect();
    created.extend(reduced.synthesized_root);

    let kept = reduced.graph.nodes();
    let pruned = created
        .iter()
        .filter(|cluster| !kept.contains(&Node::Cluster((*cluster).clone())))
        .cloned()
        .collect::<Vec<_>>();

    info!(
        keys = reduced.graph.len(),
        edges = reduced.graph.edge_count(),
        clusters = created.len(),
        pruned = pruned.len(),
        "scan complete"
    );

    Scan {
        root: reduced.root,
        graph: reduced.graph,
        created,
        pruned,
    }
}
